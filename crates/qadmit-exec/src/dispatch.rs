//! Message dispatcher.
//!
//! Decodes a [`TaggedMessage`], routes it to the owning query's state
//! machine, and retires the query once the state machine reports it fully
//! executed. Catalog block notifications are applied directly and never
//! trigger the completion check.

use serde::{Deserialize, Serialize};

use qadmit_core::catalog::Catalog;
use qadmit_core::id::{BlockId, OpIndex, QueryId, RelationId};

use crate::enforcer::PolicyEnforcer;
use crate::error::{ExecError, Result};
use crate::messages::{CatalogRelationNewBlock, InboundMessage, TaggedMessage};
use crate::state_machine::{QueryStateMachine, QueryStatus};
use crate::strategy::AdmissionStrategy;

/// What a single `process_message` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dispatch {
    /// Event delivered; the query is still running.
    Routed { query_id: QueryId, status: QueryStatus },
    /// Event delivered and the query retired; `promoted` lists waiting
    /// queries admitted by the follow-up promotion pass.
    Retired {
        query_id: QueryId,
        promoted: Vec<QueryId>,
    },
    /// A storage block was attached to a relation.
    CatalogUpdated { relation: RelationId, block: BlockId },
}

impl<S: AdmissionStrategy, C: Catalog> PolicyEnforcer<S, C> {
    pub fn process_message(&mut self, tagged: &TaggedMessage) -> Result<Dispatch> {
        let message = tagged.decode()?;
        #[cfg(feature = "tracing")]
        tracing::trace!(kind = message.kind().name(), "dispatching message");

        let (query_id, op_index) = match message {
            InboundMessage::WorkOrderComplete(proto) => {
                self.ensure_admitted(proto.query_id)?;
                self.strategy.decrement_num_queued_work_orders(&proto);
                if self.config.profile_work_orders {
                    self.recorder.record(&proto);
                }
                self.state_machine_mut(proto.query_id)?
                    .process_work_order_complete(proto.operator_index, proto.partition_id)?;
                (proto.query_id, proto.operator_index)
            }
            InboundMessage::RebuildWorkOrderComplete(proto) => {
                self.ensure_admitted(proto.query_id)?;
                self.strategy.decrement_num_queued_work_orders(&proto);
                self.state_machine_mut(proto.query_id)?
                    .process_rebuild_work_order_complete(proto.operator_index, proto.partition_id)?;
                (proto.query_id, proto.operator_index)
            }
            InboundMessage::CatalogRelationNewBlock(proto) => {
                self.add_block(&proto)?;
                return Ok(Dispatch::CatalogUpdated {
                    relation: proto.relation_id,
                    block: proto.block_id,
                });
            }
            InboundMessage::DataPipeline(proto) => {
                self.state_machine_mut(proto.query_id)?.process_data_pipeline(
                    proto.operator_index,
                    proto.block_id,
                    proto.relation_id,
                    proto.partition_id,
                )?;
                (proto.query_id, proto.operator_index)
            }
            InboundMessage::WorkOrderFeedback(msg) => {
                let query_id = msg.header.query_id;
                let op_index = msg.header.rel_op_index;
                self.state_machine_mut(query_id)?
                    .process_feedback(op_index, &msg)?;
                (query_id, op_index)
            }
        };

        self.check_completion(query_id, op_index)
    }

    fn check_completion(&mut self, query_id: QueryId, op_index: OpIndex) -> Result<Dispatch> {
        let status = self.state_machine(query_id)?.query_status(op_index);
        if status != QueryStatus::QueryExecuted {
            return Ok(Dispatch::Routed { query_id, status });
        }
        let promoted = self.retire(query_id)?;
        Ok(Dispatch::Retired { query_id, promoted })
    }

    /// Leave the running set, run the completion hook, drop the state
    /// machine, then try to promote waiting queries.
    fn retire(&mut self, query_id: QueryId) -> Result<Vec<QueryId>> {
        if !self.running.remove(&query_id) {
            return Err(ExecError::Invariant(format!(
                "query {query_id} reported executed but is not in the running set"
            )));
        }
        let state_machine = self
            .admitted
            .get(&query_id)
            .ok_or(ExecError::UnknownQuery(query_id))?;
        self.strategy.on_query_completion(state_machine.as_ref());
        self.remove_query(query_id)?;
        #[cfg(feature = "tracing")]
        tracing::info!(query = %query_id, waiting = self.waiting.len(), "query retired");
        self.promote_waiting()
    }

    fn add_block(&mut self, proto: &CatalogRelationNewBlock) -> Result<()> {
        let relation = self
            .catalog
            .relation_by_id_mut(proto.relation_id)
            .ok_or(ExecError::UnknownRelation(proto.relation_id))?;
        // partition first, so a rejected message leaves the relation untouched
        if let Some(partition) = proto.partition_id {
            let scheme = relation.partition_scheme_mut().ok_or_else(|| {
                ExecError::Catalog(format!(
                    "relation {} has no partition scheme for block {} in partition {partition}",
                    proto.relation_id, proto.block_id
                ))
            })?;
            scheme.add_block_to_partition(proto.block_id, partition)?;
        }
        relation.add_block(proto.block_id);
        Ok(())
    }

    fn ensure_admitted(&self, query_id: QueryId) -> Result<()> {
        if self.admitted.contains_key(&query_id) {
            Ok(())
        } else {
            Err(ExecError::UnknownQuery(query_id))
        }
    }

    fn state_machine_mut(&mut self, query_id: QueryId) -> Result<&mut Box<dyn QueryStateMachine>> {
        self.admitted
            .get_mut(&query_id)
            .ok_or(ExecError::UnknownQuery(query_id))
    }
}
