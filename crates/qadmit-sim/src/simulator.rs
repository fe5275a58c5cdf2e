//! Replays a [`Workload`] through a [`PolicyEnforcer`].
//!
//! Worker events are encoded into [`TaggedMessage`]s and fed through
//! `process_message`, so a run exercises the same decode path a real worker
//! connection would. Mutual exclusion of running locks is checked after
//! every step.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use qadmit_core::catalog::{Catalog, CatalogDatabase};
use qadmit_core::config::PolicyConfig;
use qadmit_core::hash::hash_serde;
use qadmit_core::id::{BlockId, OpIndex, PartitionId, QueryId, RelationId, WorkerId};
use qadmit_core::query::QueryHandle;
use qadmit_exec::messages::{
    CatalogRelationNewBlock, DataPipeline, FeedbackMessage, WorkOrderCompletion,
};
use qadmit_exec::recorder::{OperatorTimingStats, WorkOrderTimeEntry};
use qadmit_exec::{Dispatch, ExecError, InboundMessage, PolicyEnforcer};

use crate::error::{Result, SimError};
use crate::plan::QueryPlan;
use crate::strategy::{CapacityStrategy, CompletedQuery};
use crate::workload::{Event, Workload};

/// One replayed event and the enforcer state right after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub event: String,
    pub outcome: String,
    pub running: Vec<QueryId>,
    pub waiting: Vec<QueryId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub run_id: Uuid,
    pub workload: String,
    pub workload_hash: String,
    /// Queries in the order they entered the running set.
    pub admitted: Vec<QueryId>,
    /// Queries in the order they retired.
    pub retired: Vec<QueryId>,
    pub running: Vec<QueryId>,
    pub waiting: Vec<QueryId>,
    pub blocks_added: usize,
    pub denials: u64,
    pub completed: Vec<CompletedQuery>,
    pub profiling: BTreeMap<QueryId, Vec<WorkOrderTimeEntry>>,
    pub operator_stats: BTreeMap<QueryId, BTreeMap<OpIndex, OperatorTimingStats>>,
    pub steps: Vec<StepRecord>,
}

impl SimulationReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct Simulator {
    workload: Workload,
    config: Option<PolicyConfig>,
}

impl Simulator {
    pub fn new(workload: Workload) -> Self {
        Self {
            workload,
            config: None,
        }
    }

    /// Override the workload's own `config` section.
    pub fn with_config(mut self, config: PolicyConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    pub fn effective_config(&self) -> PolicyConfig {
        self.config
            .clone()
            .or_else(|| self.workload.config.clone())
            .unwrap_or_default()
    }

    /// Build the catalog the workload's relations describe.
    pub fn build_catalog(&self) -> Result<CatalogDatabase> {
        let mut catalog = CatalogDatabase::new(self.workload.name.clone());
        for r in &self.workload.relations {
            let attrs: Vec<&str> = r.attributes.iter().map(String::as_str).collect();
            catalog.add_relation(&r.name, &attrs, r.partitions)?;
        }
        Ok(catalog)
    }

    /// Parse every declared query against `catalog`.
    pub fn build_handles(&self, catalog: &dyn Catalog) -> Result<HashMap<u64, Arc<QueryHandle>>> {
        let mut handles = HashMap::new();
        for q in &self.workload.queries {
            let predicates: Vec<&str> = q.predicates.iter().map(String::as_str).collect();
            let plan = QueryPlan::new(&q.operators, &q.rebuild);
            let handle = QueryHandle::parse(QueryId::new(q.id), &predicates, catalog)?
                .with_context(plan.to_context()?);
            handles.insert(q.id, Arc::new(handle));
        }
        Ok(handles)
    }

    pub fn run(&self) -> Result<SimulationReport> {
        self.workload.validate()?;
        let config = self.effective_config();
        let catalog = self.build_catalog()?;
        let handles = self.build_handles(&catalog)?;
        let workload_hash = hash_serde(&self.workload)?.to_hex();

        #[cfg(feature = "tracing")]
        tracing::info!(workload = %self.workload.name, events = self.workload.events.len(), "simulation started");

        let strategy = CapacityStrategy::new(config.max_concurrent_queries);
        let mut enforcer = PolicyEnforcer::new(config, strategy, catalog)?;

        let mut admitted = Vec::new();
        let mut retired = Vec::new();
        let mut blocks_added = 0;
        let mut steps = Vec::with_capacity(self.workload.events.len());

        for (index, event) in self.workload.events.iter().enumerate() {
            let step_err = |source: ExecError| SimError::Step {
                index,
                event: event.name(),
                source,
            };

            let outcome = match event {
                Event::Submit { queries } => {
                    let batch: Vec<Arc<QueryHandle>> = queries
                        .iter()
                        .map(|id| lookup(&handles, *id))
                        .collect::<Result<_>>()?;
                    let all = enforcer.admit_queries(&batch).map_err(step_err)?;
                    let now_running: Vec<QueryId> = batch
                        .iter()
                        .map(|h| h.id())
                        .filter(|id| enforcer.is_running(*id))
                        .collect();
                    admitted.extend(now_running.iter().copied());
                    format!(
                        "admitted {}/{} (all admitted: {all})",
                        now_running.len(),
                        batch.len()
                    )
                }
                Event::Promote { capacity } => {
                    if let Some(cap) = capacity {
                        enforcer.strategy_mut().set_capacity(*cap);
                    }
                    let promoted = enforcer.promote_waiting().map_err(step_err)?;
                    admitted.extend(promoted.iter().copied());
                    format!("promoted {promoted:?}")
                }
                worker_event => {
                    let message = self.to_message(worker_event, &enforcer)?;
                    if let InboundMessage::WorkOrderComplete(c)
                    | InboundMessage::RebuildWorkOrderComplete(c) = &message
                    {
                        enforcer.strategy_mut().note_dispatched(c.worker_thread_index);
                    }
                    let tagged = message.encode().map_err(step_err)?;
                    match enforcer.process_message(&tagged).map_err(step_err)? {
                        Dispatch::Routed { query_id, status } => {
                            format!("query {query_id}: {status:?}")
                        }
                        Dispatch::Retired { query_id, promoted } => {
                            retired.push(query_id);
                            admitted.extend(promoted.iter().copied());
                            format!("query {query_id} retired; promoted {promoted:?}")
                        }
                        Dispatch::CatalogUpdated { relation, block } => {
                            blocks_added += 1;
                            format!("block {block} added to relation {relation}")
                        }
                    }
                }
            };

            enforcer.check_mutual_exclusion().map_err(step_err)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(step = index, event = event.name(), outcome = %outcome, "step replayed");

            steps.push(StepRecord {
                index,
                event: event.name().to_string(),
                outcome,
                running: enforcer.running_ids(),
                waiting: enforcer.waiting_ids(),
            });
        }

        let mut profiling = BTreeMap::new();
        let mut operator_stats = BTreeMap::new();
        for id in enforcer.recorder().query_ids() {
            if let Some(entries) = enforcer.recorder().results(id) {
                profiling.insert(id, entries.to_vec());
            }
            operator_stats.insert(id, enforcer.recorder().operator_stats(id));
        }

        Ok(SimulationReport {
            run_id: Uuid::new_v4(),
            workload: self.workload.name.clone(),
            workload_hash,
            admitted,
            retired,
            running: enforcer.running_ids(),
            waiting: enforcer.waiting_ids(),
            blocks_added,
            denials: enforcer.strategy().denials(),
            completed: enforcer.strategy().completed().to_vec(),
            profiling,
            operator_stats,
            steps,
        })
    }

    fn to_message(
        &self,
        event: &Event,
        enforcer: &PolicyEnforcer<CapacityStrategy>,
    ) -> Result<InboundMessage> {
        let relation_id = |name: &str| -> Result<RelationId> {
            enforcer
                .catalog()
                .relation_by_name(name)
                .map(|r| r.id)
                .ok_or_else(|| SimError::Workload(format!("unknown relation '{name}'")))
        };

        Ok(match event {
            Event::Complete {
                query,
                operator,
                partition,
                worker,
                start,
                end,
            } => InboundMessage::WorkOrderComplete(WorkOrderCompletion {
                query_id: QueryId::new(*query),
                operator_index: *operator,
                partition_id: PartitionId::new(*partition),
                worker_thread_index: WorkerId::new(*worker),
                execution_start_time: *start,
                execution_end_time: *end,
            }),
            Event::Rebuild {
                query,
                operator,
                partition,
                worker,
            } => InboundMessage::RebuildWorkOrderComplete(WorkOrderCompletion {
                query_id: QueryId::new(*query),
                operator_index: *operator,
                partition_id: PartitionId::new(*partition),
                worker_thread_index: WorkerId::new(*worker),
                execution_start_time: 0,
                execution_end_time: 0,
            }),
            Event::NewBlock {
                relation,
                block,
                partition,
            } => InboundMessage::CatalogRelationNewBlock(CatalogRelationNewBlock {
                relation_id: relation_id(relation.as_str())?,
                block_id: BlockId::new(*block),
                partition_id: partition.map(PartitionId::new),
            }),
            Event::Pipeline {
                query,
                operator,
                block,
                relation,
                partition,
            } => InboundMessage::DataPipeline(DataPipeline {
                query_id: QueryId::new(*query),
                operator_index: *operator,
                block_id: BlockId::new(*block),
                relation_id: relation_id(relation.as_str())?,
                partition_id: PartitionId::new(*partition),
            }),
            Event::Feedback {
                query,
                operator,
                payload,
            } => InboundMessage::WorkOrderFeedback(FeedbackMessage::new(
                QueryId::new(*query),
                *operator,
                payload.as_bytes().to_vec(),
            )),
            Event::Submit { .. } | Event::Promote { .. } => {
                return Err(SimError::Workload(format!(
                    "'{}' is not a worker message",
                    event.name()
                )))
            }
        })
    }
}

fn lookup(handles: &HashMap<u64, Arc<QueryHandle>>, id: u64) -> Result<Arc<QueryHandle>> {
    handles
        .get(&id)
        .cloned()
        .ok_or_else(|| SimError::Workload(format!("query {id} is not declared")))
}
