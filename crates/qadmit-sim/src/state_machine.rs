//! Work-order countdown state machine.
//!
//! Each operator expects a fixed number of normal and rebuild work orders.
//! An operator has executed once all of them completed; the query has
//! executed once every operator has.

use std::sync::Arc;

use qadmit_core::id::{BlockId, OpIndex, PartitionId, RelationId};
use qadmit_core::query::QueryHandle;
use qadmit_exec::messages::FeedbackMessage;
use qadmit_exec::{ExecError, ExecutionState, QueryStateMachine, QueryStatus};

use crate::plan::QueryPlan;

#[derive(Debug, Clone, Default)]
pub struct OperatorProgress {
    pub pending_work_orders: u64,
    pub pending_rebuild_work_orders: u64,
    pub completed_partitions: Vec<PartitionId>,
    pub pipelined_blocks: Vec<(BlockId, RelationId, PartitionId)>,
    pub feedback_messages: u64,
    pub feedback_bytes: u64,
}

impl OperatorProgress {
    pub fn is_done(&self) -> bool {
        self.pending_work_orders == 0 && self.pending_rebuild_work_orders == 0
    }
}

pub struct CountdownStateMachine {
    handle: Arc<QueryHandle>,
    operators: Vec<OperatorProgress>,
}

impl CountdownStateMachine {
    pub fn new(handle: Arc<QueryHandle>, plan: &QueryPlan) -> Self {
        let operators = plan
            .operators
            .iter()
            .map(|op| OperatorProgress {
                pending_work_orders: op.work_orders,
                pending_rebuild_work_orders: op.rebuild_work_orders,
                ..OperatorProgress::default()
            })
            .collect();
        Self { handle, operators }
    }

    pub fn operator(&self, op_index: OpIndex) -> Option<&OperatorProgress> {
        self.operators.get(op_index)
    }

    fn operator_mut(&mut self, op_index: OpIndex) -> qadmit_exec::Result<&mut OperatorProgress> {
        let query = self.handle.id();
        let n = self.operators.len();
        self.operators.get_mut(op_index).ok_or_else(|| {
            ExecError::StateMachine(format!(
                "query {query} has {n} operators; operator {op_index} does not exist"
            ))
        })
    }

    fn all_done(&self) -> bool {
        self.operators.iter().all(OperatorProgress::is_done)
    }
}

impl QueryStateMachine for CountdownStateMachine {
    fn query_handle(&self) -> &Arc<QueryHandle> {
        &self.handle
    }

    fn process_work_order_complete(
        &mut self,
        op_index: OpIndex,
        partition: PartitionId,
    ) -> qadmit_exec::Result<()> {
        let query = self.handle.id();
        let op = self.operator_mut(op_index)?;
        if op.pending_work_orders == 0 {
            return Err(ExecError::StateMachine(format!(
                "query {query} operator {op_index}: completion without an outstanding work order"
            )));
        }
        op.pending_work_orders -= 1;
        op.completed_partitions.push(partition);
        Ok(())
    }

    fn process_rebuild_work_order_complete(
        &mut self,
        op_index: OpIndex,
        partition: PartitionId,
    ) -> qadmit_exec::Result<()> {
        let query = self.handle.id();
        let op = self.operator_mut(op_index)?;
        if op.pending_rebuild_work_orders == 0 {
            return Err(ExecError::StateMachine(format!(
                "query {query} operator {op_index}: rebuild completion without an outstanding rebuild work order"
            )));
        }
        op.pending_rebuild_work_orders -= 1;
        op.completed_partitions.push(partition);
        Ok(())
    }

    fn process_data_pipeline(
        &mut self,
        op_index: OpIndex,
        block: BlockId,
        relation: RelationId,
        partition: PartitionId,
    ) -> qadmit_exec::Result<()> {
        self.operator_mut(op_index)?
            .pipelined_blocks
            .push((block, relation, partition));
        Ok(())
    }

    fn process_feedback(
        &mut self,
        op_index: OpIndex,
        message: &FeedbackMessage,
    ) -> qadmit_exec::Result<()> {
        let op = self.operator_mut(op_index)?;
        op.feedback_messages += 1;
        op.feedback_bytes += message.payload.len() as u64;
        Ok(())
    }

    fn query_status(&self, op_index: OpIndex) -> QueryStatus {
        if self.all_done() {
            QueryStatus::QueryExecuted
        } else if self.operators.get(op_index).is_some_and(OperatorProgress::is_done) {
            QueryStatus::OperatorExecuted
        } else {
            QueryStatus::Executing
        }
    }

    fn execution_state(&self) -> ExecutionState {
        ExecutionState {
            num_operators: self.operators.len(),
            num_executed_operators: self.operators.iter().filter(|o| o.is_done()).count(),
        }
    }
}
