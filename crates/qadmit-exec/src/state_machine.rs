//! Interface to the per-query execution state machine.
//!
//! The state machine tracks a query's operator DAG; the enforcer only feeds it
//! events and asks whether the query has finished.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use qadmit_core::id::{BlockId, OpIndex, PartitionId, RelationId};
use qadmit_core::query::QueryHandle;

use crate::error::Result;
use crate::messages::FeedbackMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryStatus {
    /// Neither the operator nor the query has finished.
    Executing,
    /// The operator finished; other operators are still outstanding.
    OperatorExecuted,
    /// Every operator of the query finished.
    QueryExecuted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    pub num_operators: usize,
    pub num_executed_operators: usize,
}

impl ExecutionState {
    pub fn has_query_execution_finished(&self) -> bool {
        self.num_executed_operators >= self.num_operators
    }
}

pub trait QueryStateMachine: Send {
    fn query_handle(&self) -> &Arc<QueryHandle>;

    fn process_work_order_complete(&mut self, op_index: OpIndex, partition: PartitionId) -> Result<()>;

    fn process_rebuild_work_order_complete(
        &mut self,
        op_index: OpIndex,
        partition: PartitionId,
    ) -> Result<()>;

    fn process_data_pipeline(
        &mut self,
        op_index: OpIndex,
        block: BlockId,
        relation: RelationId,
        partition: PartitionId,
    ) -> Result<()>;

    fn process_feedback(&mut self, op_index: OpIndex, message: &FeedbackMessage) -> Result<()>;

    fn query_status(&self, op_index: OpIndex) -> QueryStatus;

    fn execution_state(&self) -> ExecutionState;
}
