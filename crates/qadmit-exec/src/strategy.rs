//! Resource-aware hooks injected into the enforcer.

use std::sync::Arc;

use qadmit_core::query::QueryHandle;

use crate::error::Result;
use crate::messages::WorkOrderCompletion;
use crate::state_machine::QueryStateMachine;

pub trait AdmissionStrategy {
    /// Try to allocate execution resources for a lock-compatible query.
    ///
    /// Returns the query's freshly built state machine when admitted and
    /// `None` when resources are currently unavailable. Denial is not an
    /// error; the enforcer keeps the query waiting.
    fn try_admit(&mut self, handle: &Arc<QueryHandle>) -> Result<Option<Box<dyn QueryStateMachine>>>;

    /// Called once per query, right before its state machine is dropped.
    fn on_query_completion(&mut self, _state_machine: &dyn QueryStateMachine) {}

    /// Called when a running query is removed before it finished executing.
    /// Whatever `try_admit` allocated for it must be released here.
    fn on_query_removed(&mut self, state_machine: &dyn QueryStateMachine) {
        self.on_query_completion(state_machine);
    }

    /// Bookkeeping for outstanding work orders per (query, worker).
    fn decrement_num_queued_work_orders(&mut self, completion: &WorkOrderCompletion);
}
