//! Capacity-bounded admission strategy.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use qadmit_core::id::{QueryId, WorkerId};
use qadmit_core::query::QueryHandle;
use qadmit_exec::messages::WorkOrderCompletion;
use qadmit_exec::{AdmissionStrategy, ExecError, QueryStateMachine};

use crate::plan::QueryPlan;
use crate::state_machine::CountdownStateMachine;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedQuery {
    pub query_id: QueryId,
    pub num_operators: usize,
    pub num_executed_operators: usize,
}

/// Admits queries while fewer than `max_concurrent` are running.
#[derive(Debug)]
pub struct CapacityStrategy {
    max_concurrent: usize,
    running: usize,
    queued_work_orders: HashMap<WorkerId, u64>,
    unexpected_completions: u64,
    denials: u64,
    completed: Vec<CompletedQuery>,
}

impl CapacityStrategy {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            running: 0,
            queued_work_orders: HashMap::new(),
            unexpected_completions: 0,
            denials: 0,
            completed: Vec::new(),
        }
    }

    /// Change the cap; takes effect on the next admission attempt.
    pub fn set_capacity(&mut self, max_concurrent: usize) {
        self.max_concurrent = max_concurrent;
    }

    pub fn capacity(&self) -> usize {
        self.max_concurrent
    }

    /// A work order was handed to `worker`.
    pub fn note_dispatched(&mut self, worker: WorkerId) {
        *self.queued_work_orders.entry(worker).or_insert(0) += 1;
    }

    pub fn queued_work_orders(&self, worker: WorkerId) -> u64 {
        self.queued_work_orders.get(&worker).copied().unwrap_or(0)
    }

    /// Completions reported for a worker with no queued work order.
    pub fn unexpected_completions(&self) -> u64 {
        self.unexpected_completions
    }

    pub fn denials(&self) -> u64 {
        self.denials
    }

    pub fn completed(&self) -> &[CompletedQuery] {
        &self.completed
    }

    pub fn running(&self) -> usize {
        self.running
    }
}

impl AdmissionStrategy for CapacityStrategy {
    fn try_admit(
        &mut self,
        handle: &Arc<QueryHandle>,
    ) -> qadmit_exec::Result<Option<Box<dyn QueryStateMachine>>> {
        if self.running >= self.max_concurrent {
            self.denials += 1;
            return Ok(None);
        }
        let plan = QueryPlan::from_handle(handle)
            .map_err(|e| ExecError::StateMachine(e.to_string()))?;
        self.running += 1;
        Ok(Some(Box::new(CountdownStateMachine::new(Arc::clone(handle), &plan))))
    }

    fn on_query_completion(&mut self, state_machine: &dyn QueryStateMachine) {
        self.running = self.running.saturating_sub(1);
        let state = state_machine.execution_state();
        self.completed.push(CompletedQuery {
            query_id: state_machine.query_handle().id(),
            num_operators: state.num_operators,
            num_executed_operators: state.num_executed_operators,
        });
    }

    fn on_query_removed(&mut self, _state_machine: &dyn QueryStateMachine) {
        self.running = self.running.saturating_sub(1);
    }

    fn decrement_num_queued_work_orders(&mut self, completion: &WorkOrderCompletion) {
        match self.queued_work_orders.get_mut(&completion.worker_thread_index) {
            Some(n) if *n > 0 => *n -= 1,
            _ => self.unexpected_completions += 1,
        }
    }
}
