//! Admission controller.
//!
//! Owns the running set, the waiting queue, the lock table and the
//! state-machine table. A query is admitted only if its predicate lock does
//! not intersect the lock of any running query *and* the injected
//! [`AdmissionStrategy`] grants it resources.
//!
//! Invariants:
//! - no two running queries hold intersecting predicate locks;
//! - a state machine exists iff its query is in the running set;
//! - a query id is accepted once; after retirement it is never re-admitted.
//!
//! Promotion policy: after a retirement (or an explicit
//! [`PolicyEnforcer::promote_waiting`]) only the head of the waiting queue is
//! considered. A head that conflicts with a running query ends the pass, even
//! if queries behind it would not conflict (strict FIFO head-of-line
//! blocking). A lock-compatible head is offered to the strategy up to
//! `promotion_attempts` times; if it is still denied the pass ends and the
//! head keeps its place until the next pass.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use qadmit_core::catalog::{Catalog, CatalogDatabase};
use qadmit_core::config::PolicyConfig;
use qadmit_core::id::QueryId;
use qadmit_core::query::QueryHandle;
use qadmit_lock::PredicateLock;

use crate::error::{ExecError, Result};
use crate::queue::WaitingQueue;
use crate::recorder::{WorkOrderTimeEntry, WorkOrderTimeRecorder};
use crate::state_machine::QueryStateMachine;
use crate::strategy::AdmissionStrategy;

pub struct PolicyEnforcer<S: AdmissionStrategy, C: Catalog = CatalogDatabase> {
    pub(crate) config: PolicyConfig,
    pub(crate) strategy: S,
    pub(crate) catalog: C,
    pub(crate) running: BTreeSet<QueryId>,
    pub(crate) waiting: WaitingQueue,
    pub(crate) locks: HashMap<QueryId, PredicateLock>,
    pub(crate) admitted: HashMap<QueryId, Box<dyn QueryStateMachine>>,
    /// Ids that can never be submitted again. Grows by one per removed
    /// query and is never pruned.
    pub(crate) retired: HashSet<QueryId>,
    pub(crate) recorder: WorkOrderTimeRecorder,
}

impl<S: AdmissionStrategy, C: Catalog> PolicyEnforcer<S, C> {
    pub fn new(config: PolicyConfig, strategy: S, catalog: C) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ExecError::Config(e.to_string()))?;
        Ok(Self {
            config,
            strategy,
            catalog,
            running: BTreeSet::new(),
            waiting: WaitingQueue::new(),
            locks: HashMap::new(),
            admitted: HashMap::new(),
            retired: HashSet::new(),
            recorder: WorkOrderTimeRecorder::new(),
        })
    }

    /// Admit a batch of queries in submission order.
    ///
    /// Each query is checked against the queries running at the moment it is
    /// considered, so a later query in the batch can be blocked by an earlier
    /// one admitted by this same call. Conflicting or resource-denied queries
    /// are appended to the waiting queue.
    ///
    /// Returns true iff every query in the batch is now running.
    pub fn admit_queries(&mut self, batch: &[Arc<QueryHandle>]) -> Result<bool> {
        if batch.is_empty() {
            return Err(ExecError::EmptyBatch);
        }
        let mut seen = HashSet::new();
        for handle in batch {
            let id = handle.id();
            if !seen.insert(id) || self.is_known(id) {
                return Err(ExecError::DuplicateQuery(id));
            }
        }

        let mut all_admitted = true;
        for handle in batch {
            let id = handle.id();
            self.locks
                .insert(id, PredicateLock::from_predicates(&handle.predicates));

            if let Some(_blocker) = self.first_conflict(id)? {
                #[cfg(feature = "tracing")]
                tracing::debug!(query = %id, blocked_by = %_blocker, "query conflicted; queued");
                self.waiting.push(Arc::clone(handle));
                all_admitted = false;
                continue;
            }

            match self.try_admit(handle) {
                Ok(true) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(query = %id, running = self.running.len(), "query admitted");
                }
                Ok(false) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(query = %id, "resources unavailable; queued");
                    self.waiting.push(Arc::clone(handle));
                    all_admitted = false;
                }
                Err(e) => {
                    self.locks.remove(&id);
                    return Err(e.with_context(format!("admitting query {id}")));
                }
            }
        }
        Ok(all_admitted)
    }

    /// Erase a query's state machine, lock and running-set membership.
    ///
    /// Meant for queries that finished executing. Removing a running query
    /// with outstanding work is the kill path: it is logged, the strategy's
    /// `on_query_removed` hook releases its resources, and a promotion pass
    /// runs so waiting queries can take its place.
    pub fn remove_query(&mut self, query_id: QueryId) -> Result<Box<dyn QueryStateMachine>> {
        let state_machine = self
            .admitted
            .remove(&query_id)
            .ok_or(ExecError::UnknownQuery(query_id))?;
        let was_running = self.running.remove(&query_id);
        self.locks.remove(&query_id);
        self.retired.insert(query_id);
        if !state_machine.execution_state().has_query_execution_finished() {
            #[cfg(feature = "tracing")]
            tracing::warn!(query = %query_id, "removing query that hasn't finished its execution");
        }
        if was_running {
            self.strategy.on_query_removed(state_machine.as_ref());
            let _promoted = self.promote_waiting()?;
            #[cfg(feature = "tracing")]
            tracing::info!(query = %query_id, promoted = ?_promoted, "running query removed");
        }
        Ok(state_machine)
    }

    /// Run one promotion pass over the waiting queue.
    ///
    /// Called after every retirement; callers may also invoke it when
    /// resources free up for reasons the enforcer cannot observe.
    /// Returns the promoted query ids in admission order.
    pub fn promote_waiting(&mut self) -> Result<Vec<QueryId>> {
        let mut promoted = Vec::new();
        while let Some(head) = self.waiting.front().cloned() {
            let id = head.id();
            if let Some(_blocker) = self.first_conflict(id)? {
                #[cfg(feature = "tracing")]
                tracing::debug!(query = %id, blocked_by = %_blocker, "waiting-queue head conflicts; pass ends");
                break;
            }

            let mut granted = false;
            for _ in 0..self.config.promotion_attempts {
                if self.try_admit(&head)? {
                    granted = true;
                    break;
                }
            }
            if !granted {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    query = %id,
                    attempts = self.config.promotion_attempts,
                    "waiting-queue head denied resources; pass ends"
                );
                break;
            }

            self.waiting.pop();
            #[cfg(feature = "tracing")]
            tracing::info!(query = %id, "waiting query got admitted");
            promoted.push(id);
        }
        Ok(promoted)
    }

    /// Offer a lock-compatible query to the strategy; on success it joins the
    /// running set together with its state machine.
    fn try_admit(&mut self, handle: &Arc<QueryHandle>) -> Result<bool> {
        let id = handle.id();
        let Some(state_machine) = self.strategy.try_admit(handle)? else {
            return Ok(false);
        };
        let owner = state_machine.query_handle().id();
        if owner != id {
            return Err(ExecError::Invariant(format!(
                "strategy built a state machine for query {owner} while admitting query {id}"
            )));
        }
        self.admitted.insert(id, state_machine);
        self.running.insert(id);
        Ok(true)
    }

    /// First running query whose lock intersects `query_id`'s lock.
    fn first_conflict(&self, query_id: QueryId) -> Result<Option<QueryId>> {
        let candidate = self.locks.get(&query_id).ok_or_else(|| {
            ExecError::Invariant(format!("no predicate lock recorded for query {query_id}"))
        })?;
        for running in &self.running {
            let held = self.locks.get(running).ok_or_else(|| {
                ExecError::Invariant(format!("running query {running} has no predicate lock"))
            })?;
            if held.intersect(candidate) {
                return Ok(Some(*running));
            }
        }
        Ok(None)
    }

    fn is_known(&self, id: QueryId) -> bool {
        self.locks.contains_key(&id) || self.admitted.contains_key(&id) || self.retired.contains(&id)
    }

    /// Check that no two running queries hold intersecting locks.
    pub fn check_mutual_exclusion(&self) -> Result<()> {
        let running: Vec<QueryId> = self.running.iter().copied().collect();
        for (i, a) in running.iter().enumerate() {
            for b in &running[i + 1..] {
                let (Some(la), Some(lb)) = (self.locks.get(a), self.locks.get(b)) else {
                    return Err(ExecError::Invariant(format!(
                        "running query {a} or {b} has no predicate lock"
                    )));
                };
                if la.intersect(lb) {
                    return Err(ExecError::Invariant(format!(
                        "running queries {a} and {b} hold intersecting locks"
                    )));
                }
            }
        }
        if self.running.len() != self.admitted.len()
            || self.running.iter().any(|id| !self.admitted.contains_key(id))
        {
            return Err(ExecError::Invariant(
                "running set and state-machine table disagree".into(),
            ));
        }
        Ok(())
    }

    // --- accessors ---

    /// True if at least one query is running or waiting.
    pub fn has_queries(&self) -> bool {
        !(self.admitted.is_empty() && self.waiting.is_empty())
    }

    pub fn is_running(&self, query_id: QueryId) -> bool {
        self.running.contains(&query_id)
    }

    pub fn is_waiting(&self, query_id: QueryId) -> bool {
        self.waiting.contains(query_id)
    }

    pub fn running_ids(&self) -> Vec<QueryId> {
        self.running.iter().copied().collect()
    }

    /// Waiting queries, head first.
    pub fn waiting_ids(&self) -> Vec<QueryId> {
        self.waiting.ids()
    }

    pub fn num_running(&self) -> usize {
        self.running.len()
    }

    pub fn num_waiting(&self) -> usize {
        self.waiting.len()
    }

    pub fn lock_for(&self, query_id: QueryId) -> Option<&PredicateLock> {
        self.locks.get(&query_id)
    }

    pub fn state_machine(&self, query_id: QueryId) -> Result<&dyn QueryStateMachine> {
        self.admitted
            .get(&query_id)
            .map(|sm| sm.as_ref())
            .ok_or(ExecError::UnknownQuery(query_id))
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn recorder(&self) -> &WorkOrderTimeRecorder {
        &self.recorder
    }

    /// Some queries (e.g. DDL) never run work orders and so have no results
    /// even with profiling on.
    pub fn has_profiling_results(&self, query_id: QueryId) -> bool {
        self.recorder.has_results(query_id)
    }

    pub fn profiling_results(&self, query_id: QueryId) -> Result<&[WorkOrderTimeEntry]> {
        if !self.config.profile_work_orders {
            return Err(ExecError::ProfilingDisabled);
        }
        self.recorder
            .results(query_id)
            .ok_or(ExecError::NoProfilingResults(query_id))
    }
}

impl<S: AdmissionStrategy, C: Catalog> Drop for PolicyEnforcer<S, C> {
    fn drop(&mut self) {
        if self.has_queries() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                running = self.admitted.len(),
                waiting = self.waiting.len(),
                "dropping PolicyEnforcer with some unfinished or waiting queries"
            );
        }
    }
}
