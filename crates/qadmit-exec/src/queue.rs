//! FIFO of queries waiting for admission.

use std::collections::VecDeque;
use std::sync::Arc;

use qadmit_core::id::QueryId;
use qadmit_core::query::QueryHandle;

/// Insertion order is submission order across `admit_queries` calls.
#[derive(Debug, Default)]
pub struct WaitingQueue {
    q: VecDeque<Arc<QueryHandle>>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self { q: VecDeque::new() }
    }

    pub fn push(&mut self, handle: Arc<QueryHandle>) {
        self.q.push_back(handle);
    }

    pub fn front(&self) -> Option<&Arc<QueryHandle>> {
        self.q.front()
    }

    pub fn pop(&mut self) -> Option<Arc<QueryHandle>> {
        self.q.pop_front()
    }

    pub fn contains(&self, id: QueryId) -> bool {
        self.q.iter().any(|h| h.id() == id)
    }

    pub fn ids(&self) -> Vec<QueryId> {
        self.q.iter().map(|h| h.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }
}
