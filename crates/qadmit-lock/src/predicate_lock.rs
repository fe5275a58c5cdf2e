//! Per-query set of atomic read locks.

use serde::{Deserialize, Serialize};

use qadmit_core::catalog::Catalog;
use qadmit_core::expr::Expr;
use qadmit_core::hash::{hash_serde, Hash256};

use crate::atomic::AtomicLock;
use crate::decompose::decompose;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredicateLock {
    reads: Vec<AtomicLock>,
}

impl PredicateLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock set covering every predicate of a query.
    pub fn from_predicates(predicates: &[Expr]) -> Self {
        let mut lock = Self::new();
        for predicate in predicates {
            for atomic in decompose(predicate) {
                lock.add_predicate_read(atomic);
            }
        }
        lock
    }

    /// Insert a read lock. Returns false if an identical lock was already held.
    pub fn add_predicate_read(&mut self, lock: AtomicLock) -> bool {
        if self.reads.contains(&lock) {
            return false;
        }
        self.reads.push(lock);
        true
    }

    /// True iff any lock here conflicts with any lock in `other`.
    pub fn intersect(&self, other: &PredicateLock) -> bool {
        self.reads
            .iter()
            .any(|a| other.reads.iter().any(|b| a.conflicts_with(b)))
    }

    /// Every conflicting pair, `(ours, theirs)`.
    pub fn conflicts<'a>(&'a self, other: &'a PredicateLock) -> Vec<(&'a AtomicLock, &'a AtomicLock)> {
        let mut pairs = Vec::new();
        for a in &self.reads {
            for b in &other.reads {
                if a.conflicts_with(b) {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    pub fn reads(&self) -> &[AtomicLock] {
        &self.reads
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Stable fingerprint of the lock set (insertion order matters).
    pub fn digest(&self) -> Result<Hash256> {
        Ok(hash_serde(&self.reads)?)
    }

    pub fn describe(&self, catalog: &dyn Catalog) -> Vec<String> {
        self.reads.iter().map(|l| l.describe(catalog)).collect()
    }
}
