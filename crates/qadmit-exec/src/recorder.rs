//! Per-work-order execution timing.
//!
//! Only fed when `PolicyConfig::profile_work_orders` is set. Rebuild work
//! orders are not recorded.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use qadmit_core::id::{OpIndex, QueryId, WorkerId};

use crate::messages::WorkOrderCompletion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderTimeEntry {
    pub worker_id: WorkerId,
    pub operator_id: OpIndex,
    pub start_time: u64,
    pub end_time: u64,
}

impl WorkOrderTimeEntry {
    pub fn duration(&self) -> u64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// Timing summary for one operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorTimingStats {
    pub count: u64,
    pub total: u64,
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl OperatorTimingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, duration: u64) {
        self.count += 1;
        self.total += duration;
        self.min = Some(self.min.map_or(duration, |m| m.min(duration)));
        self.max = Some(self.max.map_or(duration, |m| m.max(duration)));
    }

    /// Combine two summaries (e.g. the same operator across queries).
    pub fn merge(&self, other: &OperatorTimingStats) -> OperatorTimingStats {
        let pick = |a: Option<u64>, b: Option<u64>, f: fn(u64, u64) -> u64| match (a, b) {
            (Some(x), Some(y)) => Some(f(x, y)),
            (x, None) => x,
            (None, y) => y,
        };
        OperatorTimingStats {
            count: self.count + other.count,
            total: self.total + other.total,
            min: pick(self.min, other.min, u64::min),
            max: pick(self.max, other.max, u64::max),
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total as f64 / self.count as f64)
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkOrderTimeRecorder {
    entries: HashMap<QueryId, Vec<WorkOrderTimeEntry>>,
}

impl WorkOrderTimeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, completion: &WorkOrderCompletion) {
        self.entries
            .entry(completion.query_id)
            .or_default()
            .push(WorkOrderTimeEntry {
                worker_id: completion.worker_thread_index,
                operator_id: completion.operator_index,
                start_time: completion.execution_start_time,
                end_time: completion.execution_end_time,
            });
    }

    pub fn has_results(&self, query_id: QueryId) -> bool {
        self.entries.contains_key(&query_id)
    }

    /// Entries in arrival order.
    pub fn results(&self, query_id: QueryId) -> Option<&[WorkOrderTimeEntry]> {
        self.entries.get(&query_id).map(Vec::as_slice)
    }

    /// Remove and return a query's entries once a consumer has reported them.
    pub fn take(&mut self, query_id: QueryId) -> Option<Vec<WorkOrderTimeEntry>> {
        self.entries.remove(&query_id)
    }

    pub fn query_ids(&self) -> Vec<QueryId> {
        let mut ids: Vec<_> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn operator_stats(&self, query_id: QueryId) -> BTreeMap<OpIndex, OperatorTimingStats> {
        let mut stats: BTreeMap<OpIndex, OperatorTimingStats> = BTreeMap::new();
        for entry in self.entries.get(&query_id).into_iter().flatten() {
            stats.entry(entry.operator_id).or_default().update(entry.duration());
        }
        stats
    }
}
