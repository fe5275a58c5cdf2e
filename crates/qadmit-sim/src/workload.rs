//! YAML workload DSL.
//!
//! Example:
//! ```yaml
//! name: two-readers
//! config: { profile_work_orders: true }
//! relations:
//!   - { name: orders, attributes: [id, amount], partitions: 2 }
//! queries:
//!   - { id: 1, predicates: ["orders.amount > 100"], operators: [2] }
//!   - { id: 2, predicates: ["orders.amount BETWEEN 50 AND 150"], operators: [1] }
//! events:
//!   - { op: submit, queries: [1, 2] }
//!   - { op: complete, query: 1, operator: 0, partition: 0, worker: 0, start: 0, end: 10 }
//!   - { op: complete, query: 1, operator: 0, partition: 1, worker: 1, start: 0, end: 12 }
//!   - { op: complete, query: 2, operator: 0, partition: 0, worker: 0, start: 15, end: 20 }
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use qadmit_core::config::PolicyConfig;

use crate::error::{Result, SimError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: Option<PolicyConfig>,
    #[serde(default)]
    pub relations: Vec<RelationDef>,
    #[serde(default)]
    pub queries: Vec<QueryDef>,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub attributes: Vec<String>,
    #[serde(default)]
    pub partitions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDef {
    pub id: u64,
    #[serde(default)]
    pub predicates: Vec<String>,
    /// Work orders per operator.
    #[serde(default = "default_operators")]
    pub operators: Vec<u64>,
    /// Rebuild work orders per operator; missing entries are zero.
    #[serde(default)]
    pub rebuild: Vec<u64>,
}

fn default_operators() -> Vec<u64> {
    vec![1]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Event {
    /// Submit a batch to `admit_queries`.
    Submit { queries: Vec<u64> },

    Complete {
        query: u64,
        operator: usize,
        #[serde(default)]
        partition: u64,
        #[serde(default)]
        worker: u64,
        #[serde(default)]
        start: u64,
        #[serde(default)]
        end: u64,
    },

    Rebuild {
        query: u64,
        operator: usize,
        #[serde(default)]
        partition: u64,
        #[serde(default)]
        worker: u64,
    },

    NewBlock {
        relation: String,
        block: u64,
        #[serde(default)]
        partition: Option<u64>,
    },

    Pipeline {
        query: u64,
        operator: usize,
        block: u64,
        relation: String,
        #[serde(default)]
        partition: u64,
    },

    Feedback {
        query: u64,
        operator: usize,
        #[serde(default)]
        payload: String,
    },

    /// Explicit promotion pass, optionally after changing the strategy's cap.
    Promote {
        #[serde(default)]
        capacity: Option<usize>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submit { .. } => "submit",
            Event::Complete { .. } => "complete",
            Event::Rebuild { .. } => "rebuild",
            Event::NewBlock { .. } => "new_block",
            Event::Pipeline { .. } => "pipeline",
            Event::Feedback { .. } => "feedback",
            Event::Promote { .. } => "promote",
        }
    }
}

impl Workload {
    /// Structural checks that do not need a catalog: unique names and ids,
    /// and every event referencing something declared.
    pub fn validate(&self) -> Result<()> {
        let mut relations = HashSet::new();
        for r in &self.relations {
            if !relations.insert(r.name.as_str()) {
                return Err(SimError::Workload(format!("relation '{}' declared twice", r.name)));
            }
            if r.attributes.is_empty() {
                return Err(SimError::Workload(format!("relation '{}' has no attributes", r.name)));
            }
        }

        let mut queries = HashSet::new();
        for q in &self.queries {
            if !queries.insert(q.id) {
                return Err(SimError::Workload(format!("query {} declared twice", q.id)));
            }
            let total = q
                .operators
                .iter()
                .chain(q.rebuild.iter())
                .try_fold(0u64, |acc, &n| acc.checked_add(n));
            match total {
                None => {
                    return Err(SimError::Workload(format!(
                        "query {} has more work orders than fit in u64",
                        q.id
                    )))
                }
                Some(0) => {
                    return Err(SimError::Workload(format!("query {} has no work orders", q.id)))
                }
                Some(_) => {}
            }
            if q.rebuild.len() > q.operators.len() {
                return Err(SimError::Workload(format!(
                    "query {} lists rebuild work orders for more operators than it has",
                    q.id
                )));
            }
        }

        let check_query = |id: u64, i: usize| {
            if queries.contains(&id) {
                Ok(())
            } else {
                Err(SimError::Workload(format!("event {i} references undeclared query {id}")))
            }
        };
        let check_relation = |name: &str, i: usize| {
            if relations.contains(name) {
                Ok(())
            } else {
                Err(SimError::Workload(format!(
                    "event {i} references undeclared relation '{name}'"
                )))
            }
        };

        for (i, event) in self.events.iter().enumerate() {
            match event {
                Event::Submit { queries: batch } => {
                    if batch.is_empty() {
                        return Err(SimError::Workload(format!("event {i} submits an empty batch")));
                    }
                    for &id in batch {
                        check_query(id, i)?;
                    }
                }
                Event::Complete { query, .. }
                | Event::Rebuild { query, .. }
                | Event::Feedback { query, .. } => check_query(*query, i)?,
                Event::Pipeline { query, relation, .. } => {
                    check_query(*query, i)?;
                    check_relation(relation.as_str(), i)?;
                }
                Event::NewBlock { relation, .. } => check_relation(relation.as_str(), i)?,
                Event::Promote { capacity } => {
                    if *capacity == Some(0) {
                        return Err(SimError::Workload(format!("event {i} sets capacity to zero")));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Parse and validate a YAML workload.
pub fn parse_yaml_workload(yaml_src: &str) -> Result<Workload> {
    let workload: Workload = serde_yaml::from_str(yaml_src)?;
    workload.validate()?;
    Ok(workload)
}
