//! Caller-owned identity and predicate payload of one submitted query.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::expr::Expr;
use crate::id::QueryId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryHandle {
    id: QueryId,
    /// Filter predicates of the query plan; locks are derived from these.
    pub predicates: Vec<Expr>,
    /// Opaque plan/context payload consumed by the admission strategy when it
    /// builds the query's state machine.
    #[serde(default)]
    pub context: serde_json::Value,
}

impl QueryHandle {
    pub fn new(id: QueryId, predicates: Vec<Expr>) -> Self {
        Self {
            id,
            predicates,
            context: serde_json::Value::Null,
        }
    }

    /// Build a handle from predicate strings, resolving columns via `catalog`.
    pub fn parse(id: QueryId, predicates: &[&str], catalog: &dyn Catalog) -> Result<Self> {
        let predicates = predicates
            .iter()
            .map(|p| {
                Expr::parse(p, catalog)
                    .map_err(|e| e.with_context(format!("predicate '{p}' of query {id}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(id, predicates))
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }

    pub fn id(&self) -> QueryId {
        self.id
    }
}
