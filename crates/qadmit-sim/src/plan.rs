//! Plan summary carried in a `QueryHandle`'s context payload.

use serde::{Deserialize, Serialize};

use qadmit_core::query::QueryHandle;

use crate::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPlan {
    pub work_orders: u64,
    #[serde(default)]
    pub rebuild_work_orders: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub operators: Vec<OperatorPlan>,
}

impl Default for QueryPlan {
    /// One operator with a single work order.
    fn default() -> Self {
        Self {
            operators: vec![OperatorPlan {
                work_orders: 1,
                rebuild_work_orders: 0,
            }],
        }
    }
}

impl QueryPlan {
    pub fn new(work_orders: &[u64], rebuild_work_orders: &[u64]) -> Self {
        let operators = work_orders
            .iter()
            .enumerate()
            .map(|(i, &n)| OperatorPlan {
                work_orders: n,
                rebuild_work_orders: rebuild_work_orders.get(i).copied().unwrap_or(0),
            })
            .collect();
        Self { operators }
    }

    /// Read the plan from a handle; a handle without context gets the default plan.
    pub fn from_handle(handle: &QueryHandle) -> Result<Self> {
        let plan = if handle.context.is_null() {
            Self::default()
        } else {
            serde_json::from_value(handle.context.clone())?
        };
        plan.validate()
            .map_err(|e| SimError::Workload(format!("query {}: {e}", handle.id())))?;
        Ok(plan)
    }

    /// A plan without any work order could never report completion.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self.total_work_orders() {
            None => Err("plan's work-order count overflows u64".into()),
            Some(0) => Err("plan has no work orders".into()),
            Some(_) => Ok(()),
        }
    }

    /// Regular plus rebuild work orders over every operator; `None` on overflow.
    pub fn total_work_orders(&self) -> Option<u64> {
        self.operators.iter().try_fold(0u64, |acc, o| {
            acc.checked_add(o.work_orders)?.checked_add(o.rebuild_work_orders)
        })
    }

    pub fn to_context(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
