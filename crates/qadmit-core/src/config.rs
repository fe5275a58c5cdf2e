//! Enforcer configuration.
//!
//! Passed explicitly at construction; there are no process-wide flags.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default cap on concurrently admitted queries for capacity-based strategies.
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Record per-work-order execution times.
    pub profile_work_orders: bool,
    /// How many times one promotion pass offers the waiting-queue head to the
    /// admission strategy before giving up until the next pass.
    pub promotion_attempts: u32,
    /// Upper bound on running queries for capacity-based strategies.
    pub max_concurrent_queries: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            profile_work_orders: false,
            promotion_attempts: 1,
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
        }
    }
}

impl PolicyConfig {
    /// Defaults overridden by `QADMIT_PROFILE_WORK_ORDERS`,
    /// `QADMIT_PROMOTION_ATTEMPTS` and `QADMIT_MAX_CONCURRENT_QUERIES`.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("QADMIT_PROFILE_WORK_ORDERS") {
            if let Some(b) = parse_bool(&v) {
                cfg.profile_work_orders = b;
            }
        }
        if let Ok(v) = std::env::var("QADMIT_PROMOTION_ATTEMPTS") {
            if let Ok(n) = v.trim().parse() {
                cfg.promotion_attempts = n;
            }
        }
        if let Ok(v) = std::env::var("QADMIT_MAX_CONCURRENT_QUERIES") {
            if let Ok(n) = v.trim().parse() {
                cfg.max_concurrent_queries = n;
            }
        }
        cfg
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profile_work_orders = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.promotion_attempts == 0 {
            return Err(Error::Config(
                "promotion_attempts must be at least 1".into(),
            ));
        }
        if self.max_concurrent_queries == 0 {
            return Err(Error::Config(
                "max_concurrent_queries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
