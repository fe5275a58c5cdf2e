#![forbid(unsafe_code)]
//! qadmit-sim: reference collaborators and a workload driver.
//!
//! - `state_machine`: `CountdownStateMachine`, a per-operator work-order
//!   countdown standing in for a real DAG tracker.
//! - `strategy`: `CapacityStrategy`, admits while under a concurrency cap.
//! - `workload`: YAML workload DSL (relations, queries, ordered events).
//! - `simulator`: replays a workload through a `PolicyEnforcer` as encoded
//!   wire messages and reports what happened.
//! - `export`: CSV export of work-order timings.

pub mod error;
pub mod export;
pub mod plan;
pub mod simulator;
pub mod state_machine;
pub mod strategy;
pub mod workload;

pub use error::{Result, SimError};
pub use plan::{OperatorPlan, QueryPlan};
pub use simulator::{SimulationReport, Simulator};
pub use state_machine::CountdownStateMachine;
pub use strategy::CapacityStrategy;
pub use workload::{parse_yaml_workload, Workload};
