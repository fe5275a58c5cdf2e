#![forbid(unsafe_code)]
//! qadmit-exec: admission control and progress-event dispatch.
//!
//! - `enforcer`: the admission controller (running set, waiting queue, lock
//!   table, state-machine table) and the waiting-queue promotion pass.
//! - `dispatch`: routes decoded worker messages to the owning query's state
//!   machine and retires queries once they have fully executed.
//! - `messages`: the tagged wire messages workers send.
//! - `recorder`: optional per-work-order timing.
//! - `state_machine`, `strategy`: collaborator interfaces implemented outside
//!   this crate.
//!
//! All mutation happens through `&mut self` on one [`PolicyEnforcer`], driven
//! serially by a single owning control thread.

pub mod dispatch;
pub mod enforcer;
pub mod error;
pub mod messages;
pub mod queue;
pub mod recorder;
pub mod state_machine;
pub mod strategy;

pub use dispatch::Dispatch;
pub use enforcer::PolicyEnforcer;
pub use error::{ExecError, Result};
pub use messages::{InboundMessage, MessageKind, TaggedMessage};
pub use state_machine::{ExecutionState, QueryStateMachine, QueryStatus};
pub use strategy::AdmissionStrategy;
