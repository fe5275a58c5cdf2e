#![forbid(unsafe_code)]
//! qadmit-lock: the predicate lock model.
//!
//! A query's filter predicates are broken down into atomic read locks
//! (relation + attribute + value constraint). Two queries may run together
//! only if their lock sets do not intersect.
//!
//! Only attributes referenced by filter predicates are locked. Attributes a
//! query touches purely through projections or joins without a filter are
//! invisible here, so the conflict check is conservative per attribute but
//! incomplete across a whole query.

pub mod atomic;
pub mod decompose;
pub mod error;
pub mod predicate_lock;

pub use atomic::{AtomicLock, Constraint, Endpoint, ValueRange};
pub use decompose::decompose;
pub use error::{LockError, Result};
pub use predicate_lock::PredicateLock;
