#![forbid(unsafe_code)]
//! qadmit-core: shared kernel for the qadmit policy enforcer.
//!
//! This crate contains only *pure* types, small helpers, and interfaces
//! (traits) that other crates implement. There is **no I/O**, **no async**,
//! and **no locking** here.
//!
//! Crates that use this:
//! - qadmit-lock: decomposes `Expr` predicates into atomic read locks.
//! - qadmit-exec: admits `QueryHandle`s and updates the `Catalog` on new blocks.
//! - qadmit-sim: builds catalogs and handles from YAML workloads.
//! - qadmit-cli: wires everything behind the `qadmit` binary.

pub mod catalog;
pub mod config;
pub mod error;
pub mod expr;
pub mod hash;
pub mod id;
pub mod query;
pub mod types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
