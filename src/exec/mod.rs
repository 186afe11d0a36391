// src/exec/mod.rs

//! Execution backends.
//!
//! - [`backend`] provides the `ExecutionBackend` trait the scheduler drives,
//!   plus the results channel type shared with backends.
//! - [`pool`] is the production backend: a bounded pool that runs each group
//!   on its own Tokio task.
//! - [`unit_runner`] runs a single unit, by default as a shell command via
//!   `tokio::process::Command`.

pub mod backend;
pub mod pool;
pub mod unit_runner;

pub use backend::{
    BackendFuture, DEFAULT_RESULTS_CAPACITY, ExecutionBackend, ResultsReceiver, ResultsSender,
    results_channel,
};
pub use pool::ProcessBackend;
pub use unit_runner::{DEFAULT_UNIT_TIMEOUT, ShellUnitRunner, UnitRunner};
