// src/engine/mod.rs

//! Execution engine for mutarun.
//!
//! This module ties together:
//! - the execution scheduler, which feeds groups to an
//!   [`ExecutionBackend`](crate::exec::ExecutionBackend) and drains its
//!   results channel
//! - classification of raw outcomes into [`Classification`]s
//! - dispatch of classified outcomes to registered [`UnitListener`]s
//!
//! Backends report [`RawOutcome`]s; nothing in here decides how a unit is
//! actually executed.

use std::time::Duration;

use crate::dag::UnitId;
use crate::types::MutationIdentifier;

/// How a single unit ended, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    /// The verification command exited successfully.
    Passed,
    /// The verification command exited with a failure code.
    Failed { exit_code: i32 },
    /// The unit exceeded its time budget and was killed.
    TimedOut,
    /// The unit could not be run at all (spawn or wait failure).
    Errored { message: String },
    /// The unit was not run, e.g. because an earlier unit in its group errored.
    Skipped { reason: String },
}

/// Unclassified result of executing one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutcome {
    pub unit: UnitId,
    pub mutation: Option<MutationIdentifier>,
    pub status: UnitStatus,
    pub elapsed: Duration,
}

impl RawOutcome {
    pub fn new(unit: impl Into<UnitId>, status: UnitStatus) -> Self {
        Self {
            unit: unit.into(),
            mutation: None,
            status,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_mutation(mut self, mutation: Option<MutationIdentifier>) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

pub mod classify;
pub mod dispatch;
pub mod listeners;
pub mod scheduler;

pub use classify::{Classification, classify, verdict_for};
pub use dispatch::{Dispatcher, UnitListener};
pub use listeners::{HistoryListener, LoggingListener, RunTally, SummaryListener};
pub use scheduler::{ExecutionScheduler, RunSummary, SchedulerOptions};
