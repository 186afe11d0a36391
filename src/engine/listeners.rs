// src/engine/listeners.rs

//! Listeners shipped with mutarun.
//!
//! - [`LoggingListener`] logs every outcome; always registered by [`crate::run`].
//! - [`SummaryListener`] counts outcomes per classification.
//! - [`HistoryListener`] appends verdicts to a [`HistoryStore`].

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::engine::classify::verdict_for;
use crate::engine::dispatch::UnitListener;
use crate::engine::{RawOutcome, UnitStatus};
use crate::errors::MutarunError;
use crate::history::HistoryStore;

/// Logs each outcome at a level matching its classification.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl UnitListener for LoggingListener {
    fn on_run_start(&mut self) {
        info!("verification run started");
    }

    fn on_success(&mut self, outcome: &RawOutcome) {
        debug!(unit = %outcome.unit, elapsed = ?outcome.elapsed, "unit passed");
    }

    fn on_failure(&mut self, outcome: &RawOutcome) {
        let exit_code = match outcome.status {
            UnitStatus::Failed { exit_code } => exit_code,
            _ => -1,
        };
        debug!(
            unit = %outcome.unit,
            exit_code,
            elapsed = ?outcome.elapsed,
            "unit failed"
        );
    }

    fn on_error(&mut self, outcome: &RawOutcome) {
        warn!(unit = %outcome.unit, status = ?outcome.status, "unit errored");
    }

    fn on_skipped(&mut self, outcome: &RawOutcome) {
        info!(unit = %outcome.unit, status = ?outcome.status, "unit skipped");
    }

    fn on_run_end(&mut self) {
        info!("verification run finished");
    }
}

/// Per-classification counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
}

impl RunTally {
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.errored + self.skipped
    }
}

/// Counts outcomes into a shared [`RunTally`].
#[derive(Debug, Default, Clone)]
pub struct SummaryListener {
    tally: Arc<Mutex<RunTally>>,
}

impl SummaryListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the counts so far.
    pub fn tally(&self) -> RunTally {
        *lock(&self.tally)
    }
}

impl UnitListener for SummaryListener {
    fn on_success(&mut self, _outcome: &RawOutcome) {
        lock(&self.tally).passed += 1;
    }

    fn on_failure(&mut self, _outcome: &RawOutcome) {
        lock(&self.tally).failed += 1;
    }

    fn on_error(&mut self, _outcome: &RawOutcome) {
        lock(&self.tally).errored += 1;
    }

    fn on_skipped(&mut self, _outcome: &RawOutcome) {
        lock(&self.tally).skipped += 1;
    }
}

/// Records the verdict of every mutation-bearing outcome.
///
/// A write failure is held and surfaced through
/// [`UnitListener::take_failure`], which the scheduler checks after each
/// batch; the run is aborted rather than continuing with a broken cache.
#[derive(Debug)]
pub struct HistoryListener {
    store: Arc<HistoryStore>,
    failure: Option<MutarunError>,
    recorded: usize,
}

impl HistoryListener {
    pub fn new(store: Arc<HistoryStore>) -> Self {
        Self {
            store,
            failure: None,
            recorded: 0,
        }
    }

    fn record(&mut self, outcome: &RawOutcome) {
        if self.failure.is_some() {
            return;
        }
        let (Some(id), Some(verdict)) = (outcome.mutation.as_ref(), verdict_for(outcome)) else {
            return;
        };
        match self.store.record_result(id, &verdict) {
            Ok(()) => self.recorded += 1,
            Err(err) => self.failure = Some(err),
        }
    }
}

impl UnitListener for HistoryListener {
    fn on_success(&mut self, outcome: &RawOutcome) {
        self.record(outcome);
    }

    fn on_failure(&mut self, outcome: &RawOutcome) {
        self.record(outcome);
    }

    fn on_error(&mut self, outcome: &RawOutcome) {
        self.record(outcome);
    }

    fn on_run_end(&mut self) {
        debug!(recorded = self.recorded, "verdicts appended to history");
    }

    fn take_failure(&mut self) -> Option<MutarunError> {
        self.failure.take()
    }
}

fn lock(tally: &Mutex<RunTally>) -> MutexGuard<'_, RunTally> {
    // Counters stay meaningful even if a panicking thread held the lock.
    tally.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
