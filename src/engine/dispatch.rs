// src/engine/dispatch.rs

//! Listener registration and dispatch of classified outcomes.

use tracing::trace;

use crate::engine::classify::{Classification, classify};
use crate::engine::RawOutcome;
use crate::errors::MutarunError;

/// Observer of a run.
///
/// Every callback has a no-op default so listeners only implement what they
/// care about.
pub trait UnitListener: Send {
    fn on_run_start(&mut self) {}

    fn on_success(&mut self, _outcome: &RawOutcome) {}

    fn on_failure(&mut self, _outcome: &RawOutcome) {}

    fn on_error(&mut self, _outcome: &RawOutcome) {}

    fn on_skipped(&mut self, _outcome: &RawOutcome) {}

    fn on_run_end(&mut self) {}

    /// A fatal failure the listener hit while handling outcomes, if any.
    ///
    /// Checked by the scheduler after every batch; returning `Some` aborts
    /// the run.
    fn take_failure(&mut self) -> Option<MutarunError> {
        None
    }
}

/// Fans classified outcomes out to every registered listener.
///
/// Listeners are called in registration order. Outcomes handed over in one
/// batch are dispatched in batch order.
#[derive(Default)]
pub struct Dispatcher {
    listeners: Vec<Box<dyn UnitListener>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: impl UnitListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn run_started(&mut self) {
        for listener in self.listeners.iter_mut() {
            listener.on_run_start();
        }
    }

    pub fn run_finished(&mut self) {
        for listener in self.listeners.iter_mut() {
            listener.on_run_end();
        }
    }

    /// First fatal failure reported by any listener.
    pub fn take_failure(&mut self) -> Option<MutarunError> {
        self.listeners.iter_mut().find_map(|l| l.take_failure())
    }

    /// Invoke the callback for `classification` on every listener.
    pub fn dispatch(&mut self, classification: Classification, outcome: &RawOutcome) {
        trace!(unit = %outcome.unit, ?classification, "dispatching outcome");
        let action = classification.action();
        for listener in self.listeners.iter_mut() {
            action(listener.as_mut(), outcome);
        }
    }

    /// Classify and dispatch a drained batch, preserving its order.
    ///
    /// Returns the classification of each outcome, in the same order.
    pub fn dispatch_batch(&mut self, outcomes: &[RawOutcome]) -> Vec<Classification> {
        outcomes
            .iter()
            .map(|outcome| {
                let classification = classify(outcome);
                self.dispatch(classification, outcome);
                classification
            })
            .collect()
    }
}
