#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mutarun::dag::UnitId;
use mutarun::engine::{RawOutcome, UnitListener};
use mutarun::errors::MutarunError;

/// One callback observed by a [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    RunStart,
    Success(UnitId),
    Failure(UnitId),
    Error(UnitId),
    Skipped(UnitId),
    RunEnd,
}

/// Listener that records every callback. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<Event>>>,
    fail_after: Option<usize>,
    failed: bool,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a fatal failure once this many outcomes have been seen.
    pub fn failing_after(mut self, outcomes: usize) -> Self {
        self.fail_after = Some(outcomes);
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Unit ids of every outcome callback, in dispatch order.
    pub fn units(&self) -> Vec<UnitId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Success(id) | Event::Failure(id) | Event::Error(id) | Event::Skipped(id) => {
                    Some(id)
                }
                Event::RunStart | Event::RunEnd => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl UnitListener for RecordingListener {
    fn on_run_start(&mut self) {
        self.push(Event::RunStart);
    }

    fn on_success(&mut self, outcome: &RawOutcome) {
        self.push(Event::Success(outcome.unit.clone()));
    }

    fn on_failure(&mut self, outcome: &RawOutcome) {
        self.push(Event::Failure(outcome.unit.clone()));
    }

    fn on_error(&mut self, outcome: &RawOutcome) {
        self.push(Event::Error(outcome.unit.clone()));
    }

    fn on_skipped(&mut self, outcome: &RawOutcome) {
        self.push(Event::Skipped(outcome.unit.clone()));
    }

    fn on_run_end(&mut self) {
        self.push(Event::RunEnd);
    }

    fn take_failure(&mut self) -> Option<MutarunError> {
        let limit = self.fail_after?;
        if self.failed || self.units().len() < limit {
            return None;
        }
        self.failed = true;
        Some(MutarunError::Backend(format!(
            "recording listener gave up after {limit} outcomes"
        )))
    }
}
