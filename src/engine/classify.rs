// src/engine/classify.rs

//! Map raw outcomes to semantic categories.

use crate::engine::dispatch::UnitListener;
use crate::engine::{RawOutcome, UnitStatus};
use crate::types::{DetectionStatus, Verdict};

/// Action invoked on a listener for one classified outcome.
pub type ListenerAction = fn(&mut dyn UnitListener, &RawOutcome);

/// Semantic category of a [`RawOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Success,
    Failure,
    Error,
    Skipped,
}

impl Classification {
    /// The listener callback this category dispatches to.
    pub fn action(self) -> ListenerAction {
        match self {
            Classification::Success => notify_success,
            Classification::Failure => notify_failure,
            Classification::Error => notify_error,
            Classification::Skipped => notify_skipped,
        }
    }
}

fn notify_success(listener: &mut dyn UnitListener, outcome: &RawOutcome) {
    listener.on_success(outcome);
}

fn notify_failure(listener: &mut dyn UnitListener, outcome: &RawOutcome) {
    listener.on_failure(outcome);
}

fn notify_error(listener: &mut dyn UnitListener, outcome: &RawOutcome) {
    listener.on_error(outcome);
}

fn notify_skipped(listener: &mut dyn UnitListener, outcome: &RawOutcome) {
    listener.on_skipped(outcome);
}

/// Classify an outcome. Pure: depends only on `outcome.status`.
pub fn classify(outcome: &RawOutcome) -> Classification {
    match outcome.status {
        UnitStatus::Passed => Classification::Success,
        UnitStatus::Failed { .. } => Classification::Failure,
        UnitStatus::TimedOut | UnitStatus::Errored { .. } => Classification::Error,
        UnitStatus::Skipped { .. } => Classification::Skipped,
    }
}

/// Derive the verdict to persist for an outcome.
///
/// A unit verifies a mutant: passing means the mutant survived, failing means
/// the unit killed it. Units without a mutation, and skipped units, produce
/// no verdict.
pub fn verdict_for(outcome: &RawOutcome) -> Option<Verdict> {
    outcome.mutation.as_ref()?;

    let (status, killing_test) = match &outcome.status {
        UnitStatus::Passed => (DetectionStatus::Survived, None),
        UnitStatus::Failed { .. } => (DetectionStatus::Killed, Some(outcome.unit.to_string())),
        UnitStatus::TimedOut => (DetectionStatus::TimedOut, None),
        UnitStatus::Errored { .. } => (DetectionStatus::RunError, None),
        UnitStatus::Skipped { .. } => return None,
    };

    Some(Verdict::new(1, status, killing_test))
}
