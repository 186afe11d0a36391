// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! The scheduler talks to an `ExecutionBackend` instead of spawning work
//! itself. This makes it easy to swap in a fake backend in tests while keeping
//! the production pool in [`pool`](super::pool).
//!
//! A backend is constructed together with the sending half of a results
//! channel (see [`results_channel`]); it is the only writer of
//! [`RawOutcome`]s into that channel and must send exactly one outcome per
//! unit of every group it accepts.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::dag::Group;
use crate::engine::RawOutcome;
use crate::errors::Result;

/// Boxed future returned by backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Sending half of the results channel, held by the backend.
pub type ResultsSender = mpsc::Sender<RawOutcome>;

/// Receiving half of the results channel, drained by the scheduler.
pub type ResultsReceiver = mpsc::Receiver<RawOutcome>;

/// Default capacity of the results channel.
pub const DEFAULT_RESULTS_CAPACITY: usize = 256;

/// Create a bounded results channel.
pub fn results_channel(capacity: usize) -> (ResultsSender, ResultsReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Trait abstracting how groups are executed.
///
/// Production code uses [`ProcessBackend`](super::ProcessBackend); tests can
/// provide their own implementation that doesn't spawn real processes.
pub trait ExecutionBackend: Send + Sync {
    /// Accept a group for execution.
    ///
    /// May wait for capacity (backpressure). Submitting after
    /// [`shutdown`](Self::shutdown) is an error.
    fn submit(&self, group: Group) -> BackendFuture<'_, ()>;

    /// Stop accepting groups. Groups already accepted still run to completion.
    fn shutdown(&self);

    /// Wait up to `timeout` for the backend to terminate.
    ///
    /// Resolves to `true` once the backend is shut down and every accepted
    /// group has finished and sent its outcomes, `false` on timeout. An
    /// implementation may fail with
    /// [`MutarunError::Interrupted`](crate::errors::MutarunError::Interrupted)
    /// if the wait was cut short; callers may simply wait again.
    fn await_termination(&self, timeout: Duration) -> BackendFuture<'_, bool>;
}
