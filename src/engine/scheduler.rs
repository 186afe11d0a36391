// src/engine/scheduler.rs

//! Drives groups through an execution backend and drains its results.
//!
//! Two tasks cooperate for one run:
//!
//! - a **producer**, spawned on the runtime, submits groups to the backend in
//!   order and then shuts it down;
//! - the **consumer**, which is the caller of [`ExecutionScheduler::run`],
//!   waits for backend termination in short slices and drains the results
//!   channel after every slice, so outcomes are dispatched while the run is
//!   still going.
//!
//! Termination of the backend does not end the run by itself: the consumer
//! then joins the producer (still draining between join attempts) and finally
//! empties the channel. Only after all three have happened does `run` return,
//! which is what guarantees every outcome is dispatched exactly once.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::Group;
use crate::engine::classify::Classification;
use crate::engine::dispatch::Dispatcher;
use crate::engine::RawOutcome;
use crate::errors::{MutarunError, Result};
use crate::exec::{ExecutionBackend, ResultsReceiver};

/// Timing knobs for the consumer loop.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    /// Slice length for each wait on backend termination.
    pub poll_interval: Duration,
    /// Slice length for each attempt to join the producer after termination.
    pub join_interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
            join_interval: Duration::from_millis(100),
        }
    }
}

/// What one run dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub groups_submitted: usize,
    pub dispatched: usize,
    pub successes: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    /// How many drained batches the outcomes arrived in.
    pub batches: usize,
}

impl RunSummary {
    fn count(&mut self, classifications: &[Classification]) {
        if classifications.is_empty() {
            return;
        }
        self.batches += 1;
        for c in classifications {
            self.dispatched += 1;
            match c {
                Classification::Success => self.successes += 1,
                Classification::Failure => self.failures += 1,
                Classification::Error => self.errors += 1,
                Classification::Skipped => self.skipped += 1,
            }
        }
    }
}

/// Runs groups on a backend and hands every outcome to a [`Dispatcher`].
#[derive(Debug)]
pub struct ExecutionScheduler {
    dispatcher: Dispatcher,
    options: SchedulerOptions,
}

impl ExecutionScheduler {
    pub fn new(dispatcher: Dispatcher, options: SchedulerOptions) -> Self {
        Self {
            dispatcher,
            options,
        }
    }

    /// Submit `groups` to `backend` and dispatch every outcome that arrives on
    /// `results`.
    ///
    /// Returns once the backend has terminated, the producer has exited and
    /// the channel is empty.
    ///
    /// A wait that fails with [`MutarunError::Interrupted`] is logged and
    /// retried; the run is not aborted by an interrupt alone. Bounding the
    /// overall run time is left to the caller (e.g. `tokio::time::timeout`).
    ///
    /// Listeners see `on_run_end` on every exit path, errors included.
    pub async fn run<B>(
        &mut self,
        groups: Vec<Group>,
        backend: Arc<B>,
        results: &mut ResultsReceiver,
    ) -> Result<RunSummary>
    where
        B: ExecutionBackend + 'static,
    {
        self.dispatcher.run_started();
        let outcome = self.execute(groups, backend, results).await;
        self.dispatcher.run_finished();
        outcome
    }

    async fn execute<B>(
        &mut self,
        groups: Vec<Group>,
        backend: Arc<B>,
        results: &mut ResultsReceiver,
    ) -> Result<RunSummary>
    where
        B: ExecutionBackend + 'static,
    {
        let mut summary = RunSummary::default();
        let group_count = groups.len();
        info!(groups = group_count, "starting execution");

        let mut producer = spawn_producer(Arc::clone(&backend), groups);

        // Phase 1: wait for the backend in short slices, draining in between.
        loop {
            match backend.await_termination(self.options.poll_interval).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(MutarunError::Interrupted) => {
                    // Best effort: an interrupt only cuts this slice short.
                    warn!("wait on execution backend interrupted; waiting again");
                }
                Err(err) => {
                    backend.shutdown();
                    producer.abort();
                    return Err(err);
                }
            }

            if let Err(err) = self.drain(results, &mut summary) {
                backend.shutdown();
                producer.abort();
                return Err(err);
            }
        }

        debug!("execution backend terminated; joining producer");

        // Phase 2: join the producer, still draining between attempts.
        let produced = loop {
            tokio::select! {
                joined = &mut producer => break joined,
                _ = tokio::time::sleep(self.options.join_interval) => {
                    self.drain(results, &mut summary)?;
                }
            }
        };

        // Phase 3: nothing can be sent any more; empty the channel.
        self.drain(results, &mut summary)?;

        summary.groups_submitted = match produced {
            Ok(Ok(submitted)) => submitted,
            Ok(Err(err)) => return Err(err),
            Err(join_err) => {
                return Err(MutarunError::Backend(format!(
                    "group producer task failed: {join_err}"
                )));
            }
        };

        info!(
            groups = summary.groups_submitted,
            dispatched = summary.dispatched,
            batches = summary.batches,
            "execution finished"
        );
        Ok(summary)
    }

    /// Dispatch everything currently in the channel as one batch.
    fn drain(&mut self, results: &mut ResultsReceiver, summary: &mut RunSummary) -> Result<()> {
        let mut batch: Vec<RawOutcome> = Vec::new();
        loop {
            match results.try_recv() {
                Ok(outcome) => batch.push(outcome),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if batch.is_empty() {
            return Ok(());
        }

        debug!(batch = batch.len(), "dispatching drained outcomes");
        let classifications = self.dispatcher.dispatch_batch(&batch);
        summary.count(&classifications);

        match self.dispatcher.take_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Submit groups in order, then shut the backend down.
///
/// The backend is shut down even when a submit fails, so the consumer's
/// termination wait always completes.
fn spawn_producer<B>(backend: Arc<B>, groups: Vec<Group>) -> JoinHandle<Result<usize>>
where
    B: ExecutionBackend + 'static,
{
    tokio::spawn(async move {
        let mut submitted = 0usize;
        let mut outcome = Ok(());

        for group in groups {
            debug!(group = submitted, size = group.len(), "submitting group");
            if let Err(err) = backend.submit(group).await {
                outcome = Err(err);
                break;
            }
            submitted += 1;
        }

        backend.shutdown();
        debug!(submitted, "producer finished; backend shut down");
        outcome.map(|()| submitted)
    })
}
