// src/exec/pool.rs

//! Bounded worker pool backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, watch};
use tracing::{debug, warn};

use crate::dag::{Group, UnitId};
use crate::engine::{RawOutcome, UnitStatus};
use crate::errors::MutarunError;
use crate::exec::backend::{BackendFuture, ExecutionBackend, ResultsSender};
use crate::exec::unit_runner::UnitRunner;
use crate::types::MutationIdentifier;

/// Lifecycle of the pool, published over a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PoolState {
    accepting: bool,
    in_flight: usize,
}

impl PoolState {
    fn terminated(&self) -> bool {
        !self.accepting && self.in_flight == 0
    }
}

/// Counts one group as in flight until dropped, unwinding included.
struct InFlight(watch::Sender<PoolState>);

impl InFlight {
    fn enter(state: watch::Sender<PoolState>) -> Self {
        state.send_modify(|s| s.in_flight += 1);
        Self(state)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.send_modify(|s| s.in_flight -= 1);
    }
}

/// Runs each accepted group on its own Tokio task, at most `workers` groups
/// at a time.
///
/// Units inside a group run sequentially in group order. Once a unit times
/// out or errors, the rest of its group is reported as
/// [`UnitStatus::Skipped`], so every unit still yields one outcome.
pub struct ProcessBackend<R: UnitRunner> {
    runner: Arc<R>,
    permits: Arc<Semaphore>,
    results: ResultsSender,
    state: watch::Sender<PoolState>,
    workers: usize,
}

impl<R: UnitRunner> std::fmt::Debug for ProcessBackend<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessBackend")
            .field("workers", &self.workers)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<R: UnitRunner> ProcessBackend<R> {
    /// Create a pool of `workers` (clamped to at least 1) reporting into
    /// `results`.
    pub fn new(runner: R, workers: usize, results: ResultsSender) -> Self {
        let workers = workers.max(1);
        let (state, _) = watch::channel(PoolState {
            accepting: true,
            in_flight: 0,
        });
        Self {
            runner: Arc::new(runner),
            permits: Arc::new(Semaphore::new(workers)),
            results,
            state,
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl<R: UnitRunner> ExecutionBackend for ProcessBackend<R> {
    fn submit(&self, group: Group) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let accepting = self.state.borrow().accepting;
            if !accepting {
                return Err(MutarunError::Backend(
                    "group submitted after shutdown".to_string(),
                ));
            }

            // Backpressure: wait for a free worker before accepting.
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|_| MutarunError::Backend("worker pool closed unexpectedly".into()))?;

            let in_flight = InFlight::enter(self.state.clone());
            let runner = Arc::clone(&self.runner);
            let results = self.results.clone();

            tokio::spawn(async move {
                // Outcomes are sent before the group stops counting as in flight.
                let _in_flight = in_flight;
                let _permit = permit;

                let pending: Vec<(UnitId, Option<MutationIdentifier>)> = group
                    .units()
                    .iter()
                    .map(|u| (u.id().clone(), u.mutation().cloned()))
                    .collect();
                let reported = Arc::new(AtomicUsize::new(0));

                let worker = tokio::spawn({
                    let results = results.clone();
                    let reported = Arc::clone(&reported);
                    async move { run_group(runner.as_ref(), group, &results, &reported).await }
                });

                if let Err(err) = worker.await {
                    let done = reported.load(Ordering::SeqCst).min(pending.len());
                    report_lost_units(&pending[done..], &err.to_string(), &results).await;
                }
            });

            Ok(())
        })
    }

    fn shutdown(&self) {
        self.state.send_if_modified(|s| {
            let was_accepting = s.accepting;
            s.accepting = false;
            was_accepting
        });
        debug!("process backend stopped accepting groups");
    }

    fn await_termination(&self, timeout: Duration) -> BackendFuture<'_, bool> {
        Box::pin(async move {
            let mut rx = self.state.subscribe();
            match tokio::time::timeout(timeout, rx.wait_for(PoolState::terminated)).await {
                Ok(Ok(_)) => Ok(true),
                Ok(Err(_)) => Err(MutarunError::Backend(
                    "pool state channel closed".to_string(),
                )),
                Err(_elapsed) => Ok(false),
            }
        })
    }
}

/// Run every unit of `group` in order, sending one outcome per unit.
///
/// `reported` counts the outcomes sent so far.
async fn run_group<R: UnitRunner>(
    runner: &R,
    group: Group,
    results: &ResultsSender,
    reported: &AtomicUsize,
) {
    let size = group.len();
    let mut abort_reason: Option<String> = None;

    for unit in group.into_units() {
        let outcome = if let Some(reason) = abort_reason.clone() {
            RawOutcome::new(unit.id().clone(), UnitStatus::Skipped { reason })
                .with_mutation(unit.mutation().cloned())
        } else {
            let started = Instant::now();
            let status = runner.run(&unit).await;
            if matches!(status, UnitStatus::TimedOut | UnitStatus::Errored { .. }) {
                abort_reason = Some(format!("earlier unit '{}' did not complete", unit.id()));
            }
            RawOutcome::new(unit.id().clone(), status)
                .with_mutation(unit.mutation().cloned())
                .with_elapsed(started.elapsed())
        };

        if results.send(outcome).await.is_err() {
            warn!(unit = %unit.id(), "results channel closed; dropping remaining outcomes of group");
            return;
        }
        reported.fetch_add(1, Ordering::SeqCst);
    }

    debug!(size, aborted = abort_reason.is_some(), "group finished");
}

/// Report the units a crashed group task never got to: the first one as
/// errored, the rest as skipped.
async fn report_lost_units(
    lost: &[(UnitId, Option<MutationIdentifier>)],
    cause: &str,
    results: &ResultsSender,
) {
    let Some((first, _)) = lost.first() else {
        return;
    };
    warn!(unit = %first, lost = lost.len(), cause, "group task crashed");

    for (i, (unit, mutation)) in lost.iter().enumerate() {
        let status = if i == 0 {
            UnitStatus::Errored {
                message: format!("unit runner crashed: {cause}"),
            }
        } else {
            UnitStatus::Skipped {
                reason: format!("earlier unit '{first}' did not complete"),
            }
        };
        let outcome = RawOutcome::new(unit.clone(), status).with_mutation(mutation.clone());
        if results.send(outcome).await.is_err() {
            warn!("results channel closed; dropping outcomes of crashed group");
            return;
        }
    }
}
