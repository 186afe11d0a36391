#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use mutarun::dag::{Group, RunnableUnit, UnitId};
use mutarun::engine::{RawOutcome, UnitStatus};
use mutarun::errors::MutarunError;
use mutarun::exec::{BackendFuture, ExecutionBackend, ResultsSender, UnitRunner};

#[derive(Debug, Clone, Copy)]
struct State {
    accepting: bool,
    in_flight: usize,
}

/// A fake backend that:
/// - records every submitted group, in submission order
/// - "runs" each group on its own task, reporting the scripted status of each
///   unit (default `Passed`) after an optional per-unit delay
/// - can fail a chosen submit and interrupt the first N termination waits.
pub struct FakeBackend {
    results: ResultsSender,
    statuses: HashMap<UnitId, UnitStatus>,
    delays: HashMap<UnitId, Duration>,
    fail_submit_at: Option<usize>,
    interrupts: AtomicUsize,
    submit_count: AtomicUsize,
    submitted: Arc<Mutex<Vec<Vec<UnitId>>>>,
    state: watch::Sender<State>,
}

impl FakeBackend {
    pub fn new(results: ResultsSender) -> Self {
        let (state, _) = watch::channel(State {
            accepting: true,
            in_flight: 0,
        });
        Self {
            results,
            statuses: HashMap::new(),
            delays: HashMap::new(),
            fail_submit_at: None,
            interrupts: AtomicUsize::new(0),
            submit_count: AtomicUsize::new(0),
            submitted: Arc::new(Mutex::new(Vec::new())),
            state,
        }
    }

    pub fn with_status(mut self, unit: &str, status: UnitStatus) -> Self {
        self.statuses.insert(UnitId::from(unit), status);
        self
    }

    pub fn with_delay(mut self, unit: &str, delay: Duration) -> Self {
        self.delays.insert(UnitId::from(unit), delay);
        self
    }

    /// Make the `n`th submit (0-based) fail with a backend error.
    pub fn failing_submit_at(mut self, n: usize) -> Self {
        self.fail_submit_at = Some(n);
        self
    }

    /// The first `n` calls to `await_termination` fail with `Interrupted`.
    pub fn with_interrupts(self, n: usize) -> Self {
        self.interrupts.store(n, Ordering::SeqCst);
        self
    }

    pub fn interrupts_left(&self) -> usize {
        self.interrupts.load(Ordering::SeqCst)
    }

    /// Unit ids of every accepted group, in submission order.
    pub fn submitted(&self) -> Vec<Vec<UnitId>> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        !self.state.borrow().accepting
    }
}

impl ExecutionBackend for FakeBackend {
    fn submit(&self, group: Group) -> BackendFuture<'_, ()> {
        Box::pin(async move {
            let accepting = self.state.borrow().accepting;
            if !accepting {
                return Err(MutarunError::Backend("submit after shutdown".into()));
            }
            let n = self.submit_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_submit_at == Some(n) {
                return Err(MutarunError::Backend(format!("scripted failure at submit {n}")));
            }

            self.submitted
                .lock()
                .unwrap()
                .push(group.ids().cloned().collect());
            self.state.send_modify(|s| s.in_flight += 1);

            let planned: Vec<(RunnableUnit, UnitStatus, Option<Duration>)> = group
                .into_units()
                .into_iter()
                .map(|u| {
                    let status = self
                        .statuses
                        .get(u.id())
                        .cloned()
                        .unwrap_or(UnitStatus::Passed);
                    let delay = self.delays.get(u.id()).copied();
                    (u, status, delay)
                })
                .collect();
            let results = self.results.clone();
            let state = self.state.clone();

            tokio::spawn(async move {
                for (unit, status, delay) in planned {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    let outcome = RawOutcome::new(unit.id().clone(), status)
                        .with_mutation(unit.mutation().cloned());
                    if results.send(outcome).await.is_err() {
                        break;
                    }
                }
                state.send_modify(|s| s.in_flight -= 1);
            });
            Ok(())
        })
    }

    fn shutdown(&self) {
        self.state.send_modify(|s| s.accepting = false);
    }

    fn await_termination(&self, timeout: Duration) -> BackendFuture<'_, bool> {
        Box::pin(async move {
            let interrupted = self
                .interrupts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if interrupted {
                return Err(MutarunError::Interrupted);
            }

            let mut rx = self.state.subscribe();
            let done = |s: &State| !s.accepting && s.in_flight == 0;
            match tokio::time::timeout(timeout, rx.wait_for(done)).await {
                Ok(Ok(_)) => Ok(true),
                Ok(Err(_)) => Err(MutarunError::Backend("state channel closed".into())),
                Err(_) => Ok(false),
            }
        })
    }
}

/// A unit runner that returns scripted statuses without spawning processes
/// and records the order units were run in.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    statuses: HashMap<UnitId, UnitStatus>,
    runs: Arc<Mutex<Vec<UnitId>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, unit: &str, status: UnitStatus) -> Self {
        self.statuses.insert(UnitId::from(unit), status);
        self
    }

    /// Handle to the list of units run so far; shared across clones.
    pub fn runs(&self) -> Arc<Mutex<Vec<UnitId>>> {
        Arc::clone(&self.runs)
    }
}

impl UnitRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        unit: &'a RunnableUnit,
    ) -> Pin<Box<dyn Future<Output = UnitStatus> + Send + 'a>> {
        Box::pin(async move {
            self.runs.lock().unwrap().push(unit.id().clone());
            tokio::task::yield_now().await;
            self.statuses
                .get(unit.id())
                .cloned()
                .unwrap_or(UnitStatus::Passed)
        })
    }
}
