// tests/process_backend.rs
#![cfg(unix)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use mutarun::dag::{RunnableUnit, UnitId, group_units};
use mutarun::engine::{Dispatcher, ExecutionScheduler, RawOutcome, SchedulerOptions, UnitStatus};
use mutarun::errors::MutarunError;
use mutarun::exec::{
    DEFAULT_RESULTS_CAPACITY, ExecutionBackend, ProcessBackend, ResultsReceiver, ShellUnitRunner,
    UnitRunner, results_channel,
};
use mutarun_test_utils::builders::mutation;
use mutarun_test_utils::fake_backend::ScriptedRunner;
use mutarun_test_utils::recording::{Event, RecordingListener};
use mutarun_test_utils::{init_tracing, with_timeout};

fn shell() -> ShellUnitRunner {
    ShellUnitRunner::new(Duration::from_secs(5))
}

async fn run_all<R: UnitRunner>(
    runner: R,
    workers: usize,
    units: Vec<RunnableUnit>,
) -> HashMap<String, RawOutcome> {
    let (tx, mut rx) = results_channel(DEFAULT_RESULTS_CAPACITY);
    let backend = ProcessBackend::new(runner, workers, tx);
    for group in group_units(units).unwrap() {
        backend.submit(group).await.unwrap();
    }
    backend.shutdown();
    while !backend
        .await_termination(Duration::from_millis(50))
        .await
        .unwrap()
    {}
    collect(&mut rx)
}

fn collect(rx: &mut ResultsReceiver) -> HashMap<String, RawOutcome> {
    let mut out = HashMap::new();
    while let Ok(outcome) = rx.try_recv() {
        out.insert(outcome.unit.to_string(), outcome);
    }
    out
}

#[tokio::test]
async fn exit_status_maps_to_passed_or_failed() {
    init_tracing();
    with_timeout(async {
        let outcomes = run_all(
            shell(),
            2,
            vec![
                RunnableUnit::new("ok", "true"),
                RunnableUnit::new("bad", "exit 3"),
            ],
        )
        .await;

        assert_eq!(outcomes["ok"].status, UnitStatus::Passed);
        assert_eq!(outcomes["bad"].status, UnitStatus::Failed { exit_code: 3 });
    })
    .await
}

#[tokio::test]
async fn slow_unit_is_killed_on_timeout() {
    with_timeout(async {
        let outcomes = run_all(
            shell(),
            1,
            vec![RunnableUnit::new("slow", "sleep 10").with_timeout(Duration::from_millis(200))],
        )
        .await;

        assert_eq!(outcomes["slow"].status, UnitStatus::TimedOut);
    })
    .await
}

#[tokio::test]
async fn mutation_coordinates_are_exported_to_the_command() {
    with_timeout(async {
        let check = r#"[ "$MUTARUN_UNIT_ID" = "env-check" ] && [ "$MUTARUN_MUTATION_CLASS" = "com.example.Foo" ] && [ "$MUTARUN_MUTATION_INDEX" = "9" ]"#;
        let outcomes = run_all(
            shell(),
            1,
            vec![RunnableUnit::new("env-check", check).with_mutation(mutation("com.example.Foo", 9))],
        )
        .await;

        let outcome = &outcomes["env-check"];
        assert_eq!(outcome.status, UnitStatus::Passed);
        assert_eq!(outcome.mutation, Some(mutation("com.example.Foo", 9)));
    })
    .await
}

#[tokio::test]
async fn rest_of_group_is_skipped_after_a_timeout() {
    with_timeout(async {
        let outcomes = run_all(
            ScriptedRunner::new().with_status("a", UnitStatus::TimedOut),
            1,
            vec![
                RunnableUnit::new("a", "unused"),
                RunnableUnit::new("b", "unused").depending_on("a"),
                RunnableUnit::new("c", "unused").depending_on("b"),
                RunnableUnit::new("other", "unused"),
            ],
        )
        .await;

        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes["a"].status, UnitStatus::TimedOut);
        assert!(matches!(outcomes["b"].status, UnitStatus::Skipped { .. }));
        assert!(matches!(outcomes["c"].status, UnitStatus::Skipped { .. }));
        assert_eq!(outcomes["other"].status, UnitStatus::Passed);
    })
    .await
}

#[tokio::test]
async fn failure_does_not_skip_the_rest_of_the_group() {
    with_timeout(async {
        let runner = ScriptedRunner::new().with_status("a", UnitStatus::Failed { exit_code: 1 });
        let runs = runner.runs();
        let outcomes = run_all(
            runner,
            1,
            vec![
                RunnableUnit::new("a", "unused"),
                RunnableUnit::new("b", "unused").depending_on("a"),
            ],
        )
        .await;

        assert_eq!(outcomes["b"].status, UnitStatus::Passed);
        let order: Vec<String> = runs.lock().unwrap().iter().map(|u| u.to_string()).collect();
        assert_eq!(order, vec!["a", "b"]);
    })
    .await
}

#[tokio::test]
async fn submit_after_shutdown_is_a_backend_error() {
    with_timeout(async {
        let (tx, _rx) = results_channel(4);
        let backend = ProcessBackend::new(ScriptedRunner::new(), 1, tx);
        backend.shutdown();

        let group = group_units(vec![RunnableUnit::new("late", "true")])
            .unwrap()
            .remove(0);
        let err = backend.submit(group).await.unwrap_err();
        assert!(matches!(err, MutarunError::Backend(_)));
        assert!(backend.await_termination(Duration::from_millis(10)).await.unwrap());
    })
    .await
}

#[tokio::test]
async fn termination_waits_for_groups_in_flight() {
    with_timeout(async {
        let (tx, mut rx) = results_channel(4);
        let backend = Arc::new(ProcessBackend::new(shell(), 1, tx));
        assert_eq!(backend.workers(), 1);

        let group = group_units(vec![RunnableUnit::new("nap", "sleep 0.3")])
            .unwrap()
            .remove(0);
        backend.submit(group).await.unwrap();

        assert!(!backend.await_termination(Duration::from_millis(10)).await.unwrap());
        backend.shutdown();
        assert!(!backend.await_termination(Duration::from_millis(10)).await.unwrap());
        while !backend.await_termination(Duration::from_millis(50)).await.unwrap() {}

        assert_eq!(collect(&mut rx).len(), 1);
    })
    .await
}

#[tokio::test]
async fn zero_workers_is_clamped_to_one() {
    let (tx, _rx) = results_channel(1);
    let backend = ProcessBackend::new(ScriptedRunner::new(), 0, tx);
    assert_eq!(backend.workers(), 1);
}


/// Panics on units named "boom"; everything else passes.
struct PanickingRunner;

impl UnitRunner for PanickingRunner {
    fn run<'a>(
        &'a self,
        unit: &'a RunnableUnit,
    ) -> Pin<Box<dyn Future<Output = UnitStatus> + Send + 'a>> {
        Box::pin(async move {
            if unit.id().as_str() == "boom" {
                panic!("runner bug");
            }
            UnitStatus::Passed
        })
    }
}

#[tokio::test]
async fn panicking_runner_reports_lost_units_and_terminates() {
    with_timeout(async {
        let (tx, mut rx) = results_channel(DEFAULT_RESULTS_CAPACITY);
        let backend = Arc::new(ProcessBackend::new(PanickingRunner, 2, tx));

        let listener = RecordingListener::new();
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_listener(listener.clone());
        let mut scheduler = ExecutionScheduler::new(dispatcher, SchedulerOptions::default());

        let groups = group_units(vec![
            RunnableUnit::new("first", "unused"),
            RunnableUnit::new("boom", "unused").depending_on("first"),
            RunnableUnit::new("after", "unused").depending_on("boom"),
            RunnableUnit::new("solo", "unused"),
        ])
        .unwrap();

        let summary = scheduler.run(groups, backend, &mut rx).await.unwrap();
        assert_eq!(summary.dispatched, 4);

        let events = listener.events();
        assert!(events.contains(&Event::Success(UnitId::from("first"))));
        assert!(events.contains(&Event::Error(UnitId::from("boom"))));
        assert!(events.contains(&Event::Skipped(UnitId::from("after"))));
        assert!(events.contains(&Event::Success(UnitId::from("solo"))));
        assert_eq!(events.last(), Some(&Event::RunEnd));
    })
    .await
}
