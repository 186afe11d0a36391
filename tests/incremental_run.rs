// tests/incremental_run.rs

use std::io::Cursor;
use std::sync::Arc;

use mutarun::RunOptions;
use mutarun::engine::UnitStatus;
use mutarun::execute_plan_with;
use mutarun::fs::mock::MockFileSystem;
use mutarun::history::{HistoryInput, HistoryStore, JsonRecordFormat, MemorySink};
use mutarun::incremental::{carry_forward, partition_reusable};
use mutarun::types::{ClassFingerprint, DetectionStatus};
use mutarun_test_utils::builders::{
    RunPlanBuilder, UnitConfigBuilder, fingerprint, mutation, unit, unit_after, verdict,
};
use mutarun_test_utils::fake_backend::ScriptedRunner;
use mutarun_test_utils::{init_tracing, with_timeout};
use tempfile::tempdir;

/// A loaded store whose history holds `classes` and a verdict per entry.
fn history_with(
    classes: &[ClassFingerprint],
    verdicts: &[(u32, DetectionStatus)],
) -> HistoryStore {
    let sink = MemorySink::new();
    let writer = HistoryStore::new(Arc::new(JsonRecordFormat::new()), Arc::new(sink.clone()), None);
    writer.record_class_path(classes).unwrap();
    for (index, status) in verdicts {
        writer
            .record_result(&mutation("Foo", *index), &verdict(*status))
            .unwrap();
    }

    let input: HistoryInput = Box::new(Cursor::new(sink.contents()));
    let mut store = HistoryStore::new(
        Arc::new(JsonRecordFormat::new()),
        Arc::new(MemorySink::new()),
        Some(input),
    );
    store.initialize().unwrap();
    store
}

#[test]
fn unchanged_class_with_final_verdict_is_reused() {
    let store = history_with(&[fingerprint("Foo", "v1")], &[(1, DetectionStatus::Killed)]);
    let units = vec![unit("m1").with_mutation(mutation("Foo", 1))];

    let partition = partition_reusable(units, &store, &[fingerprint("Foo", "v1")]);

    assert!(partition.to_run.is_empty());
    assert_eq!(partition.reused.len(), 1);
    assert_eq!(partition.reused[0].unit.as_str(), "m1");
    assert_eq!(partition.reused[0].verdict.status, DetectionStatus::Killed);
}

#[test]
fn changed_class_is_reverified() {
    let store = history_with(&[fingerprint("Foo", "v1")], &[(1, DetectionStatus::Killed)]);
    let units = vec![unit("m1").with_mutation(mutation("Foo", 1))];

    let partition = partition_reusable(units, &store, &[fingerprint("Foo", "v2")]);

    assert_eq!(partition.to_run.len(), 1);
    assert!(partition.reused.is_empty());
}

#[test]
fn non_final_or_missing_verdicts_are_reverified() {
    let store = history_with(&[fingerprint("Foo", "v1")], &[(1, DetectionStatus::RunError)]);
    let units = vec![
        unit("m1").with_mutation(mutation("Foo", 1)),
        unit("m2").with_mutation(mutation("Foo", 2)),
    ];

    let partition = partition_reusable(units, &store, &[fingerprint("Foo", "v1")]);

    assert_eq!(partition.to_run.len(), 2);
}

#[test]
fn units_others_depend_on_and_plain_units_always_run() {
    let store = history_with(
        &[fingerprint("Foo", "v1")],
        &[(1, DetectionStatus::Survived), (2, DetectionStatus::Survived)],
    );
    let units = vec![
        unit("m1").with_mutation(mutation("Foo", 1)),
        unit_after("m2", "m1").with_mutation(mutation("Foo", 2)),
        unit("setup"),
    ];

    let partition = partition_reusable(units, &store, &[fingerprint("Foo", "v1")]);

    let to_run: Vec<&str> = partition.to_run.iter().map(|u| u.id().as_str()).collect();
    assert_eq!(to_run, vec!["m1", "setup"]);
    assert_eq!(partition.reused.len(), 1);
    assert_eq!(partition.reused[0].unit.as_str(), "m2");
}

#[test]
fn reused_verdicts_are_carried_into_the_new_history() {
    let store = history_with(&[fingerprint("Foo", "v1")], &[(1, DetectionStatus::Killed)]);
    let partition = partition_reusable(
        vec![unit("m1").with_mutation(mutation("Foo", 1))],
        &store,
        &[fingerprint("Foo", "v1")],
    );

    let sink = MemorySink::new();
    let next = HistoryStore::new(Arc::new(JsonRecordFormat::new()), Arc::new(sink.clone()), None);
    next.record_class_path(&[fingerprint("Foo", "v1")]).unwrap();
    carry_forward(&next, &partition.reused).unwrap();

    assert!(sink.contents_string().contains(r#""status":"KILLED""#));
}

#[tokio::test]
async fn second_run_reuses_verdicts_of_the_first() {
    init_tracing();
    with_timeout(async {
        let dir = tempdir().unwrap();
        let history = dir.path().join(".mutarun").join("history");
        let fs = MockFileSystem::new();
        fs.add_file("/classes/Foo.class", "foo v1");

        let plan = || {
            RunPlanBuilder::new()
                .threads(2)
                .history(Some(history.clone()), Some(history.clone()))
                .unit(UnitConfigBuilder::new("kill", "unused").mutation("Foo", 1))
                .unit(UnitConfigBuilder::new("live", "unused").mutation("Foo", 2))
                .unit(UnitConfigBuilder::new("plain", "unused"))
                .raw()
        };
        let mut raw = plan();
        raw.classes.push(mutarun::config::ClassConfig {
            name: "Foo".into(),
            path: Some("/classes/Foo.class".into()),
            hash: None,
            parent: None,
        });
        let build = |raw: mutarun::config::RawRunPlan| {
            mutarun::config::RunPlan::try_from(raw).unwrap()
        };

        let runner = ScriptedRunner::new().with_status("kill", UnitStatus::Failed { exit_code: 1 });
        let first = execute_plan_with(build(raw.clone()), &RunOptions::default(), runner.clone(), &fs)
            .await
            .unwrap();
        assert_eq!(first.reused, 0);
        assert_eq!(first.tally.total(), 3);
        assert_eq!(first.tally.failed, 1);
        assert_eq!(first.summary.groups_submitted, 3);

        // Same classes: both mutation units are reused, only "plain" runs.
        let second_runner = ScriptedRunner::new();
        let second_runs = second_runner.runs();
        let second = execute_plan_with(build(raw.clone()), &RunOptions::default(), second_runner, &fs)
            .await
            .unwrap();
        assert_eq!(second.reused, 2);
        assert_eq!(second.tally.total(), 1);
        let ran: Vec<String> = second_runs.lock().unwrap().iter().map(|u| u.to_string()).collect();
        assert_eq!(ran, vec!["plain"]);

        // Reused verdicts were carried forward, so a third run still reuses them.
        let third = execute_plan_with(build(raw.clone()), &RunOptions::default(), ScriptedRunner::new(), &fs)
            .await
            .unwrap();
        assert_eq!(third.reused, 2);

        // A class change invalidates everything for that class.
        fs.add_file("/classes/Foo.class", "foo v2");
        let fourth = execute_plan_with(build(raw.clone()), &RunOptions::default(), ScriptedRunner::new(), &fs)
            .await
            .unwrap();
        assert_eq!(fourth.reused, 0);
        assert_eq!(fourth.tally.total(), 3);

        // Opting out re-verifies even with a matching history.
        let options = RunOptions {
            no_incremental: true,
            ..RunOptions::default()
        };
        let fifth = execute_plan_with(build(raw), &options, ScriptedRunner::new(), &fs)
            .await
            .unwrap();
        assert_eq!(fifth.reused, 0);
        assert_eq!(fifth.tally.total(), 3);
    })
    .await
}

#[tokio::test]
async fn corrupted_history_input_fails_the_run() {
    with_timeout(async {
        let dir = tempdir().unwrap();
        let input = dir.path().join("history");
        std::fs::write(&input, "garbage\n").unwrap();

        let plan = RunPlanBuilder::new()
            .unit(UnitConfigBuilder::new("a", "unused"))
            .build();
        let options = RunOptions {
            history_input: Some(input),
            ..RunOptions::default()
        };

        let err = execute_plan_with(plan, &options, ScriptedRunner::new(), &MockFileSystem::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            mutarun::errors::MutarunError::CacheCorrupted { line: 1, .. }
        ));
    })
    .await
}

#[tokio::test]
async fn thread_override_of_zero_is_rejected() {
    let plan = RunPlanBuilder::new()
        .unit(UnitConfigBuilder::new("a", "unused"))
        .build();
    let options = RunOptions {
        threads: Some(0),
        ..RunOptions::default()
    };

    let result = execute_plan_with(plan, &options, ScriptedRunner::new(), &MockFileSystem::new()).await;
    assert!(matches!(result, Err(mutarun::errors::MutarunError::ConfigError(_))));
}
