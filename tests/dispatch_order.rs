use mutarun::engine::{
    Classification, Dispatcher, RawOutcome, UnitStatus, classify, verdict_for,
};
use mutarun::types::DetectionStatus;
use mutarun_test_utils::builders::mutation;
use mutarun_test_utils::recording::{Event, RecordingListener};

fn outcome(id: &str, status: UnitStatus) -> RawOutcome {
    RawOutcome::new(id, status)
}

#[test]
fn classification_follows_unit_status() {
    assert_eq!(classify(&outcome("a", UnitStatus::Passed)), Classification::Success);
    assert_eq!(
        classify(&outcome("a", UnitStatus::Failed { exit_code: 1 })),
        Classification::Failure
    );
    assert_eq!(classify(&outcome("a", UnitStatus::TimedOut)), Classification::Error);
    assert_eq!(
        classify(&outcome(
            "a",
            UnitStatus::Errored {
                message: "spawn failed".into()
            }
        )),
        Classification::Error
    );
    assert_eq!(
        classify(&outcome(
            "a",
            UnitStatus::Skipped {
                reason: "earlier unit errored".into()
            }
        )),
        Classification::Skipped
    );
}

#[test]
fn batch_is_dispatched_in_order_to_listeners_in_registration_order() {
    let first = RecordingListener::new();
    let second = RecordingListener::new();
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_listener(first.clone());
    dispatcher.add_listener(second.clone());
    assert_eq!(dispatcher.listener_count(), 2);

    let batch = vec![
        outcome("c", UnitStatus::Passed),
        outcome("a", UnitStatus::Failed { exit_code: 2 }),
        outcome("b", UnitStatus::TimedOut),
    ];
    let classes = dispatcher.dispatch_batch(&batch);

    assert_eq!(
        classes,
        vec![
            Classification::Success,
            Classification::Failure,
            Classification::Error
        ]
    );
    let expected = vec![
        Event::Success("c".into()),
        Event::Failure("a".into()),
        Event::Error("b".into()),
    ];
    assert_eq!(first.events(), expected);
    assert_eq!(second.events(), expected);
}

#[test]
fn single_dispatch_uses_the_given_classification() {
    let listener = RecordingListener::new();
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_listener(listener.clone());

    dispatcher.dispatch(Classification::Skipped, &outcome("x", UnitStatus::Passed));
    dispatcher.run_started();
    dispatcher.run_finished();

    assert_eq!(
        listener.events(),
        vec![Event::Skipped("x".into()), Event::RunStart, Event::RunEnd]
    );
}

#[test]
fn verdicts_map_outcomes_of_mutation_units() {
    let m = mutation("com.example.Foo", 4);
    let with = |status| outcome("unit-4", status).with_mutation(Some(m.clone()));

    let survived = verdict_for(&with(UnitStatus::Passed)).unwrap();
    assert_eq!(survived.status, DetectionStatus::Survived);
    assert_eq!(survived.killing_test, None);

    let killed = verdict_for(&with(UnitStatus::Failed { exit_code: 1 })).unwrap();
    assert_eq!(killed.status, DetectionStatus::Killed);
    assert_eq!(killed.killing_test.as_deref(), Some("unit-4"));
    assert_eq!(killed.tests_run, 1);

    assert_eq!(
        verdict_for(&with(UnitStatus::TimedOut)).unwrap().status,
        DetectionStatus::TimedOut
    );
    assert_eq!(
        verdict_for(&with(UnitStatus::Errored {
            message: "boom".into()
        }))
        .unwrap()
        .status,
        DetectionStatus::RunError
    );
    assert!(verdict_for(&with(UnitStatus::Skipped {
        reason: "aborted".into()
    }))
    .is_none());
}

#[test]
fn units_without_mutation_produce_no_verdict() {
    assert!(verdict_for(&outcome("plain", UnitStatus::Failed { exit_code: 1 })).is_none());
}

#[test]
fn detection_status_helpers() {
    assert!(DetectionStatus::Killed.is_detected());
    assert!(DetectionStatus::TimedOut.is_detected());
    assert!(!DetectionStatus::Survived.is_detected());

    assert!(DetectionStatus::Survived.is_final());
    assert!(DetectionStatus::NoCoverage.is_final());
    assert!(!DetectionStatus::RunError.is_final());
    assert!(!DetectionStatus::Started.is_final());
}
