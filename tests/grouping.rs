// tests/grouping.rs

use mutarun::dag::{RunnableUnit, UnitId, group_units};
use mutarun::errors::MutarunError;
use mutarun_test_utils::builders::{unit, unit_after};
use mutarun_test_utils::init_tracing;

fn ids(units: &[RunnableUnit]) -> Vec<&str> {
    units.iter().map(|u| u.id().as_str()).collect()
}

#[test]
fn chain_joins_first_group_and_independent_unit_gets_its_own() {
    init_tracing();

    let groups = group_units(vec![
        unit("A"),
        unit_after("B", "A"),
        unit_after("C", "B"),
        unit("D"),
    ])
    .unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(ids(groups[0].units()), vec!["A", "B", "C"]);
    assert_eq!(ids(groups[1].units()), vec!["D"]);
}

#[test]
fn dependent_listed_before_its_dependency_is_placed_on_a_later_pass() {
    let groups = group_units(vec![unit_after("B", "A"), unit("A"), unit("X")]).unwrap();

    assert_eq!(groups.len(), 2);
    assert_eq!(ids(groups[0].units()), vec!["A", "B"]);
    assert_eq!(ids(groups[1].units()), vec!["X"]);
}

#[test]
fn two_dependents_of_one_unit_share_its_group() {
    let groups = group_units(vec![
        unit("A"),
        unit_after("B", "A"),
        unit_after("C", "A"),
    ])
    .unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(ids(groups[0].units()), vec!["A", "B", "C"]);
}

#[test]
fn missing_dependency_fails_instead_of_looping() {
    let err = group_units(vec![
        unit("A"),
        unit_after("B", "A"),
        unit_after("C", "Z"),
    ])
    .unwrap_err();

    match err {
        MutarunError::BrokenDependency { unit, dependency } => {
            assert_eq!(unit, "C");
            assert_eq!(dependency, "Z");
        }
        other => panic!("expected BrokenDependency, got {other:?}"),
    }
}

#[test]
fn cyclic_dependencies_fail_with_broken_dependency() {
    let err = group_units(vec![
        unit_after("A", "B"),
        unit_after("B", "A"),
        unit("C"),
    ])
    .unwrap_err();

    assert!(
        matches!(err, MutarunError::BrokenDependency { ref unit, .. } if unit == "A"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn duplicate_ids_are_rejected_before_grouping() {
    let err = group_units(vec![unit("A"), unit("A")]).unwrap_err();
    assert!(matches!(err, MutarunError::DuplicateUnit(ref id) if id == "A"));
}

#[test]
fn empty_input_yields_no_groups() {
    let groups = group_units(Vec::new()).unwrap();
    assert!(groups.is_empty());
}

#[test]
fn group_lookup_helpers_report_membership() {
    let groups = group_units(vec![unit("A"), unit_after("B", "A")]).unwrap();
    let group = &groups[0];

    assert_eq!(group.len(), 2);
    assert!(!group.is_empty());
    assert!(group.contains(&UnitId::from("B")));
    assert!(!group.contains(&UnitId::from("Z")));
    assert_eq!(
        group.ids().map(|id| id.as_str()).collect::<Vec<_>>(),
        vec!["A", "B"]
    );
}
