// src/dag/grouping.rs

//! Partition runnable units into dependency groups.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::dag::unit::{Group, RunnableUnit, UnitId};
use crate::errors::{MutarunError, Result};

/// Partition `units` into ordered groups.
///
/// Units are visited in input order, one pass at a time:
/// - a unit without a dependency starts a new group;
/// - a unit whose dependency is already placed is appended to that unit's
///   group, so it always runs after the unit it depends on;
/// - anything else is deferred to the next pass.
///
/// A pass that places nothing means some dependency is missing or cyclic, and
/// grouping fails with [`MutarunError::BrokenDependency`] instead of looping.
///
/// Groups are returned in creation order; each unit appears in exactly one.
pub fn group_units(units: Vec<RunnableUnit>) -> Result<Vec<Group>> {
    ensure_unique_ids(&units)?;

    let mut groups: Vec<Group> = Vec::new();
    // Unit id -> index of the group holding it.
    let mut placed: HashMap<UnitId, usize> = HashMap::new();
    let mut remaining = units;
    let mut pass = 0usize;

    while !remaining.is_empty() {
        pass += 1;
        let before = remaining.len();
        let mut deferred = Vec::new();

        for unit in remaining {
            // None: no dependency. Some(None): dependency not placed yet.
            let target = unit.depends_on().map(|dep| placed.get(dep).copied());

            let id = unit.id().clone();
            let idx = match target {
                None => {
                    groups.push(Group::starting_with(unit));
                    groups.len() - 1
                }
                Some(Some(idx)) => {
                    groups[idx].push(unit);
                    idx
                }
                Some(None) => {
                    deferred.push(unit);
                    continue;
                }
            };
            placed.insert(id, idx);
        }

        debug!(
            pass,
            placed = before - deferred.len(),
            deferred = deferred.len(),
            "grouping pass finished"
        );

        if deferred.len() == before {
            // No progress: the first stuck unit names the broken link.
            let stuck = &deferred[0];
            let dependency = stuck
                .depends_on()
                .map(|d| d.to_string())
                .unwrap_or_default();
            return Err(MutarunError::BrokenDependency {
                unit: stuck.id().to_string(),
                dependency,
            });
        }

        remaining = deferred;
    }

    info!(groups = groups.len(), "units will run as dependency groups");
    Ok(groups)
}

fn ensure_unique_ids(units: &[RunnableUnit]) -> Result<()> {
    let mut seen: HashSet<&UnitId> = HashSet::with_capacity(units.len());
    for unit in units {
        if !seen.insert(unit.id()) {
            return Err(MutarunError::DuplicateUnit(unit.id().to_string()));
        }
    }
    Ok(())
}
