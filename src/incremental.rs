// src/incremental.rs

//! Reuse of verdicts from an earlier run.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::dag::{RunnableUnit, UnitId};
use crate::errors::Result;
use crate::history::HistoryStore;
use crate::types::{ClassFingerprint, ClassName, MutationIdentifier, Verdict};

/// A verdict taken over from the previous run instead of re-verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReusedVerdict {
    pub unit: UnitId,
    pub mutation: MutationIdentifier,
    pub verdict: Verdict,
}

/// Units split into those that still need to run and those whose prior
/// verdict stands.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub to_run: Vec<RunnableUnit>,
    pub reused: Vec<ReusedVerdict>,
}

/// Split `units` using the loaded history in `store`.
///
/// A unit is reused only if all of these hold:
/// - it carries a mutation,
/// - no other unit depends on it,
/// - the mutated class was fingerprinted this run and its hierarchical hash
///   equals the one recorded last run,
/// - the recorded verdict has a final status.
///
/// Unit order in `to_run` is preserved.
pub fn partition_reusable(
    units: Vec<RunnableUnit>,
    store: &HistoryStore,
    fingerprints: &[ClassFingerprint],
) -> Partition {
    let current: HashMap<&ClassName, &ClassFingerprint> =
        fingerprints.iter().map(|fp| (fp.name(), fp)).collect();
    let depended_on: HashSet<UnitId> = units
        .iter()
        .filter_map(|u| u.depends_on().cloned())
        .collect();

    let previous_classes = store.historic_class_path();
    let previous_results = store.historic_results();

    let mut partition = Partition::default();
    for unit in units {
        let reusable = unit.mutation().and_then(|mutation| {
            if depended_on.contains(unit.id()) {
                return None;
            }
            let now = current.get(&mutation.class)?;
            let before = previous_classes.get(&mutation.class)?;
            if now.hierarchical_hash != before.hierarchical_hash {
                debug!(unit = %unit.id(), class = %mutation.class, "class changed since last run");
                return None;
            }
            let verdict = previous_results.get(mutation)?;
            verdict.status.is_final().then(|| (mutation.clone(), verdict.clone()))
        });

        match reusable {
            Some((mutation, verdict)) => {
                debug!(unit = %unit.id(), status = ?verdict.status, "reusing verdict");
                partition.reused.push(ReusedVerdict {
                    unit: unit.id().clone(),
                    mutation,
                    verdict,
                });
            }
            None => partition.to_run.push(unit),
        }
    }

    info!(
        reused = partition.reused.len(),
        to_run = partition.to_run.len(),
        "incremental analysis done"
    );
    partition
}

/// Write reused verdicts into this run's history so they survive another
/// incremental run.
pub fn carry_forward(store: &HistoryStore, reused: &[ReusedVerdict]) -> Result<()> {
    for r in reused {
        store.record_result(&r.mutation, &r.verdict)?;
    }
    Ok(())
}
