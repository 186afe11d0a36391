// src/dag/unit.rs

//! Runnable units and the groups they are submitted in.

use std::fmt;
use std::time::Duration;

use crate::types::MutationIdentifier;

/// Identity of a runnable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for UnitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One independently executable verification task.
///
/// Immutable once built; executing it yields exactly one
/// [`RawOutcome`](crate::engine::RawOutcome).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnableUnit {
    id: UnitId,
    depends_on: Option<UnitId>,
    cmd: String,
    mutation: Option<MutationIdentifier>,
    timeout: Option<Duration>,
}

impl RunnableUnit {
    pub fn new(id: impl Into<UnitId>, cmd: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            depends_on: None,
            cmd: cmd.into(),
            mutation: None,
            timeout: None,
        }
    }

    pub fn depending_on(mut self, dep: impl Into<UnitId>) -> Self {
        self.depends_on = Some(dep.into());
        self
    }

    pub fn with_mutation(mut self, mutation: MutationIdentifier) -> Self {
        self.mutation = Some(mutation);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn depends_on(&self) -> Option<&UnitId> {
        self.depends_on.as_ref()
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn mutation(&self) -> Option<&MutationIdentifier> {
        self.mutation.as_ref()
    }

    /// Per-unit timeout, if the plan set one.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Ordered batch of units submitted to the backend together.
///
/// Never empty: a group always starts from a unit without a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    units: Vec<RunnableUnit>,
}

impl Group {
    pub(crate) fn starting_with(unit: RunnableUnit) -> Self {
        Self { units: vec![unit] }
    }

    pub(crate) fn push(&mut self, unit: RunnableUnit) {
        self.units.push(unit);
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.units.iter().any(|u| u.id() == id)
    }

    pub fn units(&self) -> &[RunnableUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<RunnableUnit> {
        self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &UnitId> {
        self.units.iter().map(|u| u.id())
    }
}
