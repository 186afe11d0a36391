// src/types.rs

//! Stable identities shared by the scheduler and the history store.
//!
//! Everything here is serialized into the history stream, so field and
//! variant names are part of the on-disk format. Short serde names keep each
//! record compact; do not rename them without migrating existing histories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fully qualified name of a class in the program under test.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassName(String);

impl ClassName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Stable identity of one mutated location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MutationIdentifier {
    #[serde(rename = "cls")]
    pub class: ClassName,
    /// Method name plus descriptor, e.g. `bar(I)I`.
    #[serde(rename = "m")]
    pub method: String,
    #[serde(rename = "op")]
    pub mutator: String,
    /// Index of the mutation site within the method.
    #[serde(rename = "i")]
    pub index: u32,
}

impl MutationIdentifier {
    pub fn new(
        class: impl Into<ClassName>,
        method: impl Into<String>,
        mutator: impl Into<String>,
        index: u32,
    ) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            mutator: mutator.into(),
            index,
        }
    }
}

impl fmt::Display for MutationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{} [{}#{}]",
            self.class, self.method, self.mutator, self.index
        )
    }
}

/// Detection status of a mutant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionStatus {
    Killed,
    Survived,
    TimedOut,
    MemoryError,
    NotStarted,
    Started,
    RunError,
    NoCoverage,
    NonViable,
}

impl DetectionStatus {
    /// Whether the mutant counts as detected by the verification suite.
    pub fn is_detected(self) -> bool {
        matches!(
            self,
            DetectionStatus::Killed | DetectionStatus::TimedOut | DetectionStatus::MemoryError
        )
    }

    /// Whether a prior verdict with this status can stand in for a new run.
    ///
    /// `NotStarted`, `Started` and `RunError` describe runs that never
    /// produced an answer, so they are always re-verified.
    pub fn is_final(self) -> bool {
        !matches!(
            self,
            DetectionStatus::NotStarted | DetectionStatus::Started | DetectionStatus::RunError
        )
    }
}

/// Verdict for one mutation: detection status plus the detecting unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStatusTestPair {
    #[serde(rename = "n")]
    pub tests_run: u32,
    pub status: DetectionStatus,
    #[serde(rename = "by", default, skip_serializing_if = "Option::is_none")]
    pub killing_test: Option<String>,
}

/// Short alias used throughout the engine.
pub type Verdict = MutationStatusTestPair;

impl MutationStatusTestPair {
    pub fn new(tests_run: u32, status: DetectionStatus, killing_test: Option<String>) -> Self {
        Self {
            tests_run,
            status,
            killing_test,
        }
    }
}

/// A class name plus the hash of its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassIdentifier {
    pub name: ClassName,
    pub hash: String,
}

/// Class identity whose second hash also covers the class's ancestors, so a
/// change to a base class shows up as a change to every subclass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchicalClassId {
    #[serde(rename = "classId")]
    pub id: ClassIdentifier,
    #[serde(rename = "hierarchicalHash")]
    pub hierarchical_hash: String,
}

/// Short alias used throughout the engine.
pub type ClassFingerprint = HierarchicalClassId;

impl HierarchicalClassId {
    pub fn new(
        name: impl Into<ClassName>,
        hash: impl Into<String>,
        hierarchical_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: ClassIdentifier {
                name: name.into(),
                hash: hash.into(),
            },
            hierarchical_hash: hierarchical_hash.into(),
        }
    }

    pub fn name(&self) -> &ClassName {
        &self.id.name
    }
}
