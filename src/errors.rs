// src/errors.rs

//! Crate-wide error type and `Result` alias.
//!
//! Unit-level outcomes (a mutant surviving, a verification command failing)
//! are never errors; they flow through classification. Everything in here is
//! fatal to the run except [`MutarunError::Interrupted`], which the execution
//! scheduler retries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MutarunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A unit depends on an identity that no unit provides, or the
    /// dependencies form a cycle.
    #[error("Broken dependency: unit '{unit}' depends on '{dependency}', which is missing or cyclic")]
    BrokenDependency { unit: String, dependency: String },

    #[error("Duplicate runnable unit id: {0}")]
    DuplicateUnit(String),

    /// The execution backend itself failed (not a unit failing).
    #[error("Execution backend failure: {0}")]
    Backend(String),

    /// A wait on the backend was interrupted; callers may retry.
    #[error("Wait on execution backend was interrupted")]
    Interrupted,

    #[error("History cache I/O failure while {context}: {source}")]
    CacheIo {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted history cache at line {line}: {reason}")]
    CacheCorrupted { line: usize, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MutarunError {
    pub(crate) fn cache_io(context: impl Into<String>, source: std::io::Error) -> Self {
        MutarunError::CacheIo {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn corrupted(line: usize, reason: impl Into<String>) -> Self {
        MutarunError::CacheCorrupted {
            line,
            reason: reason.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, MutarunError>;
