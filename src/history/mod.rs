// src/history/mod.rs

//! Incremental history: what earlier runs already verified.
//!
//! - [`store`] holds the [`HistoryStore`] that loads a prior run's stream and
//!   appends this run's records.
//! - [`format`] defines the record encoding ([`RecordFormat`]), with JSON
//!   lines as the shipped format.
//! - [`sink`] provides append-mode output sinks.
//! - [`fingerprint`] hashes class content with blake3.

pub mod fingerprint;
pub mod format;
pub mod sink;
pub mod store;

pub use fingerprint::{ClassSource, HashSource, fingerprint_classes};
pub use format::{HistoryRecord, IdResult, JsonRecordFormat, RecordFormat};
pub use sink::{FileSinkFactory, MemorySink, SinkFactory};
pub use store::{HistoryInput, HistoryStore};
