// src/history/format.rs

//! Line encodings for history records.

use serde::{Deserialize, Serialize};

use crate::errors::{MutarunError, Result};
use crate::types::{ClassFingerprint, MutationIdentifier, Verdict};

/// A verdict together with the mutation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdResult {
    pub id: MutationIdentifier,
    #[serde(rename = "statusTestPair")]
    pub status: Verdict,
}

/// One line of the history stream.
///
/// The variant name is the record's type tag, so every line states what it
/// holds, e.g. `{"fullClassId":{...}}` or `{"result":{...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryRecord {
    #[serde(rename = "fullClassId")]
    ClassPath(ClassFingerprint),
    #[serde(rename = "result")]
    Result(IdResult),
}

/// Encoding of a single [`HistoryRecord`] to and from one line of text.
///
/// `encode` must never return a string containing a newline; the store strips
/// them anyway so the one-record-per-line layout holds for any format.
pub trait RecordFormat: Send + Sync + std::fmt::Debug {
    fn encode(&self, record: &HistoryRecord) -> Result<String>;

    /// Decode one line. `line_no` is 1-based and only used in errors.
    fn decode(&self, line: &str, line_no: usize) -> Result<HistoryRecord>;
}

/// Compact JSON, one object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordFormat;

impl JsonRecordFormat {
    pub fn new() -> Self {
        Self
    }
}

impl RecordFormat for JsonRecordFormat {
    fn encode(&self, record: &HistoryRecord) -> Result<String> {
        serde_json::to_string(record)
            .map_err(|e| MutarunError::Other(anyhow::anyhow!("encoding history record: {e}")))
    }

    fn decode(&self, line: &str, line_no: usize) -> Result<HistoryRecord> {
        serde_json::from_str(line).map_err(|e| MutarunError::corrupted(line_no, e.to_string()))
    }
}

/// Remove embedded line breaks from an encoded record.
pub(crate) fn single_line(encoded: String) -> String {
    if encoded.contains(['\n', '\r']) {
        encoded.replace(['\n', '\r'], "")
    } else {
        encoded
    }
}
