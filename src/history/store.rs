// src/history/store.rs

//! Incremental history store.
//!
//! Stream layout, one record per line:
//!
//! ```text
//! <n>                      count of class path records that follow
//! <fullClassId record>     x n
//! <result record>          x any, later lines win for the same mutation
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{MutarunError, Result};
use crate::history::format::{HistoryRecord, IdResult, RecordFormat, single_line};
use crate::history::sink::SinkFactory;
use crate::types::{ClassFingerprint, ClassName, MutationIdentifier, Verdict};

/// A prior run's history stream.
pub type HistoryInput = Box<dyn BufRead + Send + Sync>;

/// Cache of class fingerprints and verdicts from earlier runs, plus the
/// writer for this run's history.
///
/// The maps are filled only by [`initialize`](Self::initialize), which needs
/// `&mut self`; recording takes `&self` so the store can be shared behind an
/// `Arc` once loaded. Each record call performs a single `write_all` of its
/// whole payload on a freshly opened handle; with an append-mode sink,
/// concurrent callers never interleave inside a line.
pub struct HistoryStore {
    format: Arc<dyn RecordFormat>,
    output: Arc<dyn SinkFactory>,
    input: Option<HistoryInput>,
    previous_results: HashMap<MutationIdentifier, Verdict>,
    previous_class_path: HashMap<ClassName, ClassFingerprint>,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("format", &self.format)
            .field("output", &self.output)
            .field("has_input", &self.input.is_some())
            .field("previous_results", &self.previous_results.len())
            .field("previous_class_path", &self.previous_class_path.len())
            .finish()
    }
}

impl HistoryStore {
    /// `input` is the previous run's stream; `None` means start empty.
    pub fn new(
        format: Arc<dyn RecordFormat>,
        output: Arc<dyn SinkFactory>,
        input: Option<HistoryInput>,
    ) -> Self {
        Self {
            format,
            output,
            input,
            previous_results: HashMap::new(),
            previous_class_path: HashMap::new(),
        }
    }

    /// Append a count line followed by one line per fingerprint.
    pub fn record_class_path(&self, fingerprints: &[ClassFingerprint]) -> Result<()> {
        let mut payload = format!("{}\n", fingerprints.len());
        for fp in fingerprints {
            payload.push_str(&self.encode_line(&HistoryRecord::ClassPath(fp.clone()))?);
        }
        self.write(&payload, "recording class path")?;
        debug!(classes = fingerprints.len(), "class path recorded");
        Ok(())
    }

    /// Append the verdict for one mutation.
    pub fn record_result(&self, id: &MutationIdentifier, verdict: &Verdict) -> Result<()> {
        let record = HistoryRecord::Result(IdResult {
            id: id.clone(),
            status: verdict.clone(),
        });
        let line = self.encode_line(&record)?;
        self.write(&line, "recording result")
    }

    /// Load the input stream, if one was supplied. Reads it once, then drops
    /// (closes) it; later calls are no-ops.
    pub fn initialize(&mut self) -> Result<()> {
        let Some(input) = self.input.take() else {
            debug!("no history input; starting with an empty cache");
            return Ok(());
        };

        let mut lines = input.lines();
        let mut line_no = 0usize;

        self.restore_class_path(&mut lines, &mut line_no)?;
        self.restore_results(&mut lines, &mut line_no)?;

        info!(
            classes = self.previous_class_path.len(),
            results = self.previous_results.len(),
            "history loaded"
        );
        Ok(())
    }

    /// Verdicts from the previous run, keyed by mutation.
    pub fn historic_results(&self) -> &HashMap<MutationIdentifier, Verdict> {
        &self.previous_results
    }

    /// Class fingerprints from the previous run, keyed by class name.
    pub fn historic_class_path(&self) -> &HashMap<ClassName, ClassFingerprint> {
        &self.previous_class_path
    }

    fn restore_class_path<L>(&mut self, lines: &mut L, line_no: &mut usize) -> Result<()>
    where
        L: Iterator<Item = std::io::Result<String>>,
    {
        let Some(first) = next_line(lines, line_no)? else {
            // An empty stream is a history with nothing in it.
            return Ok(());
        };

        let count: u64 = first.trim().parse().map_err(|_| {
            MutarunError::corrupted(
                *line_no,
                format!("expected class path count, found '{}'", first.trim()),
            )
        })?;

        for read in 0..count {
            let line = next_line(lines, line_no)?.ok_or_else(|| {
                MutarunError::corrupted(
                    *line_no + 1,
                    format!("history ended after {read} of {count} class path records"),
                )
            })?;
            match self.format.decode(&line, *line_no)? {
                HistoryRecord::ClassPath(fp) => {
                    self.previous_class_path.insert(fp.name().clone(), fp);
                }
                HistoryRecord::Result(_) => {
                    return Err(MutarunError::corrupted(
                        *line_no,
                        "expected a class path record, found a result",
                    ));
                }
            }
        }
        Ok(())
    }

    fn restore_results<L>(&mut self, lines: &mut L, line_no: &mut usize) -> Result<()>
    where
        L: Iterator<Item = std::io::Result<String>>,
    {
        while let Some(line) = next_line(lines, line_no)? {
            if line.trim().is_empty() {
                continue;
            }
            match self.format.decode(&line, *line_no)? {
                HistoryRecord::Result(IdResult { id, status }) => {
                    self.previous_results.insert(id, status);
                }
                HistoryRecord::ClassPath(_) => {
                    return Err(MutarunError::corrupted(
                        *line_no,
                        "expected a result record, found a class path record",
                    ));
                }
            }
        }
        Ok(())
    }

    fn encode_line(&self, record: &HistoryRecord) -> Result<String> {
        let mut line = single_line(self.format.encode(record)?);
        line.push('\n');
        Ok(line)
    }

    fn write(&self, payload: &str, context: &str) -> Result<()> {
        let mut out = self
            .output
            .open()
            .map_err(|e| MutarunError::cache_io(format!("{context} (opening output)"), e))?;
        out.write_all(payload.as_bytes())
            .map_err(|e| MutarunError::cache_io(context, e))?;
        out.flush()
            .map_err(|e| MutarunError::cache_io(format!("{context} (flushing output)"), e))
    }
}

fn next_line<L>(lines: &mut L, line_no: &mut usize) -> Result<Option<String>>
where
    L: Iterator<Item = std::io::Result<String>>,
{
    match lines.next() {
        None => Ok(None),
        Some(Ok(line)) => {
            *line_no += 1;
            Ok(Some(line))
        }
        Some(Err(e)) => Err(MutarunError::cache_io(
            format!("reading history line {}", *line_no + 1),
            e,
        )),
    }
}
