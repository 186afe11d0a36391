// src/history/sink.rs

//! Output sinks for the history stream.
//!
//! The store opens a fresh handle for every write, so a [`SinkFactory`] must
//! give append semantics across repeated opens: nothing flushed through an
//! earlier handle may be lost or overwritten by a later one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

/// Produces writable handles onto one append-only sink.
pub trait SinkFactory: Send + Sync + std::fmt::Debug {
    fn open(&self) -> io::Result<Box<dyn Write + Send>>;
}

/// Appends to a file on disk.
#[derive(Debug, Clone)]
pub struct FileSinkFactory {
    path: PathBuf,
}

impl FileSinkFactory {
    /// Start a fresh history file at `path`.
    ///
    /// Parent directories are created and any existing file is truncated once,
    /// here; every later [`open`](SinkFactory::open) appends.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        File::create(&path)?;
        debug!(path = ?path, "history output truncated");
        Ok(Self { path })
    }

    /// Append to `path` without truncating it first.
    pub fn append_to(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SinkFactory for FileSinkFactory {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        Ok(Box::new(file))
    }
}

/// In-memory append-only sink.
///
/// Clones share the same buffer, so a test can keep one clone and hand the
/// other to a store.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buf
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Everything written so far, as text.
    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl SinkFactory for MemorySink {
    fn open(&self) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(MemoryHandle {
            buf: Arc::clone(&self.buf),
        }))
    }
}

struct MemoryHandle {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Write for MemoryHandle {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .buf
            .lock()
            .map_err(|_| io::Error::other("memory sink lock poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
