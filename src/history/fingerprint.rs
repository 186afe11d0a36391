// src/history/fingerprint.rs

//! Content hashing of classes under test.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use blake3::Hasher;
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::{ClassFingerprint, ClassName};

/// Where a class's content hash comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashSource {
    /// Hash the file at this path.
    File(PathBuf),
    /// Use a precomputed hash as is.
    Literal(String),
}

/// A class to fingerprint, with its optional parent class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSource {
    pub name: ClassName,
    pub source: HashSource,
    pub parent: Option<ClassName>,
}

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> anyhow::Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening class file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading class file {:?}", path))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute aggregate hash from a list of hashes, in order.
pub fn compute_aggregate_hash(hashes: &[&str]) -> String {
    let mut hasher = Hasher::new();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Fingerprint every class in `sources`.
///
/// The hierarchical hash of a class covers its own hash and its parent's
/// hierarchical hash, so it changes whenever any ancestor changes. A parent
/// that is not among `sources` is treated as outside the program under test
/// and contributes nothing. Output order follows `sources`.
pub fn fingerprint_classes(
    fs: &dyn FileSystem,
    sources: &[ClassSource],
) -> Result<Vec<ClassFingerprint>> {
    let mut own: HashMap<&ClassName, String> = HashMap::with_capacity(sources.len());
    for src in sources {
        let hash = match &src.source {
            HashSource::File(path) => compute_file_hash(fs, path)?,
            HashSource::Literal(hash) => hash.clone(),
        };
        own.insert(&src.name, hash);
    }

    let parents: HashMap<&ClassName, &ClassName> = sources
        .iter()
        .filter_map(|s| s.parent.as_ref().map(|p| (&s.name, p)))
        .collect();

    let mut hierarchical: HashMap<&ClassName, String> = HashMap::with_capacity(sources.len());
    let mut out = Vec::with_capacity(sources.len());

    for src in sources {
        let hier = hierarchical_hash(&src.name, &own, &parents, &mut hierarchical, 0)?;
        debug!(class = %src.name, hash = %own[&src.name], hierarchical = %hier, "fingerprinted class");
        out.push(ClassFingerprint::new(
            src.name.clone(),
            own[&src.name].clone(),
            hier,
        ));
    }

    Ok(out)
}

fn hierarchical_hash<'a>(
    name: &'a ClassName,
    own: &HashMap<&'a ClassName, String>,
    parents: &HashMap<&'a ClassName, &'a ClassName>,
    memo: &mut HashMap<&'a ClassName, String>,
    depth: usize,
) -> Result<String> {
    if let Some(done) = memo.get(name) {
        return Ok(done.clone());
    }
    if depth > own.len() {
        return Err(anyhow!("class hierarchy of '{name}' is cyclic").into());
    }

    let self_hash = own
        .get(name)
        .ok_or_else(|| anyhow!("class '{name}' has no content hash"))?;

    let hash = match parents.get(name).copied() {
        Some(parent) if own.contains_key(parent) => {
            let parent_hash = hierarchical_hash(parent, own, parents, memo, depth + 1)?;
            compute_aggregate_hash(&[self_hash.as_str(), parent_hash.as_str()])
        }
        _ => compute_aggregate_hash(&[self_hash.as_str()]),
    };

    memo.insert(name, hash.clone());
    Ok(hash)
}
