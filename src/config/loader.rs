// src/config/loader.rs

use std::path::Path;

use crate::config::model::{RawRunPlan, RunPlan};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Read and deserialize a run plan without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRunPlan> {
    load_from_path_with(&RealFileSystem, path)
}

/// Like [`load_from_path`], reading through the given filesystem.
pub fn load_from_path_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawRunPlan> {
    let contents = fs.read_to_string(path.as_ref())?;
    let plan: RawRunPlan = toml::from_str(&contents)?;
    Ok(plan)
}

/// Load a run plan and validate it: unit ids, dependencies, cycles, classes
/// and durations.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<RunPlan> {
    let raw = load_from_path(&path)?;
    RunPlan::try_from(raw)
}
