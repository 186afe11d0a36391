// src/config/mod.rs

//! Run plan loading and validation.
//!
//! - `model.rs`: the TOML-backed data model and the validated [`RunPlan`].
//! - `loader.rs`: reading a plan from disk.
//! - `validate.rs`: `RawRunPlan -> RunPlan` with all structural checks.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_path_with};
pub use model::{
    ClassConfig, ConfigSection, MutationConfig, RawRunPlan, RunPlan, RunSettings, UnitConfig,
};
pub use validate::{parse_duration, validate_plan};
