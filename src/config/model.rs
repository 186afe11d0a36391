// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::RunnableUnit;
use crate::history::{ClassSource, HashSource};
use crate::types::{ClassName, MutationIdentifier};

/// Run plan exactly as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// threads = 4
/// unit_timeout = "60s"
///
/// [[class]]
/// name = "com.example.Foo"
/// path = "build/classes/com/example/Foo.class"
///
/// [[unit]]
/// id = "foo-negate-3"
/// cmd = "./verify.sh foo 3"
/// [unit.mutation]
/// class = "com.example.Foo"
/// method = "bar(I)I"
/// mutator = "NEGATE_CONDITIONALS"
/// index = 3
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawRunPlan {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[[class]]` entries, in declaration order.
    #[serde(default, rename = "class")]
    pub classes: Vec<ClassConfig>,

    /// `[[unit]]` entries, in declaration order.
    #[serde(default, rename = "unit")]
    pub units: Vec<UnitConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// How many groups may execute at once.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Timeout for units without their own `timeout`, e.g. `"60s"`.
    #[serde(default)]
    pub unit_timeout: Option<String>,

    /// How long the scheduler waits on the backend between result drains.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// History written by an earlier run. Missing file means no history.
    #[serde(default)]
    pub history_input: Option<PathBuf>,

    /// Where this run writes its history.
    #[serde(default)]
    pub history_output: Option<PathBuf>,
}

fn default_threads() -> usize {
    1
}

fn default_poll_interval() -> String {
    "10ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            unit_timeout: None,
            poll_interval: default_poll_interval(),
            history_input: None,
            history_output: None,
        }
    }
}

/// `[[class]]` entry. Exactly one of `path` and `hash` must be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassConfig {
    pub name: String,

    /// File whose content is hashed.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Precomputed content hash.
    #[serde(default)]
    pub hash: Option<String>,

    #[serde(default)]
    pub parent: Option<String>,
}

/// `[[unit]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitConfig {
    pub id: String,

    /// Shell command; exit status 0 means the mutant survived.
    pub cmd: String,

    /// Unit that must complete before this one, within the same group.
    #[serde(default)]
    pub depends_on: Option<String>,

    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub mutation: Option<MutationConfig>,
}

/// `[unit.mutation]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MutationConfig {
    pub class: String,
    pub method: String,
    pub mutator: String,
    #[serde(default)]
    pub index: u32,
}

impl MutationConfig {
    pub fn to_identifier(&self) -> MutationIdentifier {
        MutationIdentifier::new(
            ClassName::new(self.class.as_str()),
            self.method.as_str(),
            self.mutator.as_str(),
            self.index,
        )
    }
}

/// Settings from `[config]` with durations parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub threads: usize,
    pub unit_timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub history_input: Option<PathBuf>,
    pub history_output: Option<PathBuf>,
}

/// A validated run plan. Only obtainable through
/// `RunPlan::try_from(RawRunPlan)`.
#[derive(Debug, Clone)]
pub struct RunPlan {
    settings: RunSettings,
    classes: Vec<ClassConfig>,
    units: Vec<RunnableUnit>,
}

impl RunPlan {
    pub(crate) fn new_unchecked(
        settings: RunSettings,
        classes: Vec<ClassConfig>,
        units: Vec<RunnableUnit>,
    ) -> Self {
        Self {
            settings,
            classes,
            units,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn units(&self) -> &[RunnableUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<RunnableUnit> {
        self.units
    }

    /// Classes to fingerprint. Validation guarantees each entry has exactly
    /// one hash source.
    pub fn class_sources(&self) -> Vec<ClassSource> {
        self.classes
            .iter()
            .filter_map(|c| {
                let source = match (&c.path, &c.hash) {
                    (Some(path), None) => HashSource::File(path.clone()),
                    (None, Some(hash)) => HashSource::Literal(hash.clone()),
                    _ => return None,
                };
                Some(ClassSource {
                    name: ClassName::new(c.name.as_str()),
                    source,
                    parent: c.parent.as_deref().map(ClassName::from),
                })
            })
            .collect()
    }
}
