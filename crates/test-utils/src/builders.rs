#![allow(dead_code)]

use std::path::PathBuf;

use mutarun::config::{
    ClassConfig, ConfigSection, MutationConfig, RawRunPlan, RunPlan, UnitConfig,
};
use mutarun::dag::RunnableUnit;
use mutarun::types::{ClassFingerprint, DetectionStatus, MutationIdentifier, Verdict};

/// Unit `id` with a trivial command and no dependency.
pub fn unit(id: &str) -> RunnableUnit {
    RunnableUnit::new(id, format!("verify {id}"))
}

/// Unit `id` that depends on `dep`.
pub fn unit_after(id: &str, dep: &str) -> RunnableUnit {
    unit(id).depending_on(dep)
}

/// Mutation in `class` at site `index` of method `m()V`.
pub fn mutation(class: &str, index: u32) -> MutationIdentifier {
    MutationIdentifier::new(class, "m()V", "NEGATE_CONDITIONALS", index)
}

pub fn verdict(status: DetectionStatus) -> Verdict {
    Verdict::new(1, status, None)
}

/// Fingerprint whose hierarchical hash is derived from `hash` alone.
pub fn fingerprint(class: &str, hash: &str) -> ClassFingerprint {
    ClassFingerprint::new(class, hash, format!("h-{hash}"))
}

/// Builder for `RunPlan` to simplify test setup.
pub struct RunPlanBuilder {
    plan: RawRunPlan,
}

impl RunPlanBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawRunPlan {
                config: ConfigSection::default(),
                classes: Vec::new(),
                units: Vec::new(),
            },
        }
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.plan.config.threads = threads;
        self
    }

    pub fn history(mut self, input: Option<PathBuf>, output: Option<PathBuf>) -> Self {
        self.plan.config.history_input = input;
        self.plan.config.history_output = output;
        self
    }

    /// Class with a literal content hash.
    pub fn class(mut self, name: &str, hash: &str, parent: Option<&str>) -> Self {
        self.plan.classes.push(ClassConfig {
            name: name.to_string(),
            path: None,
            hash: Some(hash.to_string()),
            parent: parent.map(str::to_string),
        });
        self
    }

    pub fn unit(mut self, unit: UnitConfigBuilder) -> Self {
        self.plan.units.push(unit.build());
        self
    }

    pub fn raw(self) -> RawRunPlan {
        self.plan
    }

    pub fn build(self) -> RunPlan {
        RunPlan::try_from(self.plan).expect("Failed to build valid run plan from builder")
    }
}

impl Default for RunPlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `UnitConfig`.
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new(id: &str, cmd: &str) -> Self {
        Self {
            unit: UnitConfig {
                id: id.to_string(),
                cmd: cmd.to_string(),
                depends_on: None,
                timeout: None,
                mutation: None,
            },
        }
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.unit.depends_on = Some(dep.to_string());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.unit.timeout = Some(timeout.to_string());
        self
    }

    pub fn mutation(mut self, class: &str, index: u32) -> Self {
        self.unit.mutation = Some(MutationConfig {
            class: class.to_string(),
            method: "m()V".to_string(),
            mutator: "NEGATE_CONDITIONALS".to_string(),
            index,
        });
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}
