// src/config/validate.rs

use std::collections::HashSet;
use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{RawRunPlan, RunPlan, RunSettings, UnitConfig};
use crate::dag::RunnableUnit;
use crate::errors::{MutarunError, Result};

impl TryFrom<RawRunPlan> for RunPlan {
    type Error = MutarunError;

    fn try_from(raw: RawRunPlan) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        let settings = build_settings(&raw)?;
        let units = raw
            .units
            .iter()
            .map(build_unit)
            .collect::<Result<Vec<_>>>()?;
        Ok(RunPlan::new_unchecked(settings, raw.classes, units))
    }
}

/// Check a raw plan without converting it.
pub fn validate_plan(raw: &RawRunPlan) -> Result<()> {
    validate_raw_plan(raw)?;
    build_settings(raw)?;
    Ok(())
}

fn validate_raw_plan(plan: &RawRunPlan) -> Result<()> {
    ensure_has_units(plan)?;
    validate_global_config(plan)?;
    validate_classes(plan)?;
    validate_unit_dependencies(plan)?;
    validate_dependency_graph(plan)?;
    Ok(())
}

fn ensure_has_units(plan: &RawRunPlan) -> Result<()> {
    if plan.units.is_empty() {
        return Err(MutarunError::ConfigError(
            "run plan must contain at least one [[unit]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(plan: &RawRunPlan) -> Result<()> {
    if plan.config.threads == 0 {
        return Err(MutarunError::ConfigError(
            "[config].threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_classes(plan: &RawRunPlan) -> Result<()> {
    let mut names = HashSet::new();
    for class in &plan.classes {
        if !names.insert(class.name.as_str()) {
            return Err(MutarunError::ConfigError(format!(
                "class '{}' is declared more than once",
                class.name
            )));
        }
        match (&class.path, &class.hash) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(MutarunError::ConfigError(format!(
                    "class '{}' must set exactly one of `path` or `hash`",
                    class.name
                )));
            }
        }
    }

    for class in &plan.classes {
        let Some(parent) = &class.parent else {
            continue;
        };
        if parent == &class.name || !names.contains(parent.as_str()) {
            return Err(MutarunError::ConfigError(format!(
                "class '{}' has unknown or self-referencing parent '{}'",
                class.name, parent
            )));
        }
    }
    Ok(())
}

fn validate_unit_dependencies(plan: &RawRunPlan) -> Result<()> {
    let mut ids = HashSet::new();
    for unit in &plan.units {
        if !ids.insert(unit.id.as_str()) {
            return Err(MutarunError::ConfigError(format!(
                "unit '{}' is declared more than once",
                unit.id
            )));
        }
    }

    for unit in &plan.units {
        let Some(dep) = &unit.depends_on else {
            continue;
        };
        if dep == &unit.id {
            return Err(MutarunError::ConfigError(format!(
                "unit '{}' cannot depend on itself in `depends_on`",
                unit.id
            )));
        }
        if !ids.contains(dep.as_str()) {
            return Err(MutarunError::ConfigError(format!(
                "unit '{}' has unknown dependency '{}' in `depends_on`",
                unit.id, dep
            )));
        }
    }
    Ok(())
}

fn validate_dependency_graph(plan: &RawRunPlan) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for unit in &plan.units {
        graph.add_node(unit.id.as_str());
    }
    for unit in &plan.units {
        if let Some(dep) = &unit.depends_on {
            graph.add_edge(dep.as_str(), unit.id.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(MutarunError::ConfigError(format!(
            "dependency cycle detected involving unit '{}'",
            cycle.node_id()
        ))),
    }
}

fn build_settings(plan: &RawRunPlan) -> Result<RunSettings> {
    let cfg = &plan.config;
    let unit_timeout = cfg
        .unit_timeout
        .as_deref()
        .map(|s| duration_field("[config].unit_timeout", s))
        .transpose()?;
    let poll_interval = duration_field("[config].poll_interval", &cfg.poll_interval)?;
    if poll_interval.is_zero() {
        return Err(MutarunError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }

    Ok(RunSettings {
        threads: cfg.threads,
        unit_timeout,
        poll_interval,
        history_input: cfg.history_input.clone(),
        history_output: cfg.history_output.clone(),
    })
}

fn build_unit(cfg: &UnitConfig) -> Result<RunnableUnit> {
    let mut unit = RunnableUnit::new(cfg.id.as_str(), cfg.cmd.as_str());
    if let Some(dep) = &cfg.depends_on {
        unit = unit.depending_on(dep.as_str());
    }
    if let Some(timeout) = &cfg.timeout {
        let field = format!("unit '{}' timeout", cfg.id);
        unit = unit.with_timeout(duration_field(&field, timeout)?);
    }
    if let Some(mutation) = &cfg.mutation {
        unit = unit.with_mutation(mutation.to_identifier());
    }
    Ok(unit)
}

fn duration_field(field: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| MutarunError::ConfigError(format!("{field}: invalid duration '{value}': {e}")))
}

/// Parse `"<n><unit>"` with unit one of `ms`, `s`, `m`, `h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;
    if idx == 0 {
        return Err("duration must start with a number".to_string());
    }

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        "h" => Ok(Duration::from_secs(value.saturating_mul(60 * 60))),
        other => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            other
        )),
    }
}
