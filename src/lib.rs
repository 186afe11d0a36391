// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod history;
pub mod incremental;
pub mod logging;
pub mod types;

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::RunPlan;
use crate::dag::{Group, group_units};
use crate::engine::{
    Dispatcher, ExecutionScheduler, HistoryListener, LoggingListener, RunSummary, RunTally,
    SchedulerOptions, SummaryListener,
};
use crate::errors::{MutarunError, Result};
use crate::exec::{
    DEFAULT_RESULTS_CAPACITY, DEFAULT_UNIT_TIMEOUT, ProcessBackend, ShellUnitRunner, UnitRunner,
    results_channel,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::history::{
    FileSinkFactory, HistoryInput, HistoryStore, JsonRecordFormat, MemorySink, SinkFactory,
    fingerprint_classes,
};
use crate::incremental::{carry_forward, partition_reusable};

/// Options layered over the plan's `[config]` section.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub history_input: Option<PathBuf>,
    pub history_output: Option<PathBuf>,
    pub threads: Option<usize>,
    pub no_incremental: bool,
}

impl From<&CliArgs> for RunOptions {
    fn from(args: &CliArgs) -> Self {
        Self {
            history_input: args.history_input.clone(),
            history_output: args.history_output.clone(),
            threads: args.threads,
            no_incremental: args.no_incremental,
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub summary: RunSummary,
    pub tally: RunTally,
    /// Units skipped because their earlier verdict was reused.
    pub reused: usize,
}

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let plan = load_and_validate(&args.plan)
        .with_context(|| format!("loading run plan {:?}", args.plan))?;

    if args.dry_run {
        let groups = group_units(plan.units().to_vec())?;
        print_dry_run(&plan, &groups);
        return Ok(());
    }

    let report = execute_plan(plan, &RunOptions::from(&args)).await?;
    print_report(&report);
    Ok(())
}

/// Execute a validated plan with the shell unit runner.
pub async fn execute_plan(plan: RunPlan, options: &RunOptions) -> Result<RunReport> {
    let timeout = plan
        .settings()
        .unit_timeout
        .unwrap_or(DEFAULT_UNIT_TIMEOUT);
    execute_plan_with(plan, options, ShellUnitRunner::new(timeout), &RealFileSystem).await
}

/// Execute a validated plan, running units with `runner` and reading class
/// files through `fs`.
///
/// Steps: load history, fingerprint classes, set aside reusable units, group
/// the rest, run the groups on a [`ProcessBackend`] and record every verdict.
pub async fn execute_plan_with<R: UnitRunner>(
    plan: RunPlan,
    options: &RunOptions,
    runner: R,
    fs: &dyn FileSystem,
) -> Result<RunReport> {
    let settings = plan.settings().clone();
    let threads = options.threads.unwrap_or(settings.threads);
    if threads == 0 {
        return Err(MutarunError::ConfigError(
            "--threads must be >= 1 (got 0)".to_string(),
        ));
    }

    let input_path = options
        .history_input
        .clone()
        .or(settings.history_input.clone());
    let output_path = options
        .history_output
        .clone()
        .or(settings.history_output.clone());

    // Read the input fully before the output is truncated; they may be the
    // same file.
    let input = read_history_input(input_path.as_deref())?;
    let output: Arc<dyn SinkFactory> = match output_path {
        Some(path) => Arc::new(
            FileSinkFactory::create(&path)
                .map_err(|e| MutarunError::cache_io(format!("creating {:?}", path), e))?,
        ),
        None => {
            debug!("no history output configured; history kept in memory");
            Arc::new(MemorySink::new())
        }
    };

    let mut store = HistoryStore::new(Arc::new(JsonRecordFormat::new()), output, input);
    store.initialize()?;

    let fingerprints = fingerprint_classes(fs, &plan.class_sources())?;
    store.record_class_path(&fingerprints)?;

    let units = plan.into_units();
    let (to_run, reused) = if options.no_incremental {
        info!("incremental analysis disabled");
        (units, Vec::new())
    } else {
        let partition = partition_reusable(units, &store, &fingerprints);
        (partition.to_run, partition.reused)
    };
    carry_forward(&store, &reused)?;

    let groups = group_units(to_run)?;
    let store = Arc::new(store);

    let summary_listener = SummaryListener::new();
    let mut dispatcher = Dispatcher::new();
    dispatcher.add_listener(LoggingListener);
    dispatcher.add_listener(summary_listener.clone());
    dispatcher.add_listener(HistoryListener::new(Arc::clone(&store)));

    let (results_tx, mut results_rx) = results_channel(DEFAULT_RESULTS_CAPACITY);
    let backend = Arc::new(ProcessBackend::new(runner, threads, results_tx));

    let mut scheduler = ExecutionScheduler::new(
        dispatcher,
        SchedulerOptions {
            poll_interval: settings.poll_interval,
            ..SchedulerOptions::default()
        },
    );
    let summary = scheduler.run(groups, backend, &mut results_rx).await?;

    Ok(RunReport {
        summary,
        tally: summary_listener.tally(),
        reused: reused.len(),
    })
}

/// Load a history file into memory. A missing file is an empty history.
fn read_history_input(path: Option<&Path>) -> Result<Option<HistoryInput>> {
    let Some(path) = path else {
        return Ok(None);
    };
    if !path.exists() {
        info!(path = ?path, "history input not found; starting without history");
        return Ok(None);
    }
    let bytes = std::fs::read(path)
        .map_err(|e| MutarunError::cache_io(format!("reading {:?}", path), e))?;
    Ok(Some(Box::new(Cursor::new(bytes))))
}

fn print_report(report: &RunReport) {
    let t = &report.tally;
    println!(
        "mutarun: {} units run in {} groups ({} passed, {} failed, {} errored, {} skipped), {} reused",
        t.total(),
        report.summary.groups_submitted,
        t.passed,
        t.failed,
        t.errored,
        t.skipped,
        report.reused
    );
}

/// Print settings and execution groups without running anything.
fn print_dry_run(plan: &RunPlan, groups: &[Group]) {
    let settings = plan.settings();
    println!("mutarun dry-run");
    println!("  config.threads = {}", settings.threads);
    if let Some(timeout) = settings.unit_timeout {
        println!("  config.unit_timeout = {timeout:?}");
    }
    if let Some(ref input) = settings.history_input {
        println!("  config.history_input = {}", input.display());
    }
    if let Some(ref output) = settings.history_output {
        println!("  config.history_output = {}", output.display());
    }
    println!();

    println!("groups ({}):", groups.len());
    for (i, group) in groups.iter().enumerate() {
        println!("  [{i}]");
        for unit in group.units() {
            println!("    - {}", unit.id());
            println!("        cmd: {}", unit.cmd());
            if let Some(dep) = unit.depends_on() {
                println!("        depends_on: {dep}");
            }
            if let Some(mutation) = unit.mutation() {
                println!("        mutation: {mutation}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
