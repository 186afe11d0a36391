// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `mutarun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mutarun",
    version,
    about = "Run mutant verification units in dependency groups, reusing verdicts from earlier runs.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the run plan (TOML).
    ///
    /// Default: `Mutarun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Mutarun.toml")]
    pub plan: PathBuf,

    /// Read prior history from this file instead of `[config].history_input`.
    #[arg(long, value_name = "PATH")]
    pub history_input: Option<PathBuf>,

    /// Write history to this file instead of `[config].history_output`.
    #[arg(long, value_name = "PATH")]
    pub history_output: Option<PathBuf>,

    /// Number of groups executed concurrently (overrides `[config].threads`).
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Re-verify every unit even if the history holds a reusable verdict.
    #[arg(long)]
    pub no_incremental: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MUTARUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the execution groups, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
