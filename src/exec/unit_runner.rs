// src/exec/unit_runner.rs

//! Execution of a single runnable unit.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::dag::RunnableUnit;
use crate::engine::UnitStatus;

/// Runs one unit to completion and reports how it ended.
///
/// Implementations must not fail: anything that prevents the unit from
/// running is reported as [`UnitStatus::Errored`].
pub trait UnitRunner: Send + Sync + 'static {
    fn run<'a>(
        &'a self,
        unit: &'a RunnableUnit,
    ) -> Pin<Box<dyn Future<Output = UnitStatus> + Send + 'a>>;
}

/// Timeout applied when neither the unit nor the plan sets one.
pub const DEFAULT_UNIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Runs a unit's `cmd` through the platform shell.
///
/// The unit identity and mutation coordinates are exported as environment
/// variables so the command can select the mutant it verifies:
/// `MUTARUN_UNIT_ID`, `MUTARUN_MUTATION_CLASS`, `MUTARUN_MUTATION_METHOD`,
/// `MUTARUN_MUTATION_MUTATOR`, `MUTARUN_MUTATION_INDEX`.
#[derive(Debug, Clone)]
pub struct ShellUnitRunner {
    default_timeout: Duration,
}

impl ShellUnitRunner {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }
}

impl UnitRunner for ShellUnitRunner {
    fn run<'a>(
        &'a self,
        unit: &'a RunnableUnit,
    ) -> Pin<Box<dyn Future<Output = UnitStatus> + Send + 'a>> {
        Box::pin(async move {
            let timeout = unit.timeout().unwrap_or(self.default_timeout);
            match run_unit_inner(unit, timeout).await {
                Ok(status) => status,
                Err(err) => {
                    error!(unit = %unit.id(), error = %err, "unit execution error");
                    UnitStatus::Errored {
                        message: format!("{err:#}"),
                    }
                }
            }
        })
    }
}

async fn run_unit_inner(unit: &RunnableUnit, timeout: Duration) -> Result<UnitStatus> {
    info!(unit = %unit.id(), cmd = %unit.cmd(), "starting unit process");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(unit.cmd());
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(unit.cmd());
        c
    };

    cmd.env("MUTARUN_UNIT_ID", unit.id().as_str());
    if let Some(m) = unit.mutation() {
        cmd.env("MUTARUN_MUTATION_CLASS", m.class.as_str())
            .env("MUTARUN_MUTATION_METHOD", &m.method)
            .env("MUTARUN_MUTATION_MUTATOR", &m.mutator)
            .env("MUTARUN_MUTATION_INDEX", m.index.to_string());
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for unit '{}'", unit.id()))?;

    // Always consume output so pipe buffers don't fill; log at debug.
    if let Some(stdout) = child.stdout.take() {
        forward_lines(unit, "stdout", stdout);
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(unit, "stderr", stderr);
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of unit '{}'", unit.id()))?;
            let code = status.code().unwrap_or(-1);

            info!(
                unit = %unit.id(),
                exit_code = code,
                success = status.success(),
                "unit process exited"
            );

            if status.success() {
                Ok(UnitStatus::Passed)
            } else {
                Ok(UnitStatus::Failed { exit_code: code })
            }
        }

        _ = tokio::time::sleep(timeout) => {
            warn!(unit = %unit.id(), ?timeout, "unit timed out; killing process");
            if let Err(e) = child.kill().await {
                warn!(unit = %unit.id(), error = %e, "failed to kill timed out process");
            }
            Ok(UnitStatus::TimedOut)
        }
    }
}

fn forward_lines<S>(unit: &RunnableUnit, stream: &'static str, pipe: S)
where
    S: AsyncRead + Unpin + Send + 'static,
{
    let unit_id = unit.id().clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(unit = %unit_id, stream, "{}", line);
        }
    });
}
