//! Running the external binary.
//!
//! A [`CommandRunner`] knows how to run one argument vector in one working
//! directory and hand back what the process printed. Everything else
//! (failure classification, logging, line splitting) lives in [`execute`] so
//! that a stub runner gets identical behavior for free.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{error, info};

use crate::error::{DoltError, DoltResult, ProcessFailure};

/// captured result of one process run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl RawOutput {
    /// a zero exit with the given stdout
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// a nonzero exit with the given stderr
    pub fn failure(stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

/// The one seam between this crate and the external engine.
///
/// Implementations block until the process exits. No timeout is applied.
pub trait CommandRunner: Send + Sync {
    /// run the binary with `args` in `cwd`
    fn run(&self, args: &[String], cwd: &Path) -> io::Result<RawOutput>;

    /// name of the program, for error messages
    fn program(&self) -> String {
        "dolt".to_string()
    }
}

/// Runs the real binary found at `program` (or on `PATH`).
#[derive(Debug, Clone)]
pub struct SystemRunner {
    program: PathBuf,
}

impl SystemRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new("dolt")
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, args: &[String], cwd: &Path) -> io::Result<RawOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(cwd)
            .output()?;

        Ok(RawOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            // killed by a signal
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    fn program(&self) -> String {
        self.program.display().to_string()
    }
}

/// collapse the argument vector into a single-spaced command line for logs
pub fn normalize_args(args: &[String]) -> String {
    args.iter()
        .flat_map(|arg| arg.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `args` through `runner` and return stdout split into lines.
///
/// A nonzero exit becomes [`ProcessFailure`]; nothing is retried.
pub fn execute(runner: &dyn CommandRunner, args: &[String], cwd: &Path) -> DoltResult<Vec<String>> {
    let command = normalize_args(args);
    info!(cwd = %cwd.display(), "dolt {}", command);

    let raw = runner.run(args, cwd).map_err(|source| DoltError::Spawn {
        program: runner.program(),
        source,
    })?;

    if raw.exit_code != 0 {
        error!(exit_code = raw.exit_code, "dolt {} failed: {}", command, raw.stderr.trim());
        return Err(ProcessFailure {
            command,
            args: args.to_vec(),
            stdout: raw.stdout,
            stderr: raw.stderr,
            exit_code: raw.exit_code,
        }
        .into());
    }

    Ok(raw.stdout.lines().map(str::to_string).collect())
}
