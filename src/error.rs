//! Crate-wide error types
//!
//! Every failure surfaced by this crate is one of the variants below. We use
//! `thiserror` so each variant carries a readable message and its source.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::parse::ParseError;

/// the external binary ran and exited with a nonzero code
#[derive(Debug, Clone, Error)]
#[error("`dolt {command}` exited with code {exit_code}: {}", stderr.trim())]
pub struct ProcessFailure {
    /// normalized argument vector, space separated
    pub command: String,
    /// the raw argument vector as passed to the binary
    pub args: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// the main error type
#[derive(Debug, Error)]
pub enum DoltError {
    /// directory has no `.dolt` marker
    #[error("not a dolt repository: {0}")]
    InvalidRepository(PathBuf),

    /// external invocation returned a nonzero exit code
    #[error(transparent)]
    Process(#[from] ProcessFailure),

    /// the binary could not be started at all
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// output did not match the expected line grammar
    #[error("unexpected output: {0}")]
    Parse(#[from] ParseError),

    /// caller-visible invariant violated before invocation
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// invalid combination of writer or loader options
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// explicitly unsupported feature
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// filesystem error (staging files, repository directories)
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// delimited text could not be read or written
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON could not be read or written
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DoltError {
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        DoltError::Precondition(msg.into())
    }

    pub(crate) fn configuration(msg: impl Into<String>) -> Self {
        DoltError::Configuration(msg.into())
    }

    /// check if the external process ran and failed
    pub fn is_process_failure(&self) -> bool {
        matches!(self, DoltError::Process(_))
    }

    /// check if this error was raised before any process was spawned
    /// because of how the caller combined options
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            DoltError::Precondition(_) | DoltError::Configuration(_) | DoltError::NotImplemented(_)
        )
    }

    /// exit code of the failed process, if any
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DoltError::Process(failure) => Some(failure.exit_code),
            _ => None,
        }
    }
}

/// result type alias used across the crate
pub type DoltResult<T> = Result<T, DoltError>;
