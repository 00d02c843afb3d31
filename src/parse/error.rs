//! Output parsing errors.

use thiserror::Error;

/// The command output did not match the grammar a parser expects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no active {0} marked in listing")]
    MissingActive(&'static str),

    #[error("{count} {kind} entries marked active, expected exactly one")]
    MultipleActive { kind: &'static str, count: usize },

    #[error("missing {field} in {context} line {line:?}")]
    MissingField {
        context: &'static str,
        field: &'static str,
        line: String,
    },

    #[error("invalid {field} in {context} line {line:?}")]
    InvalidField {
        context: &'static str,
        field: &'static str,
        line: String,
    },

    #[error("entry outside of any section: {0:?}")]
    OutsideSection(String),

    #[error("unrecognized {command} output: {output:?}")]
    Unrecognized { command: &'static str, output: String },

    #[error("commit {0} already has two parents")]
    ParentsFull(String),

    #[error("malformed query result: {0}")]
    MalformedResult(String),
}

impl ParseError {
    pub(crate) fn missing(context: &'static str, field: &'static str, line: &str) -> Self {
        ParseError::MissingField {
            context,
            field,
            line: line.to_string(),
        }
    }

    pub(crate) fn invalid(context: &'static str, field: &'static str, line: &str) -> Self {
        ParseError::InvalidField {
            context,
            field,
            line: line.to_string(),
        }
    }

    pub(crate) fn unrecognized(command: &'static str, lines: &[String]) -> Self {
        ParseError::Unrecognized {
            command,
            output: lines.join("\n"),
        }
    }
}
