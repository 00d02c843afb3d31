//! Process execution layer.
//!
//! The external engine is reachable only as a command-line binary. This
//! module is the single place that starts it; the rest of the crate talks to
//! a [`CommandRunner`] and gets back stdout lines or a typed failure.

mod mock;
mod runner;

pub use mock::{scratch_repo, ScriptedRunner};
pub use runner::{execute, normalize_args, CommandRunner, RawOutput, SystemRunner};
