//! Repository layer.
//!
//! [`Client`] owns the runner and configuration; [`Dolt`] binds a client to
//! one repository directory and exposes the full command surface. The value
//! types in [`types`] are snapshots produced by those calls.
//!
//! Multi-mode commands take an options struct whose `to_args` rejects
//! contradictory flags before anything is spawned.

mod client;
mod handle;
mod options;
mod types;

pub use client::Client;
pub use handle::{Dolt, MergeOutcome, REPO_MARKER};
pub use options::{
    BranchOptions, CheckoutOptions, ConfigOptions, DiffOptions, MergeOptions, ResultFormat, SchemaImportOptions,
    SqlOptions, TableExportOptions, TableImportOptions,
};
pub use types::{
    validate_name, Branch, BranchListing, Commit, InvalidNameError, KeyPair, Parents, Remote, Status, Table,
};
