//! ETL layer.
//!
//! Writers are anything implementing [`TableWrite`]. A [`Loader`] runs a set
//! of them on one branch and commits; [`load_to_dolt`] wraps loaders with a
//! pull or clone beforehand and an optional push afterwards.

mod hub;
mod loader;

pub use hub::{load_to_dolt, LoadTarget};
pub use loader::{create_table_from_schema_import, dolt_loader, BranchCreator, Loader, TableTransformer, TableWrite};
