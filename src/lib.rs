//! doltpipe - drive a Dolt repository from Rust
//!
//! This crate talks to the `dolt` command-line binary. It runs commands,
//! parses their text output into typed values, and builds repeatable table
//! loads on top: stage data, import it, commit only when something changed,
//! and leave the active branch where it was.
//!
//! # Example
//!
//! ```no_run
//! use doltpipe::etl::Loader;
//! use doltpipe::repo::Dolt;
//! use doltpipe::write::{CsvText, ImportMode, TableWriter};
//!
//! let dolt = Dolt::open("./prices").unwrap();
//! let writer = TableWriter::new("prices", CsvText("id,price\n1,9.99\n".to_string()))
//!     .primary_key(["id"])
//!     .import_mode(ImportMode::Create);
//! Loader::new("daily prices").branch("staging").writer(writer).run(&dolt).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod etl;
pub mod exec;
pub mod parse;
pub mod read;
pub mod repo;
pub mod write;

pub use config::DoltConfig;
pub use error::{DoltError, DoltResult, ProcessFailure};
pub use repo::{Client, Dolt};
