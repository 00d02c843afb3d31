//! Table writer layer.
//!
//! Inputs are staged to a uniquely named temporary CSV file, imported with
//! `table import`, and optionally committed. The helpers below cover the
//! common single-shot cases; build a [`TableWriter`] for anything else.

mod source;
mod writer;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::DoltResult;
use crate::repo::Dolt;

pub use source::{read_csv_file, Columns, CsvFile, CsvText, LazyCsv, LazyRows, Record, Rows, RowsTransform, StageData};
pub use writer::{ImportMode, TableWriter};

fn configured(writer: TableWriter, import_mode: Option<ImportMode>, primary_key: &[String], commit: bool) -> TableWriter {
    let writer = writer.primary_key(primary_key.iter().cloned()).commit(commit);
    match import_mode {
        Some(mode) => writer.import_mode(mode),
        None => writer,
    }
}

/// import a CSV file from disk
pub fn write_file(
    dolt: &Dolt,
    table: &str,
    path: &Path,
    import_mode: Option<ImportMode>,
    primary_key: &[String],
    commit: bool,
) -> DoltResult<String> {
    configured(TableWriter::new(table, CsvFile(path.to_path_buf())), import_mode, primary_key, commit).write(dolt)
}

/// import records
pub fn write_rows(
    dolt: &Dolt,
    table: &str,
    rows: Vec<BTreeMap<String, Value>>,
    import_mode: Option<ImportMode>,
    primary_key: &[String],
    commit: bool,
) -> DoltResult<String> {
    configured(TableWriter::new(table, Rows(rows)), import_mode, primary_key, commit).write(dolt)
}

/// import equal-length columns
pub fn write_columns(
    dolt: &Dolt,
    table: &str,
    columns: BTreeMap<String, Vec<Value>>,
    import_mode: Option<ImportMode>,
    primary_key: &[String],
    commit: bool,
) -> DoltResult<String> {
    configured(TableWriter::new(table, Columns(columns)), import_mode, primary_key, commit).write(dolt)
}
