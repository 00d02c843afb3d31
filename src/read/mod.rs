//! Reading tables back out through `dolt sql`.
//!
//! Reads use the CSV result format, so every non-empty cell comes back as a
//! string value.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::{DoltError, DoltResult};
use crate::repo::{Dolt, ResultFormat, SqlOptions};

/// `SELECT *` on `table`, optionally `AS OF` a commit, branch or date
pub fn table_query(table: &str, as_of: Option<&str>) -> String {
    let base = format!("SELECT * FROM `{}`", table.replace('`', "``"));
    match as_of {
        Some(rev) => format!("{base} AS OF \"{}\"", rev.replace('"', "\\\"")),
        None => base,
    }
}

pub fn read_rows_sql(dolt: &Dolt, query: &str) -> DoltResult<Vec<BTreeMap<String, Value>>> {
    let rows = dolt
        .sql(&SqlOptions::query(query, ResultFormat::Csv))?
        .unwrap_or_default();
    Ok(rows.rows)
}

pub fn read_columns_sql(dolt: &Dolt, query: &str) -> DoltResult<BTreeMap<String, Vec<Value>>> {
    Ok(rows_to_columns(&read_rows_sql(dolt, query)?))
}

pub fn read_rows(dolt: &Dolt, table: &str, as_of: Option<&str>) -> DoltResult<Vec<BTreeMap<String, Value>>> {
    read_rows_sql(dolt, &table_query(table, as_of))
}

pub fn read_columns(dolt: &Dolt, table: &str, as_of: Option<&str>) -> DoltResult<BTreeMap<String, Vec<Value>>> {
    read_columns_sql(dolt, &table_query(table, as_of))
}

/// Pivot records into columns. A key missing from a record becomes null.
pub fn rows_to_columns(rows: &[BTreeMap<String, Value>]) -> BTreeMap<String, Vec<Value>> {
    let names: BTreeSet<&String> = rows.iter().flat_map(|row| row.keys()).collect();
    names
        .into_iter()
        .map(|name| {
            let values = rows.iter().map(|row| row.get(name).cloned().unwrap_or(Value::Null)).collect();
            (name.clone(), values)
        })
        .collect()
}

/// Pivot columns into records. Columns must all have the same length.
pub fn columns_to_rows(columns: &BTreeMap<String, Vec<Value>>) -> DoltResult<Vec<BTreeMap<String, Value>>> {
    let lengths: BTreeSet<usize> = columns.values().map(Vec::len).collect();
    if lengths.len() > 1 {
        return Err(DoltError::configuration("columns have different lengths"));
    }
    let count = lengths.into_iter().next().unwrap_or(0);

    Ok((0..count)
        .map(|i| {
            columns
                .iter()
                .map(|(name, values)| (name.clone(), values[i].clone()))
                .collect()
        })
        .collect())
}
