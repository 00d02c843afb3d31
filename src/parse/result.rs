//! SQL query results decoded from `--result-format csv|json`.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::parse::error::ParseError;

/// Decoded `dolt sql` output. `columns` keeps the order the binary printed
/// them in; each row is keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<BTreeMap<String, Value>>,
}

impl ResultSet {
    /// Rows with no header of their own. Columns are the union of keys in
    /// first-seen order, so a key one row omits still gets a column.
    pub fn from_rows(rows: Vec<BTreeMap<String, Value>>) -> Self {
        let columns = first_seen(rows.iter().flat_map(|row| row.keys()));
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&BTreeMap<String, Value>> {
        self.rows.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BTreeMap<String, Value>> {
        self.rows.iter()
    }
}

impl IntoIterator for ResultSet {
    type Item = BTreeMap<String, Value>;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

fn first_seen<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for key in keys {
        if !columns.contains(key) {
            columns.push(key.clone());
        }
    }
    columns
}

/// Decode CSV output. Every cell comes back as a JSON string.
pub fn parse_csv_result(lines: &[String]) -> Result<ResultSet, ParseError> {
    let text = lines.join("\n");
    let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::MalformedResult(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = reader
        .records()
        .map(|record| {
            let record = record.map_err(|e| ParseError::MalformedResult(e.to_string()))?;
            Ok(columns
                .iter()
                .cloned()
                .zip(record.iter().map(|cell| Value::String(cell.to_string())))
                .collect())
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(ResultSet { columns, rows })
}

/// Decode JSON output of the shape `{"rows": [{...}, ...]}`.
pub fn parse_json_result(lines: &[String]) -> Result<ResultSet, ParseError> {
    let text = lines.join("\n");
    if text.trim().is_empty() {
        return Ok(ResultSet::default());
    }

    let document: Value = serde_json::from_str(&text).map_err(|e| ParseError::MalformedResult(e.to_string()))?;
    let rows = match document.get("rows") {
        Some(Value::Array(rows)) => rows,
        // an empty result may omit the key entirely
        None if document.is_object() => return Ok(ResultSet::default()),
        _ => return Err(ParseError::MalformedResult("expected a `rows` array".to_string())),
    };

    let objects = rows
        .iter()
        .map(|row| match row {
            Value::Object(map) => Ok(map),
            other => Err(ParseError::MalformedResult(format!("row is not an object: {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    // object keys iterate in document order; null cells may be left out of a row
    let columns = first_seen(objects.iter().flat_map(|map| map.keys()));
    let rows = objects
        .into_iter()
        .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .collect();

    Ok(ResultSet { columns, rows })
}
