//! Writer inputs.
//!
//! Every input kind knows how to render itself as CSV into a staging file.
//! The writer only ever sees that capability.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{DoltError, DoltResult};

/// One record: column name to value.
pub type Record = BTreeMap<String, Value>;

type CsvProducer = dyn Fn() -> DoltResult<String> + Send + Sync;
type CsvTransform = dyn Fn(String) -> String + Send + Sync;
type RowsProducer = dyn Fn() -> DoltResult<Vec<Record>> + Send + Sync;
/// A step rewriting records before they are staged.
pub type RowsTransform = dyn Fn(Vec<Record>) -> Vec<Record> + Send + Sync;

/// Something that can be staged as a delimited file for `table import`.
pub trait StageData: Send + Sync {
    /// Reject bad input before anything touches the repository.
    fn validate(&self) -> DoltResult<()> {
        Ok(())
    }

    /// write a header row and records to `out`
    fn stage(&self, out: &mut dyn Write) -> DoltResult<()>;
}

/// render one value as a CSV cell; null is the empty cell
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Delimited text already in memory, copied verbatim.
#[derive(Debug, Clone)]
pub struct CsvText(pub String);

impl StageData for CsvText {
    fn stage(&self, out: &mut dyn Write) -> DoltResult<()> {
        out.write_all(self.0.as_bytes())?;
        Ok(())
    }
}

/// A delimited file on disk, copied into the staging file.
#[derive(Debug, Clone)]
pub struct CsvFile(pub PathBuf);

impl StageData for CsvFile {
    fn validate(&self) -> DoltResult<()> {
        if !self.0.is_file() {
            return Err(DoltError::configuration(format!("{} is not a file", self.0.display())));
        }
        Ok(())
    }

    fn stage(&self, out: &mut dyn Write) -> DoltResult<()> {
        let mut file = File::open(&self.0)?;
        io::copy(&mut file, out)?;
        Ok(())
    }
}

/// Records; the header is the sorted union of every record's keys and a
/// missing key is an empty cell.
#[derive(Debug, Clone, Default)]
pub struct Rows(pub Vec<BTreeMap<String, Value>>);

impl Rows {
    fn header(&self) -> Vec<&String> {
        self.0
            .iter()
            .flat_map(|row| row.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl StageData for Rows {
    fn stage(&self, out: &mut dyn Write) -> DoltResult<()> {
        let header = self.header();
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(&header)?;
        for row in &self.0 {
            writer.write_record(header.iter().map(|col| row.get(*col).map(cell).unwrap_or_default()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Column name to values. All columns must have the same length.
#[derive(Debug, Clone, Default)]
pub struct Columns(pub BTreeMap<String, Vec<Value>>);

impl Columns {
    fn row_count(&self) -> usize {
        self.0.values().next().map(Vec::len).unwrap_or(0)
    }
}

impl StageData for Columns {
    fn validate(&self) -> DoltResult<()> {
        let lengths: BTreeSet<usize> = self.0.values().map(Vec::len).collect();
        if lengths.len() > 1 {
            let detail = self
                .0
                .iter()
                .map(|(name, values)| format!("{name}={}", values.len()))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DoltError::configuration(format!("columns have different lengths: {detail}")));
        }
        Ok(())
    }

    fn stage(&self, out: &mut dyn Write) -> DoltResult<()> {
        self.validate()?;
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(self.0.keys())?;
        for i in 0..self.row_count() {
            writer.write_record(self.0.values().map(|values| cell(&values[i])))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// CSV text fetched only when the write runs, then passed through each
/// transform in the order they were added.
#[derive(Clone)]
pub struct LazyCsv {
    get_data: Arc<CsvProducer>,
    transforms: Vec<Arc<CsvTransform>>,
}

impl LazyCsv {
    pub fn new<F>(get_data: F) -> Self
    where
        F: Fn() -> DoltResult<String> + Send + Sync + 'static,
    {
        Self {
            get_data: Arc::new(get_data),
            transforms: Vec::new(),
        }
    }

    pub fn transform<T>(mut self, transform: T) -> Self
    where
        T: Fn(String) -> String + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(transform));
        self
    }
}

impl fmt::Debug for LazyCsv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCsv").field("transforms", &self.transforms.len()).finish()
    }
}

impl StageData for LazyCsv {
    fn stage(&self, out: &mut dyn Write) -> DoltResult<()> {
        let text = self.transforms.iter().fold((self.get_data)()?, |text, t| t(text));
        out.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// Records fetched only when the write runs, then passed through each
/// transform in order and staged like [`Rows`].
#[derive(Clone)]
pub struct LazyRows {
    get_data: Arc<RowsProducer>,
    transforms: Vec<Arc<RowsTransform>>,
}

impl LazyRows {
    pub fn new<F>(get_data: F) -> Self
    where
        F: Fn() -> DoltResult<Vec<Record>> + Send + Sync + 'static,
    {
        Self {
            get_data: Arc::new(get_data),
            transforms: Vec::new(),
        }
    }

    pub fn transform<T>(mut self, transform: T) -> Self
    where
        T: Fn(Vec<Record>) -> Vec<Record> + Send + Sync + 'static,
    {
        self.transforms.push(Arc::new(transform));
        self
    }
}

impl fmt::Debug for LazyRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRows").field("transforms", &self.transforms.len()).finish()
    }
}

impl StageData for LazyRows {
    fn stage(&self, out: &mut dyn Write) -> DoltResult<()> {
        let rows = self.transforms.iter().fold((self.get_data)()?, |rows, t| t(rows));
        Rows(rows).stage(out)
    }
}

/// Records of a CSV file with a header row. Every cell is a string.
pub fn read_csv_file(path: &Path) -> DoltResult<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path)?;
    let header = reader.headers()?.clone();
    reader
        .records()
        .map(|record| {
            let record = record?;
            Ok(header
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
                .collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn staged(source: &dyn StageData) -> String {
        let mut buf = Vec::new();
        source.stage(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn row(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_rows_union_header() {
        let rows = Rows(vec![
            row(&[("name", json!("Alice")), ("id", json!(1))]),
            row(&[("id", json!(2)), ("age", json!(30))]),
        ]);
        assert_eq!(staged(&rows), "age,id,name\n,1,Alice\n30,2,\n");
    }

    #[test]
    fn test_rows_quote_and_null() {
        let rows = Rows(vec![row(&[("id", json!(1)), ("note", json!("a, b")), ("x", Value::Null)])]);
        assert_eq!(staged(&rows), "id,note,x\n1,\"a, b\",\n");
    }

    #[test]
    fn test_columns() {
        let mut columns = BTreeMap::new();
        columns.insert("id".to_string(), vec![json!(1), json!(2)]);
        columns.insert("name".to_string(), vec![json!("Alice"), json!("Bob")]);
        assert_eq!(staged(&Columns(columns)), "id,name\n1,Alice\n2,Bob\n");
    }

    #[test]
    fn test_columns_length_mismatch() {
        let mut columns = BTreeMap::new();
        columns.insert("id".to_string(), vec![json!(1), json!(2)]);
        columns.insert("name".to_string(), vec![json!("Alice")]);
        let columns = Columns(columns);

        assert!(matches!(columns.validate(), Err(DoltError::Configuration(_))));
        let mut buf = Vec::new();
        assert!(columns.stage(&mut buf).is_err());
    }

    #[test]
    fn test_csv_file_copy() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "id\n1\n").unwrap();

        assert_eq!(staged(&CsvFile(path)), "id\n1\n");
        assert!(CsvFile(dir.path().join("absent.csv")).validate().is_err());
    }

    #[test]
    fn test_lazy_csv_fetches_at_stage_time() {
        let fetched = Arc::new(parking_lot::Mutex::new(0));
        let counter = fetched.clone();
        let source = LazyCsv::new(move || {
            *counter.lock() += 1;
            Ok("id,name\n1, alice \n".to_string())
        })
        .transform(|text| text.replace(" alice ", "alice"))
        .transform(|text| text.to_uppercase());

        assert_eq!(*fetched.lock(), 0);
        assert_eq!(staged(&source), "ID,NAME\n1,ALICE\n");
        assert_eq!(*fetched.lock(), 1);
    }

    #[test]
    fn test_lazy_rows_transforms_in_order() {
        let source = LazyRows::new(|| Ok(vec![row(&[("id", json!(1))]), row(&[("id", json!(2))])]))
            .transform(|rows| rows.into_iter().filter(|r| r["id"] != json!(1)).collect())
            .transform(|mut rows| {
                for r in &mut rows {
                    r.insert("seen".to_string(), json!(true));
                }
                rows
            });
        assert_eq!(staged(&source), "id,seen\n2,true\n");
    }

    #[test]
    fn test_lazy_source_error_propagates() {
        let source = LazyRows::new(|| Err(DoltError::configuration("upstream unavailable")));
        let mut buf = Vec::new();
        assert!(matches!(source.stage(&mut buf), Err(DoltError::Configuration(_))));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_read_csv_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "id,note\n1,\"a, b\"\n").unwrap();

        let rows = read_csv_file(&path).unwrap();
        assert_eq!(rows, vec![row(&[("id", json!("1")), ("note", json!("a, b"))])]);
    }
}
