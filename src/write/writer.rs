//! Staging writes through `table import`.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{DoltError, DoltResult};
use crate::repo::{Dolt, TableImportOptions};
use crate::write::source::StageData;

/// How an import reconciles with an existing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportMode {
    Create,
    ForceCreate,
    Replace,
    Update,
}

impl ImportMode {
    pub const ALL: [ImportMode; 4] = [ImportMode::Create, ImportMode::ForceCreate, ImportMode::Replace, ImportMode::Update];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Create => "create",
            ImportMode::ForceCreate => "force_create",
            ImportMode::Replace => "replace",
            ImportMode::Update => "update",
        }
    }

    /// create, force_create and replace define the schema and need a key
    pub fn requires_primary_key(&self) -> bool {
        !matches!(self, ImportMode::Update)
    }

    /// import options for `table` from `filename` in this mode
    pub fn import_options(&self, table: &str, filename: &str, primary_key: &[String]) -> TableImportOptions {
        let mut options = TableImportOptions::new(table, filename);
        options.pk = primary_key.to_vec();
        match self {
            ImportMode::Create => options.create_table = true,
            ImportMode::ForceCreate => {
                options.create_table = true;
                options.force = true;
            }
            ImportMode::Replace => options.replace_table = true,
            ImportMode::Update => options.update_table = true,
        }
        options
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = DoltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImportMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ImportMode::ALL.iter().map(|m| m.as_str()).collect();
                DoltError::configuration(format!("import mode must be one of: {}", names.join(", ")))
            })
    }
}

/// Writes one source into one table.
///
/// Without an explicit mode the table listing decides: absent tables are
/// created, present ones updated.
#[derive(Clone)]
pub struct TableWriter {
    table: String,
    source: Arc<dyn StageData>,
    primary_key: Vec<String>,
    import_mode: Option<ImportMode>,
    commit: bool,
    commit_message: Option<String>,
    commit_date: Option<DateTime<Utc>>,
}

impl fmt::Debug for TableWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableWriter")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("import_mode", &self.import_mode)
            .field("commit", &self.commit)
            .finish()
    }
}

impl TableWriter {
    pub fn new(table: impl Into<String>, source: impl StageData + 'static) -> Self {
        Self {
            table: table.into(),
            source: Arc::new(source),
            primary_key: Vec::new(),
            import_mode: None,
            commit: false,
            commit_message: None,
            commit_date: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn import_mode(mut self, mode: ImportMode) -> Self {
        self.import_mode = Some(mode);
        self
    }

    /// Commit the table right after importing.
    pub fn commit(mut self, value: bool) -> Self {
        self.commit = value;
        self
    }

    pub fn commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    pub fn commit_date(mut self, date: DateTime<Utc>) -> Self {
        self.commit_date = Some(date);
        self
    }

    fn check_primary_key(&self, mode: ImportMode) -> DoltResult<()> {
        if mode.requires_primary_key() && self.primary_key.is_empty() {
            return Err(DoltError::configuration(format!(
                "import mode {mode} on table {} needs a primary key",
                self.table
            )));
        }
        Ok(())
    }

    fn resolve_mode(&self, dolt: &Dolt) -> DoltResult<ImportMode> {
        if let Some(mode) = self.import_mode {
            return Ok(mode);
        }
        let exists = dolt.ls(false, false)?.iter().any(|t| t.name == self.table);
        let mode = if exists { ImportMode::Update } else { ImportMode::Create };
        info!(table = %self.table, %mode, "no import mode given, table {}", if exists { "exists" } else { "is new" });
        Ok(mode)
    }

    /// Stage and import; returns the table name. The staging file is gone
    /// when this returns, whatever the outcome.
    pub fn write(&self, dolt: &Dolt) -> DoltResult<String> {
        if let Some(mode) = self.import_mode {
            self.check_primary_key(mode)?;
        }
        self.source.validate()?;

        let mode = self.resolve_mode(dolt)?;
        self.check_primary_key(mode)?;
        info!(table = %self.table, root = %dolt.root().display(), %mode, "importing");

        let mut staging = tempfile::Builder::new()
            .prefix(&format!("{}-", ulid::Ulid::new()))
            .suffix(".csv")
            .tempfile()?;
        self.stage_into(&mut staging)?;

        let filename = staging.path().display().to_string();
        dolt.table_import(&mode.import_options(&self.table, &filename, &self.primary_key))?;

        if self.commit {
            let message = self
                .commit_message
                .clone()
                .unwrap_or_else(|| format!("Committing write to table {} in {} mode", self.table, mode));
            dolt.add(&[self.table.as_str()])?;
            dolt.commit(&message, false, self.commit_date)?;
        }

        Ok(self.table.clone())
    }

    fn stage_into(&self, staging: &mut NamedTempFile) -> DoltResult<()> {
        let file = staging.as_file_mut();
        self.source.stage(&mut *file)?;
        file.flush()?;
        Ok(())
    }
}
