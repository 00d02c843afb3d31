//! Argument builders for multi-mode commands.
//!
//! Each options struct turns itself into an argument vector and rejects
//! meaningless flag combinations there, so a bad combination never reaches
//! a process.

use std::fmt;
use std::str::FromStr;

use crate::error::{DoltError, DoltResult};
use crate::repo::types::validate_name;

fn count_set(flags: &[bool]) -> usize {
    flags.iter().filter(|f| **f).count()
}

pub(crate) fn checked_name(kind: &str, name: &str) -> DoltResult<String> {
    validate_name(name).map_err(|e| DoltError::precondition(format!("invalid {kind} name: {e}")))?;
    Ok(name.to_string())
}

/// `dolt branch` in one of its modes: list, create, copy, move or delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchOptions {
    pub name: Option<String>,
    pub start_point: Option<String>,
    pub new_branch: Option<String>,
    pub force: bool,
    pub delete: bool,
    pub copy: bool,
    /// rename, `--move`
    pub rename: bool,
}

impl BranchOptions {
    pub fn list() -> Self {
        Self::default()
    }

    pub fn create(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            delete: true,
            ..Self::default()
        }
    }

    pub fn copy(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: Some(from.into()),
            new_branch: Some(to.into()),
            copy: true,
            ..Self::default()
        }
    }

    pub fn rename(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            name: Some(from.into()),
            new_branch: Some(to.into()),
            rename: true,
            ..Self::default()
        }
    }

    pub fn start_point(mut self, start_point: impl Into<String>) -> Self {
        self.start_point = Some(start_point.into());
        self
    }

    pub fn force(mut self, value: bool) -> Self {
        self.force = value;
        self
    }

    /// `None` when this is a plain listing
    pub fn to_args(&self) -> DoltResult<Option<Vec<String>>> {
        if count_set(&[self.delete, self.copy, self.rename]) > 1 {
            return Err(DoltError::precondition("at most one of delete, copy, move can be set"));
        }

        let mutating = self.name.is_some() || self.delete || self.copy || self.rename;
        if !mutating {
            if self.force {
                return Err(DoltError::precondition(
                    "force is not valid without a branch name, or copy, move or delete",
                ));
            }
            return Ok(None);
        }

        let mut args = vec!["branch".to_string()];
        if self.force {
            args.push("--force".to_string());
        }

        let name = self.name.as_deref().map(|n| checked_name("branch", n)).transpose()?;
        let new_branch = self.new_branch.as_deref().map(|n| checked_name("branch", n)).transpose()?;

        if self.copy || self.rename {
            let new_branch = new_branch.ok_or_else(|| {
                DoltError::precondition("must provide new_branch when copying or moving a branch")
            })?;
            args.push(if self.copy { "--copy" } else { "--move" }.to_string());
            args.extend(name);
            args.push(new_branch);
        } else if self.delete {
            let name = name.ok_or_else(|| DoltError::precondition("must provide a branch name when deleting"))?;
            args.push("--delete".to_string());
            args.push(name);
        } else if let Some(name) = name {
            args.push(name);
            args.extend(self.start_point.clone());
        }

        Ok(Some(args))
    }
}

/// `dolt checkout`: a branch, or a set of tables, never both
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    pub branch: Option<String>,
    pub tables: Vec<String>,
    /// `-b`
    pub create_branch: bool,
    pub start_point: Option<String>,
}

impl CheckoutOptions {
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            branch: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn new_branch(name: impl Into<String>, start_point: Option<String>) -> Self {
        Self {
            branch: Some(name.into()),
            create_branch: true,
            start_point,
            ..Self::default()
        }
    }

    pub fn tables<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn to_args(&self) -> DoltResult<Vec<String>> {
        if self.branch.is_some() && !self.tables.is_empty() {
            return Err(DoltError::precondition("cannot check out a branch and tables in one call"));
        }
        if self.branch.is_none() && self.tables.is_empty() {
            return Err(DoltError::precondition("nothing to check out"));
        }

        let mut args = vec!["checkout".to_string()];
        if let Some(branch) = &self.branch {
            let branch = checked_name("branch", branch)?;
            if self.create_branch {
                args.push("-b".to_string());
                args.push(branch);
                args.extend(self.start_point.clone());
            } else {
                args.push(branch);
            }
        }
        for table in &self.tables {
            args.push(checked_name("table", table)?);
        }
        Ok(args)
    }
}

/// flags for `dolt merge`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub squash: bool,
    pub no_ff: bool,
}

impl MergeOptions {
    pub fn squash() -> Self {
        Self {
            squash: true,
            no_ff: false,
        }
    }

    pub(crate) fn to_args(self, branch: &str) -> DoltResult<Vec<String>> {
        if self.squash && self.no_ff {
            return Err(DoltError::precondition("squash and no_ff cannot be combined"));
        }
        let mut args = vec!["merge".to_string()];
        if self.squash {
            args.push("--squash".to_string());
        }
        if self.no_ff {
            args.push("--no-ff".to_string());
        }
        args.push(checked_name("branch", branch)?);
        Ok(args)
    }
}

/// `--result-format` values that can be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Csv,
    Json,
}

impl ResultFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFormat::Csv => "csv",
            ResultFormat::Json => "json",
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFormat {
    type Err = DoltError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" | "tabular" => Ok(ResultFormat::Csv),
            "json" => Ok(ResultFormat::Json),
            other => Err(DoltError::configuration(format!("{other} is not a valid result format"))),
        }
    }
}

/// `dolt sql` options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlOptions {
    pub query: Option<String>,
    pub result_format: Option<ResultFormat>,
    /// run a saved query by name
    pub execute: Option<String>,
    /// save `query` under this name
    pub save: Option<String>,
    pub message: Option<String>,
    pub list_saved: bool,
    pub batch: bool,
    pub multi_db_dir: Option<String>,
}

impl SqlOptions {
    /// a query whose rows are decoded
    pub fn query(query: impl Into<String>, format: ResultFormat) -> Self {
        Self {
            query: Some(query.into()),
            result_format: Some(format),
            ..Self::default()
        }
    }

    /// statements run for their side effects
    pub fn batch(statements: impl Into<String>) -> Self {
        Self {
            query: Some(statements.into()),
            batch: true,
            ..Self::default()
        }
    }

    pub fn to_args(&self) -> DoltResult<Vec<String>> {
        let mut args = vec!["sql".to_string()];

        if self.list_saved {
            if self.query.is_some()
                || self.result_format.is_some()
                || self.save.is_some()
                || self.message.is_some()
                || self.batch
                || self.multi_db_dir.is_some()
                || self.execute.is_some()
            {
                return Err(DoltError::precondition("list_saved cannot be combined with other options"));
            }
            args.push("--list-saved".to_string());
            return Ok(args);
        }

        if let Some(saved) = &self.execute {
            if self.query.is_some()
                || self.save.is_some()
                || self.message.is_some()
                || self.batch
                || self.multi_db_dir.is_some()
            {
                return Err(DoltError::precondition("execute cannot be combined with other options"));
            }
            args.push("--execute".to_string());
            args.push(saved.clone());
        }

        if self.result_format.is_some() && self.query.is_none() {
            return Err(DoltError::precondition("a result format needs a query"));
        }

        if let Some(dir) = &self.multi_db_dir {
            args.push("--multi-db-dir".to_string());
            args.push(dir.clone());
        }
        if self.batch {
            args.push("--batch".to_string());
        }
        if let Some(save) = &self.save {
            args.push("--save".to_string());
            args.push(save.clone());
            if let Some(message) = &self.message {
                args.push("--message".to_string());
                args.push(message.clone());
            }
        }
        if let Some(query) = &self.query {
            args.push("--query".to_string());
            args.push(query.clone());
        }
        if let Some(format) = self.result_format {
            args.push("--result-format".to_string());
            args.push(format.to_string());
        }
        Ok(args)
    }
}

/// `dolt diff` options; data, schema and summary are exclusive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOptions {
    pub commit: Option<String>,
    pub other_commit: Option<String>,
    pub tables: Vec<String>,
    pub data: bool,
    pub schema: bool,
    pub summary: bool,
    pub sql: bool,
    pub where_clause: Option<String>,
    pub limit: Option<usize>,
}

impl DiffOptions {
    pub fn to_args(&self) -> DoltResult<Vec<String>> {
        if count_set(&[self.data, self.schema, self.summary]) > 1 {
            return Err(DoltError::precondition("at most one of data, schema, summary can be set"));
        }

        let mut args = vec!["diff".to_string()];
        if self.data {
            args.push("--data".to_string());
            if let Some(clause) = &self.where_clause {
                args.push("--where".to_string());
                args.push(clause.clone());
            }
            if let Some(limit) = self.limit {
                args.push("--limit".to_string());
                args.push(limit.to_string());
            }
        }
        if self.summary {
            args.push("--summary".to_string());
        }
        if self.schema {
            args.push("--schema".to_string());
        }
        if self.sql {
            args.push("--sql".to_string());
        }
        args.extend(self.commit.clone());
        args.extend(self.other_commit.clone());
        for table in &self.tables {
            args.push(checked_name("table", table)?);
        }
        Ok(args)
    }
}

/// `dolt config` options; exactly one of add/list/get/unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOptions {
    pub name: Option<String>,
    pub value: Option<String>,
    pub add: bool,
    pub list: bool,
    pub get: bool,
    pub unset: bool,
}

impl ConfigOptions {
    pub fn list() -> Self {
        Self {
            list: true,
            ..Self::default()
        }
    }

    pub fn get(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            get: true,
            ..Self::default()
        }
    }

    pub fn add(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value.into()),
            add: true,
            ..Self::default()
        }
    }

    pub fn unset(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            unset: true,
            ..Self::default()
        }
    }

    pub(crate) fn to_args(&self, scope: &str) -> DoltResult<Vec<String>> {
        if count_set(&[self.add, self.list, self.get, self.unset]) != 1 {
            return Err(DoltError::precondition("exactly one of add, list, get, unset must be set"));
        }

        let mut args = vec!["config".to_string(), scope.to_string()];
        match (&self.name, &self.value) {
            (Some(name), Some(value)) if self.add => {
                args.extend(["--add".to_string(), name.clone(), value.clone()]);
            }
            (None, None) if self.list => args.push("--list".to_string()),
            (Some(name), None) if self.get => args.extend(["--get".to_string(), name.clone()]),
            (Some(name), None) if self.unset => args.extend(["--unset".to_string(), name.clone()]),
            _ if self.add => return Err(DoltError::precondition("add needs a name and a value")),
            _ if self.list => return Err(DoltError::precondition("list takes no name or value")),
            _ => return Err(DoltError::precondition("get and unset take only a name")),
        }
        Ok(args)
    }
}

/// `dolt schema import` options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaImportOptions {
    pub table: String,
    pub filename: String,
    pub create: bool,
    pub update: bool,
    pub replace: bool,
    pub dry_run: bool,
    pub keep_types: bool,
    pub file_type: Option<String>,
    pub pks: Vec<String>,
    pub map: Option<String>,
    pub float_threshold: Option<f64>,
    pub delim: Option<String>,
}

impl SchemaImportOptions {
    pub fn create(table: impl Into<String>, filename: impl Into<String>, pks: Vec<String>) -> Self {
        Self {
            table: table.into(),
            filename: filename.into(),
            create: true,
            pks,
            ..Self::default()
        }
    }

    pub fn to_args(&self) -> DoltResult<Vec<String>> {
        if count_set(&[self.create, self.update, self.replace]) != 1 {
            return Err(DoltError::precondition("exactly one of create, update, replace must be set"));
        }
        if (self.create || self.replace) && self.pks.is_empty() {
            return Err(DoltError::configuration("create and replace need primary keys"));
        }

        let mut args = vec!["schema".to_string(), "import".to_string()];
        if self.create {
            args.push("--create".to_string());
        }
        if self.update {
            args.push("--update".to_string());
        }
        if self.replace {
            args.push("--replace".to_string());
        }
        if self.dry_run {
            args.push("--dry-run".to_string());
        }
        if self.keep_types {
            args.push("--keep-types".to_string());
        }
        if let Some(file_type) = &self.file_type {
            args.extend(["--file-type".to_string(), file_type.clone()]);
        }
        if !self.pks.is_empty() {
            args.extend(["--pks".to_string(), self.pks.join(",")]);
        }
        if let Some(map) = &self.map {
            args.extend(["--map".to_string(), map.clone()]);
        }
        if let Some(threshold) = self.float_threshold {
            args.extend(["--float-threshold".to_string(), threshold.to_string()]);
        }
        if let Some(delim) = &self.delim {
            args.extend(["--delim".to_string(), delim.clone()]);
        }
        args.push(checked_name("table", &self.table)?);
        args.push(self.filename.clone());
        Ok(args)
    }
}

/// `dolt table import` options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableImportOptions {
    pub table: String,
    pub filename: String,
    pub create_table: bool,
    pub update_table: bool,
    pub replace_table: bool,
    pub force: bool,
    pub mapping_file: Option<String>,
    pub pk: Vec<String>,
    pub file_type: Option<String>,
    pub continue_importing: bool,
    pub delim: Option<String>,
}

impl TableImportOptions {
    pub fn new(table: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn to_args(&self) -> DoltResult<Vec<String>> {
        if count_set(&[self.create_table, self.update_table, self.replace_table]) != 1 {
            return Err(DoltError::precondition("exactly one of create, update, replace must be set"));
        }
        if (self.create_table || self.replace_table) && self.pk.is_empty() {
            return Err(DoltError::configuration("create and replace need a primary key"));
        }

        let mut args = vec!["table".to_string(), "import".to_string()];
        if self.create_table {
            args.push("--create-table".to_string());
        }
        if self.update_table {
            args.push("--update-table".to_string());
        }
        if self.replace_table {
            args.push("--replace-table".to_string());
        }
        if let Some(file_type) = &self.file_type {
            args.extend(["--file-type".to_string(), file_type.clone()]);
        }
        if !self.pk.is_empty() {
            args.push(format!("--pk={}", self.pk.join(",")));
        }
        if let Some(map) = &self.mapping_file {
            args.extend(["--map".to_string(), map.clone()]);
        }
        if let Some(delim) = &self.delim {
            args.extend(["--delim".to_string(), delim.clone()]);
        }
        if self.continue_importing {
            args.push("--continue".to_string());
        }
        if self.force {
            args.push("--force".to_string());
        }
        args.push(checked_name("table", &self.table)?);
        args.push(self.filename.clone());
        Ok(args)
    }
}

/// `dolt table export` options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableExportOptions {
    pub table: String,
    pub filename: String,
    pub force: bool,
    pub schema: Option<String>,
    pub mapping_file: Option<String>,
    pub pk: Vec<String>,
    pub file_type: Option<String>,
    pub continue_exporting: bool,
}

impl TableExportOptions {
    pub fn new(table: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    pub fn to_args(&self) -> DoltResult<Vec<String>> {
        let mut args = vec!["table".to_string(), "export".to_string()];
        if self.force {
            args.push("--force".to_string());
        }
        if self.continue_exporting {
            args.push("--continue".to_string());
        }
        if let Some(schema) = &self.schema {
            args.extend(["--schema".to_string(), schema.clone()]);
        }
        if let Some(map) = &self.mapping_file {
            args.extend(["--map".to_string(), map.clone()]);
        }
        if !self.pk.is_empty() {
            args.extend(["--pk".to_string(), self.pk.join(",")]);
        }
        if let Some(file_type) = &self.file_type {
            args.extend(["--file-type".to_string(), file_type.clone()]);
        }
        args.push(checked_name("table", &self.table)?);
        args.push(self.filename.clone());
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_branch_modes() {
        assert_eq!(BranchOptions::list().to_args().unwrap(), None);
        assert_eq!(
            BranchOptions::create("feature").start_point("abc123").to_args().unwrap(),
            Some(strings(&["branch", "feature", "abc123"]))
        );
        assert_eq!(
            BranchOptions::delete("feature").force(true).to_args().unwrap(),
            Some(strings(&["branch", "--force", "--delete", "feature"]))
        );
        assert_eq!(
            BranchOptions::copy("master", "backup").to_args().unwrap(),
            Some(strings(&["branch", "--copy", "master", "backup"]))
        );
        assert_eq!(
            BranchOptions::rename("old", "new").to_args().unwrap(),
            Some(strings(&["branch", "--move", "old", "new"]))
        );
    }

    #[test]
    fn test_branch_exclusive_flags() {
        let opts = BranchOptions {
            name: Some("feature".to_string()),
            delete: true,
            copy: true,
            ..BranchOptions::default()
        };
        assert!(matches!(opts.to_args(), Err(DoltError::Precondition(_))));

        let force_alone = BranchOptions::list().force(true);
        assert!(matches!(force_alone.to_args(), Err(DoltError::Precondition(_))));

        let copy_without_target = BranchOptions {
            name: Some("master".to_string()),
            copy: true,
            ..BranchOptions::default()
        };
        assert!(matches!(copy_without_target.to_args(), Err(DoltError::Precondition(_))));

        assert!(BranchOptions::create("--evil").to_args().is_err());
    }

    #[test]
    fn test_checkout_args() {
        assert_eq!(CheckoutOptions::branch("feature").to_args().unwrap(), strings(&["checkout", "feature"]));
        assert_eq!(
            CheckoutOptions::new_branch("feature", Some("abc".to_string())).to_args().unwrap(),
            strings(&["checkout", "-b", "feature", "abc"])
        );
        assert_eq!(
            CheckoutOptions::tables(["users", "orders"]).to_args().unwrap(),
            strings(&["checkout", "users", "orders"])
        );

        let both = CheckoutOptions {
            branch: Some("feature".to_string()),
            tables: vec!["users".to_string()],
            ..CheckoutOptions::default()
        };
        assert!(matches!(both.to_args(), Err(DoltError::Precondition(_))));
    }

    #[test]
    fn test_merge_args() {
        assert_eq!(MergeOptions::squash().to_args("feature").unwrap(), strings(&["merge", "--squash", "feature"]));
        let both = MergeOptions { squash: true, no_ff: true };
        assert!(matches!(both.to_args("feature"), Err(DoltError::Precondition(_))));
    }

    #[test]
    fn test_sql_args() {
        assert_eq!(
            SqlOptions::query("select 1", ResultFormat::Json).to_args().unwrap(),
            strings(&["sql", "--query", "select 1", "--result-format", "json"])
        );
        assert_eq!(
            SqlOptions::batch("insert into t values (1);").to_args().unwrap(),
            strings(&["sql", "--batch", "--query", "insert into t values (1);"])
        );

        let list_and_query = SqlOptions {
            list_saved: true,
            query: Some("select 1".to_string()),
            ..SqlOptions::default()
        };
        assert!(list_and_query.to_args().is_err());

        let format_without_query = SqlOptions {
            result_format: Some(ResultFormat::Csv),
            ..SqlOptions::default()
        };
        assert!(format_without_query.to_args().is_err());

        assert_eq!("tabular".parse::<ResultFormat>().unwrap(), ResultFormat::Csv);
        assert!("xml".parse::<ResultFormat>().is_err());
    }

    #[test]
    fn test_diff_exclusive() {
        let opts = DiffOptions {
            data: true,
            summary: true,
            ..DiffOptions::default()
        };
        assert!(matches!(opts.to_args(), Err(DoltError::Precondition(_))));

        let data = DiffOptions {
            data: true,
            limit: Some(10),
            commit: Some("HEAD~1".to_string()),
            tables: vec!["users".to_string()],
            ..DiffOptions::default()
        };
        assert_eq!(data.to_args().unwrap(), strings(&["diff", "--data", "--limit", "10", "HEAD~1", "users"]));
    }

    #[test]
    fn test_config_args() {
        assert_eq!(ConfigOptions::list().to_args("--global").unwrap(), strings(&["config", "--global", "--list"]));
        assert_eq!(
            ConfigOptions::add("user.name", "Jane").to_args("--local").unwrap(),
            strings(&["config", "--local", "--add", "user.name", "Jane"])
        );

        let two = ConfigOptions {
            list: true,
            get: true,
            ..ConfigOptions::default()
        };
        assert!(two.to_args("--global").is_err());

        let get_with_value = ConfigOptions {
            value: Some("x".to_string()),
            ..ConfigOptions::get("user.name")
        };
        assert!(get_with_value.to_args("--global").is_err());
    }

    #[test]
    fn test_schema_import_validation() {
        let mut opts = SchemaImportOptions::create("users", "users.csv", vec!["id".to_string()]);
        assert_eq!(
            opts.to_args().unwrap(),
            strings(&["schema", "import", "--create", "--pks", "id", "users", "users.csv"])
        );

        opts.update = true;
        assert!(matches!(opts.to_args(), Err(DoltError::Precondition(_))));

        let no_pks = SchemaImportOptions::create("users", "users.csv", Vec::new());
        assert!(matches!(no_pks.to_args(), Err(DoltError::Configuration(_))));
    }

    #[test]
    fn test_table_import_validation() {
        let mut opts = TableImportOptions::new("users", "/tmp/users.csv");
        assert!(matches!(opts.to_args(), Err(DoltError::Precondition(_))));

        opts.create_table = true;
        assert!(matches!(opts.to_args(), Err(DoltError::Configuration(_))));

        opts.pk = vec!["id".to_string(), "region".to_string()];
        opts.force = true;
        assert_eq!(
            opts.to_args().unwrap(),
            strings(&["table", "import", "--create-table", "--pk=id,region", "--force", "users", "/tmp/users.csv"])
        );

        opts.replace_table = true;
        assert!(matches!(opts.to_args(), Err(DoltError::Precondition(_))));
    }

    #[test]
    fn test_table_export_args() {
        let mut opts = TableExportOptions::new("users", "out.csv");
        opts.force = true;
        assert_eq!(opts.to_args().unwrap(), strings(&["table", "export", "--force", "users", "out.csv"]));
    }
}
