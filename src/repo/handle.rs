//! The repository handle.
//!
//! A [`Dolt`] is bound to one directory for its whole life. It caches
//! nothing: branch, status and table listings are re-read from the binary on
//! every call, because other processes may change them at any time.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::DoltConfig;
use crate::error::{DoltError, DoltResult};
use crate::exec::CommandRunner;
use crate::parse::{
    fold_log_rows, log_query, parse_branches, parse_config, parse_credentials, parse_csv_result,
    parse_json_result, parse_remotes, parse_status, parse_tables, ParseError, ResultSet,
};
use crate::repo::client::Client;
use crate::repo::options::{
    checked_name, BranchOptions, CheckoutOptions, ConfigOptions, DiffOptions, MergeOptions, ResultFormat,
    SchemaImportOptions, SqlOptions, TableExportOptions, TableImportOptions,
};
use crate::repo::types::{BranchListing, Commit, KeyPair, Remote, Status, Table};

/// subdirectory that marks a repository root
pub const REPO_MARKER: &str = ".dolt";

/// How a merge invocation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MergeOutcome {
    /// history moved forward, no commit made
    FastForward,
    /// nothing to merge
    UpToDate,
    /// conflicts were found and the merge was aborted
    Conflict,
    /// three-way merge, committed with the given message
    Merged { tables: Vec<String> },
}

struct DoltInner {
    root: PathBuf,
    client: Client,
}

/// Handle to one repository directory.
///
/// Cloning the handle is cheap and every clone talks to the same directory.
/// Concurrent calls on one directory are not coordinated here.
#[derive(Clone)]
pub struct Dolt {
    inner: Arc<DoltInner>,
}

impl fmt::Debug for Dolt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dolt").field("root", &self.inner.root).finish()
    }
}

impl Dolt {
    /// Open the repository at `path`, binary taken from the environment.
    pub fn open(path: impl AsRef<Path>) -> DoltResult<Self> {
        Client::default().open(path)
    }

    /// Open with a custom configuration.
    pub fn open_with_config(path: impl AsRef<Path>, config: DoltConfig) -> DoltResult<Self> {
        Client::new(config).open(path)
    }

    /// Open with an explicit runner, e.g. a scripted one in tests.
    pub fn with_runner(path: impl AsRef<Path>, runner: Arc<dyn CommandRunner>) -> DoltResult<Self> {
        Client::with_runner(runner).open(path)
    }

    pub(crate) fn bind(root: PathBuf, client: Client) -> DoltResult<Self> {
        if !root.join(REPO_MARKER).is_dir() {
            return Err(DoltError::InvalidRepository(root));
        }
        Ok(Self {
            inner: Arc::new(DoltInner { root, client }),
        })
    }

    /// directory this handle is bound to
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// directory name with `-` replaced, as used in session variables
    pub fn repo_name(&self) -> String {
        self.inner
            .root
            .file_name()
            .map(|n| n.to_string_lossy().replace('-', "_"))
            .unwrap_or_default()
    }

    /// Run raw arguments in the repository directory.
    pub fn execute(&self, args: &[String]) -> DoltResult<Vec<String>> {
        self.inner.client.run(args, &self.inner.root)
    }

    fn run<S: AsRef<str>>(&self, args: &[S]) -> DoltResult<Vec<String>> {
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        self.execute(&args)
    }

    /// commit hash at the head of the active branch
    pub fn head(&self) -> DoltResult<String> {
        let var = format!("@@{}_head", self.repo_name());
        let rows = self
            .sql(&SqlOptions::query(format!("select `{var}`"), ResultFormat::Csv))?
            .unwrap_or_default();

        rows.first()
            .and_then(|row| row.get(&var))
            .and_then(|v| v.as_str())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ParseError::MalformedResult(format!("head not found: {var}")).into())
    }

    // --- working set ---

    pub fn status(&self) -> DoltResult<Status> {
        let lines = self.run(&["status"])?;
        Ok(parse_status(&lines)?)
    }

    /// Stage `tables` and return the refreshed status.
    pub fn add<S: AsRef<str>>(&self, tables: &[S]) -> DoltResult<Status> {
        if tables.is_empty() {
            return Err(DoltError::precondition("no tables to add"));
        }
        let mut args = vec!["add".to_string()];
        for table in tables {
            args.push(checked_name("table", table.as_ref())?);
        }
        self.execute(&args)?;
        self.status()
    }

    pub fn reset<S: AsRef<str>>(&self, tables: &[S], hard: bool, soft: bool) -> DoltResult<()> {
        if hard && soft {
            return Err(DoltError::precondition("cannot reset hard and soft"));
        }
        let mut args = vec!["reset".to_string()];
        if hard {
            args.push("--hard".to_string());
        }
        if soft {
            args.push("--soft".to_string());
        }
        for table in tables {
            args.push(checked_name("table", table.as_ref())?);
        }
        self.execute(&args)?;
        Ok(())
    }

    /// Commit the staged changes. With nothing staged the binary refuses
    /// unless `allow_empty` is set.
    pub fn commit(&self, message: &str, allow_empty: bool, date: Option<DateTime<Utc>>) -> DoltResult<()> {
        let mut args = vec!["commit".to_string(), "-m".to_string(), message.to_string()];
        if allow_empty {
            args.push("--allow-empty".to_string());
        }
        if let Some(date) = date {
            args.push("--date".to_string());
            args.push(date.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        self.execute(&args)?;
        Ok(())
    }

    // --- branches ---

    /// Active branch plus every branch.
    pub fn branches(&self) -> DoltResult<BranchListing> {
        let lines = self.run(&["branch", "--list", "--verbose"])?;
        Ok(parse_branches(&lines)?)
    }

    /// Run one branch sub-operation (or none, for a listing) and return the
    /// listing afterwards.
    pub fn branch(&self, options: &BranchOptions) -> DoltResult<BranchListing> {
        if let Some(args) = options.to_args()? {
            self.execute(&args)?;
        }
        self.branches()
    }

    pub fn checkout(&self, options: &CheckoutOptions) -> DoltResult<()> {
        let args = options.to_args()?;
        self.execute(&args)?;
        Ok(())
    }

    /// Merge `branch` into the active branch.
    ///
    /// Requires a clean working set and an existing branch. Conflicts are
    /// aborted right away, leaving the repository as it was. A three-way
    /// merge stages every changed table and commits with `message`.
    pub fn merge(&self, branch: &str, message: &str, options: MergeOptions) -> DoltResult<MergeOutcome> {
        let args = options.to_args(branch)?;

        let listing = self.branches()?;
        let current = listing.active.name.clone();
        if !self.status()?.is_clean() {
            return Err(DoltError::precondition(format!(
                "changes in the working set, commit before merging {branch} into {current}"
            )));
        }
        if !listing.contains(branch) {
            return Err(DoltError::precondition(format!(
                "cannot merge non-existent branch {branch} into {current}"
            )));
        }

        info!(branch, into = %current, "merging");
        let output = self.execute(&args)?;

        if output.iter().any(|l| l.trim_start().starts_with("CONFLICT")) {
            warn!(branch, into = %current, "merge conflict, aborting:\n{}", output.join("\n"));
            self.run(&["merge", "--abort"])?;
            return Ok(MergeOutcome::Conflict);
        }
        if output.iter().any(|l| l.contains("Fast-forward")) {
            info!(branch, "fast-forward merge");
            return Ok(MergeOutcome::FastForward);
        }
        if output.iter().any(|l| l.contains("Already up to date")) {
            info!(branch, "already up to date");
            return Ok(MergeOutcome::UpToDate);
        }
        if !output.iter().any(|l| l.trim_start().starts_with("Updating")) {
            return Err(ParseError::unrecognized("merge", &output).into());
        }

        let tables = self.status()?.changed_tables();
        if !tables.is_empty() {
            self.add(&tables)?;
        }
        self.commit(message, false, None)?;
        info!(branch, into = %current, tables = tables.len(), "merge committed");
        Ok(MergeOutcome::Merged { tables })
    }

    // --- queries ---

    /// Run `dolt sql`. Rows come back only when a result format is set.
    pub fn sql(&self, options: &SqlOptions) -> DoltResult<Option<ResultSet>> {
        let args = options.to_args()?;
        let lines = self.execute(&args)?;
        match options.result_format {
            Some(ResultFormat::Csv) => Ok(Some(parse_csv_result(&lines)?)),
            Some(ResultFormat::Json) => Ok(Some(parse_json_result(&lines)?)),
            None => Ok(None),
        }
    }

    /// Commit history, newest first, optionally limited or pinned to one
    /// commit.
    pub fn log(&self, number: Option<usize>, commit: Option<&str>) -> DoltResult<Vec<Commit>> {
        let rows = self
            .sql(&SqlOptions::query(log_query(number, commit), ResultFormat::Json))?
            .unwrap_or_default();
        Ok(fold_log_rows(&rows)?)
    }

    /// raw diff output
    pub fn diff(&self, options: &DiffOptions) -> DoltResult<Vec<String>> {
        let args = options.to_args()?;
        self.execute(&args)
    }

    /// raw blame output
    pub fn blame(&self, table: &str, rev: Option<&str>) -> DoltResult<Vec<String>> {
        let mut args = vec!["blame".to_string()];
        args.extend(rev.map(str::to_string));
        args.push(checked_name("table", table)?);
        self.execute(&args)
    }

    // --- remotes ---

    pub fn remotes(&self) -> DoltResult<Vec<Remote>> {
        let lines = self.run(&["remote", "--verbose"])?;
        Ok(parse_remotes(&lines)?)
    }

    pub fn remote_add(&self, name: &str, url: &str) -> DoltResult<()> {
        let name = checked_name("remote", name)?;
        self.run(&["remote", "add", name.as_str(), url])?;
        Ok(())
    }

    pub fn remote_remove(&self, name: &str) -> DoltResult<()> {
        let name = checked_name("remote", name)?;
        self.run(&["remote", "remove", name.as_str()])?;
        Ok(())
    }

    pub fn push(&self, remote: &str, refspec: Option<&str>, set_upstream: bool, force: bool) -> DoltResult<()> {
        let mut args = vec!["push".to_string()];
        if set_upstream {
            args.push("--set-upstream".to_string());
        }
        if force {
            args.push("--force".to_string());
        }
        args.push(remote.to_string());
        args.extend(refspec.map(str::to_string));
        self.execute(&args)?;
        Ok(())
    }

    pub fn pull(&self, remote: &str) -> DoltResult<()> {
        self.run(&["pull", remote])?;
        Ok(())
    }

    pub fn fetch<S: AsRef<str>>(&self, remote: &str, refspecs: &[S], force: bool) -> DoltResult<()> {
        let mut args = vec!["fetch".to_string()];
        if force {
            args.push("--force".to_string());
        }
        args.push(remote.to_string());
        args.extend(refspecs.iter().map(|r| r.as_ref().to_string()));
        self.execute(&args)?;
        Ok(())
    }

    // --- credentials ---

    /// Create a key pair. The binary prints exactly two lines.
    pub fn creds_new(&self) -> DoltResult<()> {
        let lines: Vec<String> = self
            .run(&["creds", "new"])?
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect();
        if lines.len() != 2 {
            return Err(ParseError::unrecognized("creds new", &lines).into());
        }
        for line in &lines {
            info!("{}", line);
        }
        Ok(())
    }

    pub fn creds_rm(&self, public_key: &str) -> DoltResult<()> {
        let lines = self.run(&["creds", "rm", public_key])?;
        if lines.first().is_some_and(|l| l.starts_with("failed")) {
            error!("{}", lines[0]);
            return Err(ParseError::unrecognized("creds rm", &lines).into());
        }
        Ok(())
    }

    pub fn creds_ls(&self) -> DoltResult<Vec<KeyPair>> {
        let lines = self.run(&["creds", "ls", "--verbose"])?;
        Ok(parse_credentials(&lines)?)
    }

    /// `false` when the endpoint rejects the credentials
    pub fn creds_check(&self, endpoint: Option<&str>, creds: Option<&str>) -> DoltResult<bool> {
        let mut args = vec!["creds".to_string(), "check".to_string()];
        if let Some(endpoint) = endpoint {
            args.extend(["--endpoint".to_string(), endpoint.to_string()]);
        }
        if let Some(creds) = creds {
            args.extend(["--creds".to_string(), creds.to_string()]);
        }
        let lines = self.execute(&args)?;
        match lines.iter().position(|l| l.starts_with("error")) {
            Some(index) => {
                error!("{}", lines[index..].join("\n"));
                Ok(false)
            }
            None => Ok(true),
        }
    }

    pub fn creds_use(&self, public_key_id: &str) -> DoltResult<()> {
        let lines = self.run(&["creds", "use", public_key_id])?;
        if lines.first().is_some_and(|l| l.starts_with("error")) {
            error!("{}", lines.join("\n"));
            return Err(ParseError::unrecognized("creds use", &lines).into());
        }
        Ok(())
    }

    pub fn creds_import(&self, _jwk_filename: &Path, _no_profile: bool) -> DoltResult<()> {
        Err(DoltError::NotImplemented("creds import"))
    }

    // --- configuration ---

    /// `dolt config --local`
    pub fn config_local(&self, options: &ConfigOptions) -> DoltResult<BTreeMap<String, String>> {
        let args = options.to_args("--local")?;
        let lines = self.execute(&args)?;
        Ok(parse_config(&lines))
    }

    // --- schema and tables ---

    /// Tables in the working set; `system` lists system tables only, `all`
    /// lists both.
    pub fn ls(&self, system: bool, all: bool) -> DoltResult<Vec<Table>> {
        let mut args = vec!["ls", "--verbose"];
        if all {
            args.push("--all");
        }
        if system {
            args.push("--system");
        }
        let lines = self.run(&args)?;
        Ok(parse_tables(&lines)?)
    }

    /// Schema of `table`, written to `filename` or returned as lines.
    pub fn schema_export(&self, table: &str, filename: Option<&Path>) -> DoltResult<Vec<String>> {
        let mut args = vec!["schema".to_string(), "export".to_string(), checked_name("table", table)?];
        if let Some(filename) = filename {
            args.extend(["--filename".to_string(), filename.display().to_string()]);
        }
        self.execute(&args)
    }

    pub fn schema_import(&self, options: &SchemaImportOptions) -> DoltResult<Vec<String>> {
        let args = options.to_args()?;
        self.execute(&args)
    }

    pub fn schema_show<S: AsRef<str>>(&self, tables: &[S], commit: Option<&str>) -> DoltResult<Vec<String>> {
        let mut args = vec!["schema".to_string(), "show".to_string()];
        args.extend(commit.map(str::to_string));
        for table in tables {
            args.push(checked_name("table", table.as_ref())?);
        }
        self.execute(&args)
    }

    pub fn table_rm<S: AsRef<str>>(&self, tables: &[S]) -> DoltResult<()> {
        if tables.is_empty() {
            return Err(DoltError::precondition("no tables to remove"));
        }
        let mut args = vec!["table".to_string(), "rm".to_string()];
        for table in tables {
            args.push(checked_name("table", table.as_ref())?);
        }
        self.execute(&args)?;
        Ok(())
    }

    pub fn table_import(&self, options: &TableImportOptions) -> DoltResult<()> {
        let args = options.to_args()?;
        self.execute(&args)?;
        Ok(())
    }

    pub fn table_export(&self, options: &TableExportOptions) -> DoltResult<()> {
        let args = options.to_args()?;
        self.execute(&args)?;
        Ok(())
    }

    pub fn table_mv(&self, old_table: &str, new_table: &str, force: bool) -> DoltResult<()> {
        let mut args = vec!["table".to_string(), "mv".to_string()];
        if force {
            args.push("--force".to_string());
        }
        args.push(checked_name("table", old_table)?);
        args.push(checked_name("table", new_table)?);
        self.execute(&args)?;
        Ok(())
    }

    pub fn table_cp(&self, old_table: &str, new_table: &str, commit: Option<&str>, force: bool) -> DoltResult<()> {
        let mut args = vec!["table".to_string(), "cp".to_string()];
        if force {
            args.push("--force".to_string());
        }
        args.extend(commit.map(str::to_string));
        args.push(checked_name("table", old_table)?);
        args.push(checked_name("table", new_table)?);
        self.execute(&args)?;
        Ok(())
    }
}
