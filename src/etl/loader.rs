//! Load orchestration.
//!
//! A [`Loader`] runs a list of writers against one branch and commits the
//! tables they touched. Branch state belongs to the repository, not to us:
//! whatever branch was active before a load is active again after it, even
//! when a writer or the commit fails.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, info_span, warn};
use ulid::Ulid;

use crate::error::{DoltError, DoltResult};
use crate::repo::{BranchOptions, CheckoutOptions, Dolt, SchemaImportOptions};
use crate::write::{read_csv_file, ImportMode, Record, Rows, RowsTransform, StageData, TableWriter};

/// One unit of work inside a load. Returns the table it touched.
pub trait TableWrite: Send + Sync {
    fn write(&self, dolt: &Dolt) -> DoltResult<String>;
}

impl TableWrite for TableWriter {
    fn write(&self, dolt: &Dolt) -> DoltResult<String> {
        TableWriter::write(self, dolt)
    }
}

impl<F> TableWrite for F
where
    F: Fn(&Dolt) -> DoltResult<String> + Send + Sync,
{
    fn write(&self, dolt: &Dolt) -> DoltResult<String> {
        self(dolt)
    }
}

type ReadFn = dyn Fn(&Dolt) -> DoltResult<Vec<Record>> + Send + Sync;

/// Reads rows from the repository, transforms them and writes the result to
/// a derived table.
#[derive(Clone)]
pub struct TableTransformer {
    read: Arc<ReadFn>,
    transform: Arc<RowsTransform>,
    target_table: String,
    target_pk: Vec<String>,
    import_mode: ImportMode,
}

impl TableTransformer {
    pub fn new<R, T>(read: R, target_table: impl Into<String>, transform: T) -> Self
    where
        R: Fn(&Dolt) -> DoltResult<Vec<Record>> + Send + Sync + 'static,
        T: Fn(Vec<Record>) -> Vec<Record> + Send + Sync + 'static,
    {
        Self {
            read: Arc::new(read),
            transform: Arc::new(transform),
            target_table: target_table.into(),
            target_pk: Vec::new(),
            import_mode: ImportMode::Update,
        }
    }

    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_pk = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn import_mode(mut self, mode: ImportMode) -> Self {
        self.import_mode = mode;
        self
    }
}

impl fmt::Debug for TableTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableTransformer")
            .field("target_table", &self.target_table)
            .field("import_mode", &self.import_mode)
            .finish()
    }
}

impl TableWrite for TableTransformer {
    fn write(&self, dolt: &Dolt) -> DoltResult<String> {
        let rows = (self.transform)((self.read)(dolt)?);
        TableWriter::new(self.target_table.clone(), Rows(rows))
            .primary_key(self.target_pk.iter().cloned())
            .import_mode(self.import_mode)
            .write(dolt)
    }
}

/// Creates a branch as a step of a workflow; the branch must not exist yet.
#[derive(Debug, Clone)]
pub struct BranchCreator {
    name: String,
    start_point: Option<String>,
}

impl BranchCreator {
    pub fn new(name: impl Into<String>, start_point: Option<String>) -> Self {
        Self {
            name: name.into(),
            start_point,
        }
    }

    /// create the branch and return its name
    pub fn create(&self, dolt: &Dolt) -> DoltResult<String> {
        if dolt.branches()?.contains(&self.name) {
            return Err(DoltError::precondition(format!("branch {} already exists", self.name)));
        }
        info!(root = %dolt.root().display(), branch = %self.name, start_point = ?self.start_point, "creating branch");

        let mut options = BranchOptions::create(self.name.clone());
        options.start_point = self.start_point.clone();
        dolt.branch(&options)?;
        Ok(self.name.clone())
    }
}

/// `schema import --create` from a file, then optionally commit the table.
///
/// With `transform`, the file's records are rewritten into a staging file
/// first and the schema is inferred from that.
pub fn create_table_from_schema_import(
    dolt: &Dolt,
    table: &str,
    pks: &[String],
    path: &Path,
    transform: Option<&RowsTransform>,
    commit: bool,
    commit_message: Option<&str>,
) -> DoltResult<()> {
    let staging = match transform {
        Some(transform) => {
            let rows = transform(read_csv_file(path)?);
            let mut file = tempfile::Builder::new()
                .prefix(&format!("{}-", Ulid::new()))
                .suffix(".csv")
                .tempfile()?;
            Rows(rows).stage(file.as_file_mut())?;
            Some(file)
        }
        None => None,
    };
    let source = staging.as_ref().map(|f| f.path()).unwrap_or(path);

    let options = SchemaImportOptions::create(table, source.display().to_string(), pks.to_vec());
    dolt.schema_import(&options)?;

    if commit {
        let message = commit_message
            .map(str::to_string)
            .unwrap_or_else(|| format!("Creating table {table}"));
        dolt.add(&[table])?;
        dolt.commit(&message, false, None)?;
    }
    Ok(())
}

/// Writers plus the branch and commit settings they run under.
#[derive(Clone)]
pub struct Loader {
    writers: Vec<Arc<dyn TableWrite>>,
    commit: bool,
    message: String,
    branch: Option<String>,
    transaction_mode: bool,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("writers", &self.writers.len())
            .field("commit", &self.commit)
            .field("message", &self.message)
            .field("branch", &self.branch)
            .finish()
    }
}

impl Loader {
    /// A committing load onto the configured default branch.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            writers: Vec::new(),
            commit: true,
            message: message.into(),
            branch: None,
            transaction_mode: false,
        }
    }

    pub fn writer(mut self, writer: impl TableWrite + 'static) -> Self {
        self.writers.push(Arc::new(writer));
        self
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn commit(mut self, value: bool) -> Self {
        self.commit = value;
        self
    }

    /// All-or-nothing across writers. Not supported; a load with this set
    /// fails before touching the repository.
    pub fn transaction_mode(mut self, value: bool) -> Self {
        self.transaction_mode = value;
        self
    }

    /// Run the load and return the branch written to.
    pub fn run(&self, dolt: &Dolt) -> DoltResult<String> {
        let target = self
            .branch
            .clone()
            .unwrap_or_else(|| dolt.client().config().default_branch.clone());

        let load_id = Ulid::new();
        let span = info_span!("load", %load_id, branch = %target, commit = self.commit);
        let _enter = span.enter();

        if self.transaction_mode {
            return Err(DoltError::NotImplemented("transaction mode"));
        }

        let listing = dolt.branches()?;
        let original = listing.active.name.clone();
        if target != original && !self.commit {
            return Err(DoltError::configuration(format!(
                "writes to {target} from {original} are lost on checkout unless committed"
            )));
        }

        let switched = target != original;
        if switched {
            info!("current branch is {original}, checking out {target}");
            if !listing.contains(&target) {
                info!("{target} does not exist, creating");
                dolt.branch(&BranchOptions::create(target.clone()))?;
            }
            dolt.checkout(&CheckoutOptions::branch(target.clone()))?;
        }

        let outcome = self.write_and_commit(dolt);

        if switched {
            info!("restoring {original}");
            if let Err(restore) = dolt.checkout(&CheckoutOptions::branch(original.clone())) {
                match outcome {
                    Ok(_) => return Err(restore),
                    Err(_) => error!("failed to restore {original}: {restore}"),
                }
            }
        }

        outcome.map(|_| target)
    }

    fn write_and_commit(&self, dolt: &Dolt) -> DoltResult<()> {
        let mut tables = BTreeSet::new();
        for writer in &self.writers {
            tables.insert(writer.write(dolt)?);
        }

        if !self.commit {
            return Ok(());
        }

        if dolt.status()?.is_clean() {
            warn!(root = %dolt.root().display(), "no changes, skipping commit");
            return Ok(());
        }

        let tables: Vec<String> = tables.into_iter().collect();
        info!(root = %dolt.root().display(), ?tables, "committing");
        if !tables.is_empty() {
            dolt.add(&tables)?;
        }
        dolt.commit(&self.message, false, None)
    }
}

/// Loader for `writers` with the given commit settings.
pub fn dolt_loader<I, W>(writers: I, commit: bool, message: impl Into<String>, branch: impl Into<String>) -> Loader
where
    I: IntoIterator<Item = W>,
    W: TableWrite + 'static,
{
    writers
        .into_iter()
        .fold(Loader::new(message).commit(commit).branch(branch), |loader, writer| loader.writer(writer))
}
