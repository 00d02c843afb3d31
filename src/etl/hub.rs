//! Loading into a repository that lives on a remote.
//!
//! The local copy is pulled when it exists, otherwise cloned (or fetched
//! with `read-tables` when only some tables are wanted). Loaders then run
//! against it and each branch they return can be pushed back.

use std::path::PathBuf;

use tempfile::TempDir;
use tracing::info;

use crate::error::{DoltError, DoltResult};
use crate::etl::loader::Loader;
use crate::repo::{Client, Dolt};

/// Where a load reads from and writes back to.
#[derive(Debug, Clone)]
pub struct LoadTarget {
    /// remote database to clone when no local copy exists
    pub remote_url: Option<String>,
    pub remote_name: String,
    /// local copy; a temporary directory when unset
    pub dolt_dir: Option<PathBuf>,
    /// fetch only these tables instead of cloning
    pub tables_to_read: Vec<String>,
    pub push: bool,
    /// prepare the repository but run no loaders
    pub dry_run: bool,
}

impl Default for LoadTarget {
    fn default() -> Self {
        Self {
            remote_url: None,
            remote_name: "origin".to_string(),
            dolt_dir: None,
            tables_to_read: Vec::new(),
            push: false,
            dry_run: false,
        }
    }
}

impl LoadTarget {
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            remote_url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Self {
            dolt_dir: Some(dir.into()),
            ..Self::default()
        }
    }
}

/// Open or fetch the target repository.
fn prepare(client: &Client, target: &LoadTarget, dir: PathBuf) -> DoltResult<Dolt> {
    match client.open(&dir) {
        Ok(dolt) => {
            info!(dir = %dir.display(), remote = %target.remote_name, "repository found, pulling");
            dolt.pull(&target.remote_name)?;
            Ok(dolt)
        }
        Err(DoltError::InvalidRepository(_)) => {
            let url = target
                .remote_url
                .as_deref()
                .ok_or_else(|| DoltError::configuration("cannot clone remote data without a remote url"))?;

            if target.tables_to_read.is_empty() {
                info!(url, "cloning remote");
                client.clone_repo(url, Some(dir.as_path()), Some(target.remote_name.as_str()), None)
            } else {
                info!(url, tables = ?target.tables_to_read, "reading tables from remote");
                client.read_tables(url, &client.config().default_branch, &target.tables_to_read, Some(dir.as_path()))
            }
        }
        Err(e) => Err(e),
    }
}

/// Run `loaders` against the target and return the branches they wrote.
pub fn load_to_dolt(client: &Client, loaders: &[Loader], target: &LoadTarget) -> DoltResult<Vec<String>> {
    // removed on return when no directory was given
    let scratch;
    let dir = match &target.dolt_dir {
        Some(dir) => dir.clone(),
        None => {
            scratch = TempDir::new()?;
            scratch.path().to_path_buf()
        }
    };

    let dolt = prepare(client, target, dir)?;
    info!(
        dir = %dolt.root().display(),
        remote = %target.remote_name,
        push = target.push,
        dry_run = target.dry_run,
        "starting load"
    );

    if target.dry_run {
        return Ok(Vec::new());
    }

    let mut branches = Vec::with_capacity(loaders.len());
    for loader in loaders {
        let branch = loader.run(&dolt)?;
        if target.push {
            info!(remote = %target.remote_name, %branch, "pushing");
            dolt.push(&target.remote_name, Some(branch.as_str()), false, false)?;
        }
        branches.push(branch);
    }
    Ok(branches)
}
