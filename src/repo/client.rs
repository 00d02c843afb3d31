//! A configured binary that is not yet bound to a repository.
//!
//! Repository-creating operations (`init`, `clone`, `read-tables`) and
//! machine-wide ones (`version`, `config --global`) run here; everything
//! else goes through a [`Dolt`] handle produced by this client.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::DoltConfig;
use crate::error::{DoltError, DoltResult};
use crate::exec::{execute, CommandRunner};
use crate::parse::{parse_config, parse_version};
use crate::repo::handle::{Dolt, REPO_MARKER};
use crate::repo::options::ConfigOptions;

/// Runner plus configuration, shared by every handle it opens.
#[derive(Clone)]
pub struct Client {
    runner: Arc<dyn CommandRunner>,
    config: DoltConfig,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("program", &self.runner.program())
            .field("config", &self.config)
            .finish()
    }
}

impl Client {
    /// client for the binary named in `config`
    pub fn new(config: DoltConfig) -> Self {
        let runner = Arc::new(config.runner());
        Self { runner, config }
    }

    /// client around an explicit runner, with default configuration
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            config: DoltConfig::default(),
        }
    }

    pub fn config(&self) -> &DoltConfig {
        &self.config
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    /// replace the configuration, keeping the runner
    pub fn with_config(mut self, config: DoltConfig) -> Self {
        self.config = config;
        self
    }

    /// run `args` in `cwd`, echoing stdout at debug level when configured
    pub(crate) fn run(&self, args: &[String], cwd: &Path) -> DoltResult<Vec<String>> {
        let lines = execute(self.runner.as_ref(), args, cwd)?;
        if self.config.echo_output {
            for line in &lines {
                debug!("{}", line);
            }
        }
        Ok(lines)
    }

    /// bind to an existing repository
    pub fn open(&self, path: impl AsRef<Path>) -> DoltResult<Dolt> {
        Dolt::bind(path.as_ref().to_path_buf(), self.clone())
    }

    /// Create `dir` if missing, run `init` in it and open the result.
    pub fn init(&self, dir: impl AsRef<Path>) -> DoltResult<Dolt> {
        let dir = dir.as_ref();
        if dir.exists() {
            info!(dir = %dir.display(), "initializing repository in existing directory");
        } else {
            info!(dir = %dir.display(), "creating directory");
            std::fs::create_dir_all(dir)?;
        }

        self.run(&["init".to_string()], dir)?;
        self.open(dir)
    }

    /// Clone `remote_url` into `new_dir`, or into a fresh directory named
    /// after the last URL segment.
    pub fn clone_repo(
        &self,
        remote_url: &str,
        new_dir: Option<&Path>,
        remote: Option<&str>,
        branch: Option<&str>,
    ) -> DoltResult<Dolt> {
        let dir = prepare_target_dir(new_dir, remote_url)?;

        let mut args = vec!["clone".to_string(), remote_url.to_string()];
        if let Some(remote) = remote {
            args.extend(["--remote".to_string(), remote.to_string()]);
        }
        if let Some(branch) = branch {
            args.extend(["--branch".to_string(), branch.to_string()]);
        }
        args.push(dir.display().to_string());

        self.run(&args, &dir)?;
        self.open(&dir)
    }

    /// Fetch `tables` (all when empty) at `committish` into a new local
    /// repository without history.
    pub fn read_tables(
        &self,
        remote_url: &str,
        committish: &str,
        tables: &[String],
        new_dir: Option<&Path>,
    ) -> DoltResult<Dolt> {
        let dir = prepare_target_dir(new_dir, remote_url)?;

        let mut args = vec![
            "read-tables".to_string(),
            "--dir".to_string(),
            dir.display().to_string(),
            remote_url.to_string(),
            committish.to_string(),
        ];
        args.extend(tables.iter().cloned());

        self.run(&args, &dir)?;
        self.open(&dir)
    }

    /// version string of the binary, e.g. `1.2.3`
    pub fn version(&self) -> DoltResult<String> {
        let cwd = std::env::current_dir()?;
        let lines = self.run(&["version".to_string()], &cwd)?;
        Ok(parse_version(&lines)?)
    }

    /// `dolt config --global`
    pub fn config_global(&self, options: &ConfigOptions) -> DoltResult<BTreeMap<String, String>> {
        let args = options.to_args("--global")?;
        let cwd = std::env::current_dir()?;
        let lines = self.run(&args, &cwd)?;
        Ok(parse_config(&lines))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(DoltConfig::from_env())
    }
}

/// Resolve and create the directory a clone lands in.
///
/// An explicit directory must not already hold a repository. An inferred
/// one must not exist at all.
fn prepare_target_dir(new_dir: Option<&Path>, remote_url: &str) -> DoltResult<PathBuf> {
    match new_dir {
        Some(dir) => {
            if dir.join(REPO_MARKER).exists() {
                return Err(DoltError::precondition(format!(
                    "{} is already a repository",
                    dir.display()
                )));
            }
            std::fs::create_dir_all(dir)?;
            // the binary runs inside `dir`, so a relative path would nest
            Ok(dir.canonicalize()?)
        }
        None => {
            let name = remote_url
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| DoltError::precondition(format!("cannot infer a directory from {remote_url}")))?;
            let dir = std::env::current_dir()?.join(name);
            if dir.exists() {
                return Err(DoltError::precondition(format!(
                    "cannot create new directory {}",
                    dir.display()
                )));
            }
            std::fs::create_dir(&dir)?;
            Ok(dir.canonicalize()?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{RawOutput, ScriptedRunner};
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_dir_and_opens() {
        let base = TempDir::new().unwrap();
        let target = base.path().join("fresh");

        let runner = Arc::new(ScriptedRunner::new().on_with(&["init"], {
            let target = target.clone();
            move |_| {
                std::fs::create_dir_all(target.join(".dolt")).unwrap();
                RawOutput::success("Successfully initialized dolt data repository.")
            }
        }));
        let client = Client::with_runner(runner.clone());

        let dolt = client.init(&target).unwrap();
        assert_eq!(dolt.root(), target.as_path());
        assert_eq!(runner.calls_to(&["init"]), 1);
    }

    #[test]
    fn test_clone_into_existing_repo_rejected() {
        let base = TempDir::new().unwrap();
        std::fs::create_dir(base.path().join(".dolt")).unwrap();

        let runner = Arc::new(ScriptedRunner::new());
        let client = Client::with_runner(runner.clone());

        let err = client
            .clone_repo("dolthub/example", Some(base.path()), None, None)
            .unwrap_err();
        assert!(matches!(err, DoltError::Precondition(_)));
        assert_eq!(runner.call_count(), 0);
    }

    #[test]
    fn test_clone_args() {
        let base = TempDir::new().unwrap();
        let target = base.path().join("example");

        let runner = Arc::new(ScriptedRunner::new().on_with(&["clone"], {
            let target = target.clone();
            move |_| {
                std::fs::create_dir_all(target.join(".dolt")).unwrap();
                RawOutput::success("")
            }
        }));
        let client = Client::with_runner(runner.clone());
        client
            .clone_repo("dolthub/example", Some(target.as_path()), Some("upstream"), Some("dev"))
            .unwrap();

        let call = &runner.calls()[0];
        assert_eq!(
            call[..6],
            ["clone", "dolthub/example", "--remote", "upstream", "--branch", "dev"]
        );
        assert_eq!(call[6], target.canonicalize().unwrap().display().to_string());
    }

    #[test]
    fn test_clone_relative_dir_is_absolute() {
        let base = tempfile::Builder::new().tempdir_in(".").unwrap();
        let relative = base.path().join("rel");
        assert!(relative.is_relative());

        let runner = Arc::new(ScriptedRunner::new().on_with(&["clone"], |args| {
            let dir = PathBuf::from(args.last().unwrap());
            std::fs::create_dir_all(dir.join(".dolt")).unwrap();
            RawOutput::success("")
        }));
        let client = Client::with_runner(runner.clone());
        let dolt = client
            .clone_repo("dolthub/example", Some(relative.as_path()), None, None)
            .unwrap();

        let absolute = relative.canonicalize().unwrap();
        let call = &runner.calls()[0];
        assert_eq!(call.last().unwrap(), &absolute.display().to_string());
        assert_eq!(runner.cwds()[0], absolute);
        assert_eq!(dolt.root(), absolute.as_path());
        assert!(!relative.join("rel").exists());
    }

    #[test]
    fn test_read_tables_args() {
        let base = TempDir::new().unwrap();
        let target = base.path().join("snapshot");

        let runner = Arc::new(ScriptedRunner::new().on_with(&["read-tables"], {
            let target = target.clone();
            move |_| {
                std::fs::create_dir_all(target.join(".dolt")).unwrap();
                RawOutput::success("")
            }
        }));
        let client = Client::with_runner(runner.clone());
        client
            .read_tables("dolthub/example", "master", &["users".to_string()], Some(target.as_path()))
            .unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call[0], "read-tables");
        assert_eq!(call[2], target.canonicalize().unwrap().display().to_string());
        assert_eq!(call[3..], ["dolthub/example", "master", "users"]);
    }

    #[test]
    fn test_version_and_global_config() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .on(&["version"], "dolt version 0.26.4\n")
                .on(&["config", "--global", "--list"], "user.name = Jane\nuser.email = jane@example.com\n"),
        );
        let client = Client::with_runner(runner.clone());

        assert_eq!(client.version().unwrap(), "0.26.4");
        let config = client.config_global(&ConfigOptions::list()).unwrap();
        assert_eq!(config["user.email"], "jane@example.com");

        let bad = ConfigOptions {
            list: true,
            add: true,
            ..ConfigOptions::default()
        };
        assert!(client.config_global(&bad).is_err());
        assert_eq!(runner.call_count(), 2);
    }
}
