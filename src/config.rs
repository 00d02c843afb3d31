//! Configuration for talking to the external binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DoltError, DoltResult};
use crate::exec::SystemRunner;

/// environment variable naming the binary to run
pub const BINARY_ENV: &str = "DOLT_BIN";

/// Client configuration options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DoltConfig {
    /// Path to the engine binary, or a name looked up on `PATH`.
    pub binary: PathBuf,
    /// Echo every command's stdout to the log at debug level.
    pub echo_output: bool,
    /// Branch loads target when none is given.
    pub default_branch: String,
}

impl Default for DoltConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("dolt"),
            echo_output: false,
            default_branch: "master".to_string(),
        }
    }
}

impl DoltConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the binary taken from `DOLT_BIN` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(binary) = std::env::var_os(BINARY_ENV).filter(|v| !v.is_empty()) {
            config.binary = PathBuf::from(binary);
        }
        config
    }

    /// Load from a TOML file. Missing keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> DoltResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| DoltError::configuration(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Set the binary path.
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set echo_output flag.
    pub fn echo_output(mut self, value: bool) -> Self {
        self.echo_output = value;
        self
    }

    /// Set the default load branch.
    pub fn default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    /// runner for the configured binary
    pub fn runner(&self) -> SystemRunner {
        SystemRunner::new(&self.binary)
    }
}
