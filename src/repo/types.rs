//! Value snapshots produced by the repository handle.
//!
//! None of these are cached or mutated after they are handed out; every call
//! on the handle re-derives them from fresh command output.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::parse::ParseError;

/// Working-set state.
///
/// Each map goes table name -> staged flag. The set is clean exactly when
/// all maps are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub modified_tables: BTreeMap<String, bool>,
    pub added_tables: BTreeMap<String, bool>,
    pub deleted_tables: BTreeMap<String, bool>,
}

impl Status {
    /// a clean working set
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.modified_tables.is_empty() && self.added_tables.is_empty() && self.deleted_tables.is_empty()
    }

    /// every table with a change, staged or not
    pub fn changed_tables(&self) -> Vec<String> {
        self.added_tables
            .keys()
            .chain(self.modified_tables.keys())
            .chain(self.deleted_tables.keys())
            .cloned()
            .collect()
    }

    /// tables whose change is staged for the next commit
    pub fn staged_tables(&self) -> Vec<String> {
        self.added_tables
            .iter()
            .chain(self.modified_tables.iter())
            .chain(self.deleted_tables.iter())
            .filter(|(_, staged)| **staged)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// a branch and the commit it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    pub commit_id: String,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.commit_id)
    }
}

/// result of a branch listing: the checked-out branch plus all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchListing {
    pub active: Branch,
    pub branches: Vec<Branch>,
}

impl BranchListing {
    pub fn contains(&self, name: &str) -> bool {
        self.branches.iter().any(|b| b.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.name.as_str()).collect()
    }
}

/// Parent link(s) of a commit.
///
/// Merge commits are discovered while folding an ancestor-edge table, so the
/// second parent is appended after the record already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Parents {
    Root,
    Single(String),
    Merge(String, String),
}

/// a point in history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub ref_id: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub email: String,
    pub message: String,
    pub parents: Parents,
}

impl Commit {
    pub fn is_merge(&self) -> bool {
        matches!(self.parents, Parents::Merge(..))
    }

    /// Record a second parent. Fails once the pair is full; a root commit
    /// has nothing to pair with and is left as is.
    pub fn append_merge_parent(&mut self, other: impl Into<String>) -> Result<(), ParseError> {
        match &self.parents {
            Parents::Merge(..) => Err(ParseError::ParentsFull(self.ref_id.clone())),
            Parents::Root => {
                tracing::warn!(commit = %self.ref_id, "no first parent to pair a merge parent with");
                Ok(())
            }
            Parents::Single(first) => {
                self.parents = Parents::Merge(first.clone(), other.into());
                Ok(())
            }
        }
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} @ {}, {}", self.ref_id, self.author, self.timestamp, self.message)
    }
}

/// a named remote location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remote {
    pub name: String,
    pub url: String,
}

/// A tracked or system table. System tables carry no hash or row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub table_hash: Option<String>,
    pub rows: Option<u64>,
    pub system: bool,
}

impl Table {
    pub fn tracked(name: impl Into<String>, table_hash: impl Into<String>, rows: u64) -> Self {
        Self {
            name: name.into(),
            table_hash: Some(table_hash.into()),
            rows: Some(rows),
            system: false,
        }
    }

    pub fn system(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_hash: None,
            rows: None,
            system: true,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.table_hash, self.rows) {
            (Some(hash), Some(rows)) => write!(f, "{} {} {} rows", self.name, hash, rows),
            _ => write!(f, "{} (system)", self.name),
        }
    }
}

/// an authentication credential known to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyPair {
    pub public_key: String,
    pub key_id: String,
    pub active: bool,
}

/// error type for names passed on the command line (branches, tables, remotes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameError {
    Empty,
    LeadingDash(String),
    InvalidPath(String),
    Whitespace(String),
}

impl fmt::Display for InvalidNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "name cannot be empty"),
            Self::LeadingDash(name) => write!(f, "name cannot start with '-': '{}'", name),
            Self::InvalidPath(name) => write!(f, "invalid path: '{}'", name),
            Self::Whitespace(name) => write!(f, "name cannot contain whitespace: '{}'", name),
        }
    }
}

impl std::error::Error for InvalidNameError {}

/// Validate a name that is passed as a positional argument.
///
/// The binary would read a leading '-' as a flag, so those are refused here.
pub fn validate_name(name: &str) -> Result<(), InvalidNameError> {
    if name.is_empty() {
        return Err(InvalidNameError::Empty);
    }
    if name.starts_with('-') {
        return Err(InvalidNameError::LeadingDash(name.to_string()));
    }
    if name.contains("..") || name.ends_with('/') || name.starts_with('/') {
        return Err(InvalidNameError::InvalidPath(name.to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(InvalidNameError::Whitespace(name.to_string()));
    }
    Ok(())
}
