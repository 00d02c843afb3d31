//! Listings with an active-item marker.
//!
//! `dolt branch --list --verbose` and `dolt creds ls --verbose` both print
//! one entry per line and prefix the current entry with `*`:
//!
//! ```text
//! * master     k8sd3hkr0v1rtb0kbgh1t6dgq2qmn3md  Initialize data repository
//!   feature    0k2q6qu3mqelo21r8sv5ph3o01g5u2an  add users
//! ```

use crate::parse::error::ParseError;
use crate::repo::{Branch, BranchListing, KeyPair};

const ACTIVE_MARKER: char = '*';

/// split the active marker off a listing line
fn strip_active_marker(line: &str) -> (bool, &str) {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix(ACTIVE_MARKER) {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    }
}

fn exactly_one<T>(kind: &'static str, mut active: Vec<T>) -> Result<T, ParseError> {
    match active.len() {
        0 => Err(ParseError::MissingActive(kind)),
        1 => Ok(active.remove(0)),
        count => Err(ParseError::MultipleActive { kind, count }),
    }
}

pub fn parse_branches(lines: &[String]) -> Result<BranchListing, ParseError> {
    let mut branches = Vec::new();
    let mut active = Vec::new();

    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        let (is_active, rest) = strip_active_marker(line);
        let mut fields = rest.split_whitespace();
        let name = fields.next().ok_or_else(|| ParseError::missing("branch", "name", line))?;
        let commit_id = fields
            .next()
            .ok_or_else(|| ParseError::missing("branch", "commit id", line))?;

        let branch = Branch {
            name: name.to_string(),
            commit_id: commit_id.to_string(),
        };
        if is_active {
            active.push(branch.clone());
        }
        branches.push(branch);
    }

    let active = exactly_one("branch", active)?;
    Ok(BranchListing { active, branches })
}

/// An empty credential list is valid; a non-empty one has exactly one
/// active key.
pub fn parse_credentials(lines: &[String]) -> Result<Vec<KeyPair>, ParseError> {
    let mut keys = Vec::new();

    for line in lines.iter().filter(|l| !l.trim().is_empty()) {
        let (active, rest) = strip_active_marker(line);
        let mut fields = rest.split_whitespace();
        let public_key = fields
            .next()
            .ok_or_else(|| ParseError::missing("credential", "public key", line))?;
        let key_id = fields
            .next()
            .ok_or_else(|| ParseError::missing("credential", "key id", line))?;

        keys.push(KeyPair {
            public_key: public_key.to_string(),
            key_id: key_id.to_string(),
            active,
        });
    }

    if !keys.is_empty() {
        let active: Vec<&KeyPair> = keys.iter().filter(|k| k.active).collect();
        exactly_one("credential", active)?;
    }

    Ok(keys)
}
