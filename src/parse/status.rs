//! `dolt status` grammar.
//!
//! ```text
//! On branch master
//! Changes to be committed:
//!   (use "dolt reset <table>..." to unstage)
//!         new table:      users
//! Changes not staged for commit:
//!   (use "dolt add <table>" to update what will be committed)
//!         modified:       orders
//! ```
//!
//! A clean working set prints a sentinel line instead of any section.

use crate::parse::error::ParseError;
use crate::repo::Status;

const CLEAN_SENTINELS: &[&str] = &["nothing to commit", "working tree clean"];

/// which part of the output the current line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Staged,
    Unstaged,
    Untracked,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        if line.starts_with("Changes to be committed") {
            Some(Section::Staged)
        } else if line.starts_with("Changes not staged for commit") {
            Some(Section::Unstaged)
        } else if line.starts_with("Untracked") {
            Some(Section::Untracked)
        } else {
            None
        }
    }

    fn staged(self) -> Option<bool> {
        match self {
            Section::Preamble => None,
            Section::Staged => Some(true),
            Section::Unstaged | Section::Untracked => Some(false),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ChangeKind {
    Modified,
    Added,
    Deleted,
}

fn change_entry(line: &str) -> Option<(ChangeKind, &str)> {
    [
        ("modified:", ChangeKind::Modified),
        ("new table:", ChangeKind::Added),
        ("deleted:", ChangeKind::Deleted),
    ]
    .into_iter()
    .find_map(|(marker, kind)| line.strip_prefix(marker).map(|rest| (kind, rest)))
}

pub fn parse_status(lines: &[String]) -> Result<Status, ParseError> {
    if lines.iter().any(|l| CLEAN_SENTINELS.iter().any(|s| l.contains(s))) {
        return Ok(Status::clean());
    }

    let mut status = Status::default();
    let mut section = Section::Preamble;

    for raw in lines {
        let line = raw.trim();
        if let Some(next) = Section::from_header(line) {
            section = next;
            continue;
        }

        // hints, branch line, blank lines
        let Some((kind, rest)) = change_entry(line) else {
            continue;
        };

        let staged = section
            .staged()
            .ok_or_else(|| ParseError::OutsideSection(line.to_string()))?;

        let table = rest.trim();
        if table.is_empty() {
            return Err(ParseError::missing("status", "table name", line));
        }

        let entries = match kind {
            ChangeKind::Modified => &mut status.modified_tables,
            ChangeKind::Added => &mut status.added_tables,
            ChangeKind::Deleted => &mut status.deleted_tables,
        };
        entries.insert(table.to_string(), staged);
    }

    Ok(status)
}
