//! Commit history.
//!
//! History is read through SQL as a flat (commit, parent) edge table joined
//! with commit metadata. A merge commit shows up once per parent, so the
//! rows are folded back into one record per commit in first-seen order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::parse::error::ParseError;
use crate::parse::result::ResultSet;
use crate::repo::{Commit, Parents};

/// build the ancestor-join query, newest first
pub fn log_query(number: Option<usize>, commit: Option<&str>) -> String {
    let mut query = String::from(
        "SELECT dc.`commit_hash`, dca.`parent_hash`, `committer`, `email`, `date`, `message` \
         FROM dolt_commits AS dc \
         LEFT OUTER JOIN dolt_commit_ancestors AS dca ON dc.commit_hash = dca.commit_hash",
    );

    if let Some(commit) = commit {
        query.push_str(&format!(" WHERE dc.`commit_hash`='{}'", commit.replace('\'', "''")));
    }
    query.push_str(" ORDER BY `date` DESC");
    if let Some(number) = number {
        query.push_str(&format!(" LIMIT {}", number));
    }
    query
}

fn text(row: &BTreeMap<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn required(row: &BTreeMap<String, Value>, column: &'static str) -> Result<String, ParseError> {
    text(row, column).ok_or_else(|| ParseError::missing("log", column, &format!("{row:?}")))
}

/// Parse the engine's datetime rendering.
///
/// Accepts RFC 3339, `2021-03-04 21:44:51.123 +0000 UTC` and naive
/// `2021-03-04 21:44:51.123` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let without_zone_name = raw.trim_end_matches(" UTC");
    if let Ok(ts) = DateTime::parse_from_str(without_zone_name, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(ts.with_timezone(&Utc));
    }

    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Fold ancestor rows into commits.
pub fn fold_log_rows(rows: &ResultSet) -> Result<Vec<Commit>, ParseError> {
    let mut commits: Vec<Commit> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for row in rows.iter() {
        let ref_id = required(row, "commit_hash")?;
        let parent = text(row, "parent_hash").filter(|p| !p.is_empty());

        if let Some(&index) = seen.get(&ref_id) {
            if let Some(parent) = parent {
                commits[index].append_merge_parent(parent)?;
            }
            continue;
        }

        let date = required(row, "date")?;
        let timestamp = parse_timestamp(&date).ok_or_else(|| ParseError::invalid("log", "date", &date))?;

        seen.insert(ref_id.clone(), commits.len());
        commits.push(Commit {
            ref_id,
            timestamp,
            author: required(row, "committer")?,
            email: text(row, "email").unwrap_or_default(),
            message: text(row, "message").unwrap_or_default(),
            parents: parent.map(Parents::Single).unwrap_or(Parents::Root),
        });
    }

    Ok(commits)
}
