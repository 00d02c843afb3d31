//! Plain listings: remotes, tables, config values, version.

use std::collections::BTreeMap;

use crate::parse::error::ParseError;
use crate::repo::{Remote, Table};

const NO_TABLES: &str = "No tables in working set";
const TRACKED_HEADER: &str = "Tables in working set";
const SYSTEM_HEADER: &str = "System tables";

/// `dolt remote --verbose`: `<name> <url> [params]` per line
pub fn parse_remotes(lines: &[String]) -> Result<Vec<Remote>, ParseError> {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            let mut fields = line.split_whitespace();
            let name = fields.next().ok_or_else(|| ParseError::missing("remote", "name", line))?;
            let url = fields.next().ok_or_else(|| ParseError::missing("remote", "url", line))?;
            Ok(Remote {
                name: name.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableSection {
    Start,
    Tracked,
    System,
}

/// `dolt ls --verbose [--system|--all]`
///
/// ```text
/// Tables in working set:
///          users    qtbf2tftmqf0v0f8f7ntdvpkd1dd4isn    12 rows
///
/// System tables:
///          dolt_log
/// ```
pub fn parse_tables(lines: &[String]) -> Result<Vec<Table>, ParseError> {
    let mut tables = Vec::new();
    let mut section = TableSection::Start;

    for raw in lines {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        // headers start in column zero, entries are indented
        let header = !raw.starts_with(char::is_whitespace);
        if header && line.starts_with(NO_TABLES) {
            // nothing tracked, a system section may still follow
            section = TableSection::Tracked;
            continue;
        }
        if header && line.starts_with(SYSTEM_HEADER) {
            section = TableSection::System;
            continue;
        }
        if header && line.starts_with(TRACKED_HEADER) {
            section = TableSection::Tracked;
            continue;
        }

        match section {
            TableSection::Start => return Err(ParseError::OutsideSection(line.to_string())),
            TableSection::Tracked => tables.push(parse_tracked_table(line)?),
            TableSection::System => {
                // non-empty line, so there is a first field
                let name = line.split_whitespace().next().unwrap_or(line);
                tables.push(Table::system(name));
            }
        }
    }

    Ok(tables)
}

fn parse_tracked_table(line: &str) -> Result<Table, ParseError> {
    let mut fields = line.split_whitespace();
    let name = fields.next().ok_or_else(|| ParseError::missing("table", "name", line))?;
    let hash = fields.next().ok_or_else(|| ParseError::missing("table", "hash", line))?;
    let rows = fields
        .next()
        .ok_or_else(|| ParseError::missing("table", "row count", line))?
        .parse::<u64>()
        .map_err(|_| ParseError::invalid("table", "row count", line))?;

    Ok(Table::tracked(name, hash, rows))
}

/// `dolt config --list|--get`: `name = value` lines
pub fn parse_config(lines: &[String]) -> BTreeMap<String, String> {
    lines
        .iter()
        .filter_map(|line| line.split_once(" = "))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// `dolt version`: `dolt version 1.2.3`
pub fn parse_version(lines: &[String]) -> Result<String, ParseError> {
    let first = lines.iter().find(|l| !l.trim().is_empty()).map(String::as_str).unwrap_or("");
    first
        .split_whitespace()
        .nth(2)
        .map(str::to_string)
        .ok_or_else(|| ParseError::missing("version", "version number", first))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_remotes() {
        let remotes = parse_remotes(&lines(
            "origin https://doltremoteapi.dolthub.com/org/repo {}\nbackup file:///tmp/backup\n",
        ))
        .unwrap();
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[0].name, "origin");
        assert_eq!(remotes[0].url, "https://doltremoteapi.dolthub.com/org/repo");
        assert_eq!(remotes[1].name, "backup");

        assert!(matches!(
            parse_remotes(&lines("origin")).unwrap_err(),
            ParseError::MissingField { field: "url", .. }
        ));
    }

    #[test]
    fn test_parse_tables_with_system_section() {
        let tables = parse_tables(&lines(
            "Tables in working set:\n\t users    qtbf2tft    12 rows\n\t orders   8dk3nd0a    0 rows\n\nSystem tables:\n\t dolt_log\n\t dolt_branches\n",
        ))
        .unwrap();

        assert_eq!(tables.len(), 4);
        assert_eq!(tables[0], Table::tracked("users", "qtbf2tft", 12));
        assert_eq!(tables[1].rows, Some(0));
        assert_eq!(tables[2], Table::system("dolt_log"));
        assert!(tables[3].system);
        assert_eq!(tables[3].table_hash, None);
    }

    #[test]
    fn test_no_tables_sentinel() {
        assert!(parse_tables(&lines("No tables in working set\n\n")).unwrap().is_empty());

        let only_system = parse_tables(&lines("No tables in working set\n\nSystem tables:\n\t dolt_log")).unwrap();
        assert_eq!(only_system, vec![Table::system("dolt_log")]);
    }

    #[test]
    fn test_bad_row_count_fails() {
        let err = parse_tables(&lines("Tables in working set:\n\t users  abc  many rows")).unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { field: "row count", .. }));

        let err = parse_tables(&lines("Tables in working set:\n\t users  abc")).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { field: "row count", .. }));
    }

    #[test]
    fn test_table_names_resembling_headers() {
        let tables = parse_tables(&lines(
            "Tables in working set:\n\t Systems  aaaa  3 rows\n\t Tables_archive  cccc  1 rows\n\t users  bbbb  2 rows\n\nSystem tables:\n\t dolt_log\n",
        ))
        .unwrap();

        assert_eq!(
            tables,
            vec![
                Table::tracked("Systems", "aaaa", 3),
                Table::tracked("Tables_archive", "cccc", 1),
                Table::tracked("users", "bbbb", 2),
                Table::system("dolt_log"),
            ]
        );
    }

    #[test]
    fn test_entry_before_header_fails() {
        let err = parse_tables(&lines("users  abc  1 rows")).unwrap_err();
        assert!(matches!(err, ParseError::OutsideSection(_)));
    }

    #[test]
    fn test_parse_config() {
        let config = parse_config(&lines("user.name = Jane Doe\nuser.email = jane@example.com\nnot a pair\n"));
        assert_eq!(config.len(), 2);
        assert_eq!(config["user.name"], "Jane Doe");
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(&lines("dolt version 1.32.4\n")).unwrap(), "1.32.4");
        assert!(parse_version(&lines("dolt")).is_err());
    }
}
