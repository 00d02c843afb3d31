//! doltpipe - command-line front end
//!
//! Inspect a repository or run a one-file load from the shell.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use doltpipe::etl::Loader;
use doltpipe::repo::{Dolt, ResultFormat, SqlOptions};
use doltpipe::write::{CsvFile, ImportMode, TableWriter};
use doltpipe::{DoltConfig, DoltResult};

/// Inspect a Dolt repository and load tables into it
#[derive(Parser, Debug)]
#[command(name = "doltpipe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Repository directory
    #[arg(long, global = true, default_value = ".")]
    repo: PathBuf,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show working-set status
    Status,
    /// List branches
    Branches,
    /// Show commit history
    Log {
        /// Number of commits
        #[arg(short = 'n', long)]
        number: Option<usize>,
    },
    /// List tables
    Tables {
        /// System tables only
        #[arg(long, conflicts_with = "all")]
        system: bool,
        /// Tracked and system tables
        #[arg(long)]
        all: bool,
    },
    /// List remotes
    Remotes,
    /// Run a query
    Sql {
        query: String,
        /// csv or json
        #[arg(long, default_value = "csv")]
        format: ResultFormat,
    },
    /// Import a CSV file into a table
    Load {
        #[arg(long)]
        table: String,
        #[arg(long)]
        file: PathBuf,
        /// Primary key columns, comma separated
        #[arg(long, value_delimiter = ',')]
        pk: Vec<String>,
        /// create, force_create, replace or update
        #[arg(long)]
        mode: Option<ImportMode>,
        /// Branch to write to
        #[arg(long)]
        branch: Option<String>,
        /// Commit the load
        #[arg(long)]
        commit: bool,
        #[arg(long)]
        message: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> DoltResult<DoltConfig> {
    match path {
        Some(path) => DoltConfig::from_toml_file(path),
        None => Ok(DoltConfig::from_env()),
    }
}

fn run(cli: Cli) -> DoltResult<()> {
    let config = load_config(cli.config.as_ref())?;
    let dolt = Dolt::open_with_config(&cli.repo, config)?;
    let json = cli.json;

    match cli.command {
        Command::Status => {
            let status = dolt.status()?;
            print(json, &status, || {
                if status.is_clean() {
                    println!("working set clean");
                }
                for (label, tables) in [
                    ("new", &status.added_tables),
                    ("modified", &status.modified_tables),
                    ("deleted", &status.deleted_tables),
                ] {
                    for (table, staged) in tables {
                        println!("{:<9} {:<8} {}", label, if *staged { "staged" } else { "" }, table);
                    }
                }
            })
        }
        Command::Branches => {
            let listing = dolt.branches()?;
            print(json, &listing, || {
                for branch in &listing.branches {
                    let marker = if branch.name == listing.active.name { "*" } else { " " };
                    println!("{} {:<24} {}", marker, branch.name, branch.commit_id);
                }
            })
        }
        Command::Log { number } => {
            let commits = dolt.log(number, None)?;
            print(json, &commits, || {
                for commit in &commits {
                    println!("{} {} {} {}", commit.ref_id, commit.timestamp.to_rfc3339(), commit.author, commit.message);
                }
            })
        }
        Command::Tables { system, all } => {
            let tables = dolt.ls(system, all)?;
            print(json, &tables, || {
                for table in &tables {
                    match table.rows {
                        Some(rows) => println!("{:<32} {} rows", table.name, rows),
                        None => println!("{}", table.name),
                    }
                }
            })
        }
        Command::Remotes => {
            let remotes = dolt.remotes()?;
            print(json, &remotes, || {
                for remote in &remotes {
                    println!("{}\t{}", remote.name, remote.url);
                }
            })
        }
        Command::Sql { query, format } => {
            let result = dolt.sql(&SqlOptions::query(query, format))?.unwrap_or_default();
            print(json, &result.rows, || {
                println!("{}", result.columns.join("\t"));
                for row in result.iter() {
                    let cells: Vec<String> = result
                        .columns
                        .iter()
                        .map(|c| match row.get(c) {
                            Some(serde_json::Value::String(s)) => s.clone(),
                            Some(v) => v.to_string(),
                            None => String::new(),
                        })
                        .collect();
                    println!("{}", cells.join("\t"));
                }
            })
        }
        Command::Load {
            table,
            file,
            pk,
            mode,
            branch,
            commit,
            message,
        } => {
            let mut writer = TableWriter::new(table.clone(), CsvFile(file)).primary_key(pk);
            if let Some(mode) = mode {
                writer = writer.import_mode(mode);
            }

            let message = message.unwrap_or_else(|| format!("Loading {table}"));
            let mut loader = Loader::new(message).commit(commit).writer(writer);
            if let Some(branch) = branch {
                loader = loader.branch(branch);
            }

            let branch = loader.run(&dolt)?;
            print(json, &serde_json::json!({ "table": table, "branch": branch }), || {
                println!("loaded {} on {}", table, branch);
            })
        }
    }
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce()) -> DoltResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        text();
    }
    Ok(())
}
