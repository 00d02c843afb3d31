//! End-to-end loads against an in-memory stand-in for the binary.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use doltpipe::etl::{dolt_loader, Loader};
use doltpipe::exec::{scratch_repo, RawOutput, ScriptedRunner};
use doltpipe::read::read_rows;
use doltpipe::repo::{BranchOptions, Dolt, MergeOptions, SchemaImportOptions, TableImportOptions};
use doltpipe::write::{CsvText, ImportMode, Rows, TableWriter};
use doltpipe::{DoltError, DoltResult};

/// Branch, working-set and table state of the fake repository.
struct Engine {
    active: String,
    branches: Vec<String>,
    dirty: bool,
    tables: BTreeMap<String, String>,
    commits: Vec<(String, String)>,
    /// commits on this branch exit nonzero
    reject_commits_on: Option<String>,
}

impl Engine {
    fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            active: "master".to_string(),
            branches: vec!["master".to_string()],
            dirty: false,
            tables: BTreeMap::new(),
            commits: Vec::new(),
            reject_commits_on: None,
        }))
    }
}

fn fake(engine: &Arc<Mutex<Engine>>) -> ScriptedRunner {
    let e = engine.clone();
    let listing = move |_: &[String]| {
        let e = e.lock();
        let text: String = e
            .branches
            .iter()
            .map(|b| format!("{} {}  abcd1234  message\n", if *b == e.active { "*" } else { " " }, b))
            .collect();
        RawOutput::success(text)
    };

    let e = engine.clone();
    let create = move |args: &[String]| {
        e.lock().branches.push(args[1].clone());
        RawOutput::success("")
    };

    let e = engine.clone();
    let checkout = move |args: &[String]| {
        let mut e = e.lock();
        if !e.branches.contains(&args[1]) {
            return RawOutput::failure(format!("error: could not find {}", args[1]), 1);
        }
        e.active = args[1].clone();
        RawOutput::success("")
    };

    let e = engine.clone();
    let status = move |_: &[String]| {
        let e = e.lock();
        if e.dirty {
            RawOutput::success(format!(
                "On branch {}\nChanges not staged for commit:\n\tmodified:       users\n",
                e.active
            ))
        } else {
            RawOutput::success(format!("On branch {}\nnothing to commit, working tree clean\n", e.active))
        }
    };

    let e = engine.clone();
    let ls = move |_: &[String]| {
        let e = e.lock();
        if e.tables.is_empty() {
            return RawOutput::success("No tables in working set\n");
        }
        let mut text = String::from("Tables in working set:\n");
        for (name, csv) in &e.tables {
            text.push_str(&format!("\t {}  qtbf2tftmqf0v0f8f7ntdvpkd1dd4isn  {} rows\n", name, csv.lines().count().saturating_sub(1)));
        }
        RawOutput::success(text)
    };

    let e = engine.clone();
    let import = move |args: &[String]| {
        let table = args[args.len() - 2].clone();
        if table == "broken" {
            return RawOutput::failure("error: bad input", 1);
        }
        let staged = std::fs::read_to_string(&args[args.len() - 1]).unwrap();
        let mut e = e.lock();
        if e.tables.get(&table) != Some(&staged) {
            e.tables.insert(table, staged);
            e.dirty = true;
        }
        RawOutput::success("Import completed successfully.")
    };

    let e = engine.clone();
    let commit = move |args: &[String]| {
        let mut e = e.lock();
        if e.reject_commits_on.as_ref() == Some(&e.active) {
            return RawOutput::failure("error: commit rejected by hook", 2);
        }
        e.dirty = false;
        let entry = (e.active.clone(), args[2].clone());
        e.commits.push(entry);
        RawOutput::success("")
    };

    let e = engine.clone();
    let sql = move |args: &[String]| {
        let query = &args[2];
        let table = query.split('`').nth(1).unwrap_or_default();
        RawOutput::success(e.lock().tables.get(table).cloned().unwrap_or_default())
    };

    ScriptedRunner::new()
        .on_with(&["branch", "--list"], listing)
        .on_with(&["branch"], create)
        .on_with(&["checkout"], checkout)
        .on_with(&["status"], status)
        .on_with(&["ls"], ls)
        .on_with(&["table", "import"], import)
        .on(&["add"], "")
        .on_with(&["commit"], commit)
        .on_with(&["sql"], sql)
}

fn setup() -> (tempfile::TempDir, Dolt, Arc<ScriptedRunner>, Arc<Mutex<Engine>>) {
    let dir = scratch_repo().unwrap();
    let engine = Engine::new();
    let runner = Arc::new(fake(&engine));
    let dolt = Dolt::with_runner(dir.path(), runner.clone()).unwrap();
    (dir, dolt, runner, engine)
}

fn users() -> TableWriter {
    TableWriter::new("users", CsvText("id,name\n1,Alice\n2,Bob\n".to_string()))
        .primary_key(["id"])
        .import_mode(ImportMode::Create)
}

#[test]
fn test_load_on_other_branch_restores_original() {
    let (_dir, dolt, runner, engine) = setup();

    let branch = dolt_loader([users()], true, "load users", "feature").run(&dolt).unwrap();

    assert_eq!(branch, "feature");
    assert_eq!(dolt.branches().unwrap().active.name, "master");
    assert_eq!(runner.calls_to(&["branch", "feature"]), 1);

    let engine = engine.lock();
    assert_eq!(engine.commits, vec![("feature".to_string(), "load users".to_string())]);
}

#[test]
fn test_failed_writer_still_restores_branch() {
    let (_dir, dolt, runner, engine) = setup();
    let broken = TableWriter::new("broken", CsvText("id\n1\n".to_string())).import_mode(ImportMode::Update);

    let err = Loader::new("load")
        .branch("feature")
        .writer(users())
        .writer(broken)
        .run(&dolt)
        .unwrap_err();

    assert_eq!(err.exit_code(), Some(1));
    assert_eq!(engine.lock().active, "master");
    assert_eq!(runner.calls_to(&["commit"]), 0);
    // the first writer's change stays in the working set
    assert!(engine.lock().dirty);
}

#[test]
fn test_failed_commit_still_restores_branch() {
    let (_dir, dolt, runner, engine) = setup();
    engine.lock().reject_commits_on = Some("feature".to_string());

    let err = dolt_loader([users()], true, "load users", "feature").run(&dolt).unwrap_err();

    match &err {
        DoltError::Process(failure) => {
            assert_eq!(failure.exit_code, 2);
            assert_eq!(failure.args[0], "commit");
        }
        other => panic!("expected a process failure, got {other:?}"),
    }
    assert_eq!(runner.calls_to(&["commit"]), 1);

    let engine = engine.lock();
    assert_eq!(engine.active, "master");
    assert!(engine.commits.is_empty());
    assert!(engine.dirty);
}

#[test]
fn test_unchanged_data_skips_commit() {
    let (_dir, dolt, runner, engine) = setup();

    dolt_loader([users()], true, "first", "master").run(&dolt).unwrap();
    assert_eq!(engine.lock().commits.len(), 1);

    let again = users().import_mode(ImportMode::Update);
    dolt_loader([again], true, "second", "master").run(&dolt).unwrap();

    assert!(dolt.status().unwrap().is_clean());
    assert_eq!(runner.calls_to(&["commit"]), 1);
}

#[test]
fn test_rows_round_trip() {
    let (_dir, dolt, _runner, _engine) = setup();
    let rows = vec![
        BTreeMap::from([("id".to_string(), json!(2)), ("name".to_string(), json!("Bob"))]),
        BTreeMap::from([("id".to_string(), json!(1)), ("name".to_string(), json!("Alice"))]),
    ];

    let writer = TableWriter::new("users", Rows(rows)).primary_key(["id"]).import_mode(ImportMode::Create);
    Loader::new("rows").writer(writer).run(&dolt).unwrap();

    let mut read = read_rows(&dolt, "users", None).unwrap();
    read.sort_by_key(|row| row["id"].as_str().map(str::to_string));
    let names: Vec<&Value> = read.iter().map(|row| &row["name"]).collect();
    assert_eq!(names, vec![&json!("Alice"), &json!("Bob")]);
    assert_eq!(read[0]["id"], json!("1"));
}

#[test]
fn test_auto_mode_creates_then_updates() {
    let (_dir, dolt, runner, _engine) = setup();

    let first = TableWriter::new("users", CsvText("id\n1\n".to_string())).primary_key(["id"]);
    first.write(&dolt).unwrap();
    let second = TableWriter::new("users", CsvText("id\n1\n2\n".to_string()));
    second.write(&dolt).unwrap();

    let imports: Vec<String> = runner
        .calls()
        .into_iter()
        .filter(|c| c.starts_with(&["table".to_string(), "import".to_string()]))
        .map(|c| c[2].clone())
        .collect();
    assert_eq!(imports, vec!["--create-table", "--update-table"]);
}

#[test]
fn test_cross_branch_without_commit_rejected() {
    let (_dir, dolt, runner, _engine) = setup();

    let err = dolt_loader([users()], false, "load", "feature").run(&dolt).unwrap_err();

    assert!(matches!(err, DoltError::Configuration(_)));
    assert_eq!(runner.calls_to(&["checkout"]), 0);
    assert_eq!(runner.calls_to(&["table", "import"]), 0);
}

#[test]
fn test_closure_writers() {
    let (_dir, dolt, _runner, engine) = setup();
    let writer = |dolt: &Dolt| -> DoltResult<String> { users().write(dolt) };

    Loader::new("closure").writer(writer).run(&dolt).unwrap();
    assert_eq!(engine.lock().commits.len(), 1);
}

#[test]
fn test_conflicting_flags_never_spawn() {
    let dir = scratch_repo().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let dolt = Dolt::with_runner(dir.path(), runner.clone()).unwrap();

    let branch = BranchOptions {
        name: Some("feature".to_string()),
        delete: true,
        rename: true,
        ..BranchOptions::default()
    };
    assert!(matches!(dolt.branch(&branch), Err(DoltError::Precondition(_))));

    let merge = MergeOptions { squash: true, no_ff: true };
    assert!(matches!(dolt.merge("feature", "m", merge), Err(DoltError::Precondition(_))));

    let mut schema = SchemaImportOptions::create("users", "users.csv", vec!["id".to_string()]);
    schema.replace = true;
    assert!(matches!(dolt.schema_import(&schema), Err(DoltError::Precondition(_))));

    let mut import = TableImportOptions::new("users", "users.csv");
    import.update_table = true;
    import.create_table = true;
    import.pk = vec!["id".to_string()];
    assert!(matches!(dolt.table_import(&import), Err(DoltError::Precondition(_))));

    let no_key = TableWriter::new("users", CsvText(String::new())).import_mode(ImportMode::Create);
    assert!(matches!(no_key.write(&dolt), Err(DoltError::Configuration(_))));

    let transactional = Loader::new("load").transaction_mode(true);
    assert!(matches!(transactional.run(&dolt), Err(DoltError::NotImplemented(_))));

    assert_eq!(runner.call_count(), 0);
}
