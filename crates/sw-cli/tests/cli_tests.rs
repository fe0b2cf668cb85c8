//! End-to-end tests for the `sw` binary against a file-backed DuckDB

use std::fs;
use std::path::Path;
use std::process::Command;
use sw_db::{Database, DuckDbBackend};
use tempfile::TempDir;

/// Path to the compiled sw binary
fn sw_bin() -> String {
    env!("CARGO_BIN_EXE_sw").to_string()
}

/// Run `sw` inside `project` and return (stdout, stderr, success).
fn run_sw(project: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(sw_bin())
        .arg("--project-dir")
        .arg(project)
        .args(args)
        .env_remove("SW_CONFIG")
        .env_remove("SW_CONNECTION")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute sw with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

fn write_migration(project: &Path, name: &str, up: &str, down: &str) {
    let dir = project.join("migrations");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{name}.up.sql")), up).unwrap();
    fs::write(dir.join(format!("{name}.down.sql")), down).unwrap();
}

/// Project with a DuckDB file connection and two migrations
fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("stepwise.yml"),
        "table: schema_migrations\nconnections:\n  - database: app.duckdb\n",
    )
    .unwrap();
    write_migration(
        dir.path(),
        "001_users",
        "CREATE TABLE users (id INT, email VARCHAR);",
        "DROP TABLE users;",
    );
    write_migration(
        dir.path(),
        "002_orders",
        "CREATE TABLE orders (id INT, user_id INT);",
        "DROP TABLE orders;",
    );
    dir
}

/// Inspect the project database after the binary has exited
fn with_db<T>(project: &Path, f: impl FnOnce(&DuckDbBackend) -> T) -> T {
    let db = DuckDbBackend::from_path(&project.join("app.duckdb")).unwrap();
    f(&db)
}

fn assert_ok(result: (String, String, bool)) -> String {
    let (stdout, stderr, success) = result;
    assert!(success, "sw failed.\nstdout: {stdout}\nstderr: {stderr}");
    stdout
}

#[test]
fn test_full_lifecycle() {
    let project = sample_project();
    let root = project.path();

    assert_ok(run_sw(root, &["init"]));
    let stdout = assert_ok(run_sw(root, &["apply"]));
    assert!(stdout.contains("applied 001_users"));
    assert!(stdout.contains("applied 002_orders"));

    with_db(root, |db| {
        assert!(db.relation_exists("users").unwrap());
        assert!(db.relation_exists("orders").unwrap());
    });

    let stdout = assert_ok(run_sw(root, &["apply"]));
    assert!(stdout.contains("0 applied, 2 already up to date"));

    let stdout = assert_ok(run_sw(root, &["status", "--output", "json"]));
    let statuses: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(statuses.as_array().unwrap().len(), 2);
    assert_eq!(statuses[0]["name"], "001_users");
    assert_eq!(statuses[0]["state"], "applied");
    assert!(statuses[0]["applied_at"].is_string());

    let stdout = assert_ok(run_sw(root, &["rollback"]));
    assert!(stdout.contains("rolled back 002_orders"));
    with_db(root, |db| {
        assert!(db.relation_exists("users").unwrap());
        assert!(!db.relation_exists("orders").unwrap());
    });

    let stdout = assert_ok(run_sw(root, &["status"]));
    assert!(stdout.contains("002_orders"));
    assert!(stdout.contains("pending"));
}

#[test]
fn test_init_twice_fails() {
    let project = sample_project();
    assert_ok(run_sw(project.path(), &["init"]));
    let (_, stderr, success) = run_sw(project.path(), &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to initialize ledger"), "{stderr}");
}

#[test]
fn test_apply_refuses_unpaired_files() {
    let project = sample_project();
    let root = project.path();
    fs::write(root.join("migrations/003_extra.up.sql"), "CREATE TABLE extra (id INT);").unwrap();
    assert_ok(run_sw(root, &["init"]));

    let (_, stderr, success) = run_sw(root, &["apply"]);
    assert!(!success);
    assert!(
        stderr.contains("could not find reverse migration for 003_extra.up.sql"),
        "{stderr}"
    );
    with_db(root, |db| assert!(!db.relation_exists("users").unwrap()));
}

#[test]
fn test_failed_apply_then_resolve() {
    let project = sample_project();
    let root = project.path();
    write_migration(root, "003_broken", "CREATE TABLEE nope (id INT);", "SELECT 1;");
    assert_ok(run_sw(root, &["init"]));

    let (stdout, stderr, success) = run_sw(root, &["apply"]);
    assert!(!success);
    assert!(stdout.contains("applied 002_orders"));
    assert!(stderr.contains("003_broken"), "{stderr}");

    let stdout = assert_ok(run_sw(root, &["status"]));
    assert!(stdout.contains("failed:"), "{stdout}");

    let (_, _, success) = run_sw(root, &["validate"]);
    assert!(!success);

    write_migration(root, "003_broken", "CREATE TABLE fixed (id INT);", "DROP TABLE fixed;");
    assert_ok(run_sw(root, &["resolve", "003_broken"]));
    assert_ok(run_sw(root, &["apply"]));
    assert_ok(run_sw(root, &["validate"]));
    with_db(root, |db| assert!(db.relation_exists("fixed").unwrap()));
}

#[test]
fn test_validate_reports_drift() {
    let project = sample_project();
    let root = project.path();
    assert_ok(run_sw(root, &["init"]));
    assert_ok(run_sw(root, &["apply"]));

    write_migration(
        root,
        "001_users",
        "CREATE TABLE users (id BIGINT, email VARCHAR);",
        "DROP TABLE users;",
    );
    let (stdout, stderr, success) = run_sw(root, &["validate"]);
    assert!(!success);
    assert!(stdout.contains("✗ 001_users"));
    assert!(stdout.contains("✓ 002_orders"));
    assert!(stderr.contains("failed to reconcile upward migration query"), "{stderr}");
}

#[test]
fn test_rollback_multiple_steps() {
    let project = sample_project();
    let root = project.path();
    assert_ok(run_sw(root, &["init"]));
    assert_ok(run_sw(root, &["apply"]));

    let stdout = assert_ok(run_sw(root, &["rollback", "--steps", "5"]));
    assert!(stdout.contains("rolled back 002_orders"));
    assert!(stdout.contains("rolled back 001_users"));

    let stdout = assert_ok(run_sw(root, &["rollback"]));
    assert!(stdout.contains("Nothing to roll back"));
}

#[test]
fn test_new_creates_pair() {
    let project = sample_project();
    let root = project.path();
    let stdout = assert_ok(run_sw(root, &["new", "add email index"]));
    assert!(stdout.contains("_add_email_index.up.sql"));

    let created: Vec<String> = fs::read_dir(root.join("migrations"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.contains("add_email_index"))
        .collect();
    assert_eq!(created.len(), 2);
}

#[test]
fn test_check_reports_missing_ledger() {
    let project = sample_project();
    let stdout = assert_ok(run_sw(project.path(), &["check"]));
    assert!(stdout.contains("Connection 'default' (duckdb) is reachable"));
    assert!(stdout.contains("run `sw init`"));
}

#[test]
fn test_unknown_connection_falls_back_to_default() {
    let project = sample_project();
    let stdout = assert_ok(run_sw(project.path(), &["--connection", "nope", "check"]));
    assert!(stdout.contains("Connection 'default' (duckdb) is reachable"), "{stdout}");
}

#[test]
fn test_unknown_connection_without_default() {
    let project = sample_project();
    std::fs::write(
        project.path().join("stepwise.yml"),
        "connections:\n  - connection_name: reporting\n    database: r.duckdb\n",
    )
    .unwrap();
    let (_, stderr, success) = run_sw(project.path(), &["--connection", "nope", "check"]);
    assert!(!success);
    assert!(stderr.contains("Unknown connection 'nope'"), "{stderr}");
    assert!(stderr.contains("Configured connections: reporting"), "{stderr}");
}

#[test]
fn test_missing_config() {
    let dir = TempDir::new().unwrap();
    let (_, stderr, success) = run_sw(dir.path(), &["status"]);
    assert!(!success);
    assert!(stderr.contains("Config file not found"), "{stderr}");
}
