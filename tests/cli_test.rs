//! Integration tests for the CLI binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn setup_project(plan: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("belay.yml"), plan).unwrap();
    temp
}

const SIMPLE_PLAN: &str = r#"
steps:
  - id: make-out
    kind: create_dir
    path: out
  - id: touch-marker
    kind: touch
    path: out/marker.txt
    after: [make-out]
"#;

const FAILING_PLAN: &str = r#"
steps:
  - id: doomed
    kind: copy
    from: does-not-exist.txt
    to: dest.txt
"#;

#[test]
fn cli_no_args_runs_plan() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_PLAN);
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2 succeeded"));
    assert!(temp.path().join("out/marker.txt").exists());
    Ok(())
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Dependency-aware workflow runner"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_run_dry_run_prints_plan_without_executing() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_PLAN);
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.args(["run", "--dry-run"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Order: make-out, touch-marker"));
    assert!(!temp.path().join("out").exists());
    Ok(())
}

#[test]
fn cli_run_no_plan_fails_with_exit_2() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.arg("run");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No plan found"));
    Ok(())
}

#[test]
fn cli_run_failing_step_exits_1() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(FAILING_PLAN);
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.arg("run");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Run failed at 'doomed'"));
    Ok(())
}

#[test]
fn cli_plan_flag_overrides_default_location() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join("other.yml"), SIMPLE_PLAN)?;
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.args(["run", "--plan", "other.yml"]);
    cmd.assert().success();
    assert!(temp.path().join("out/marker.txt").exists());
    Ok(())
}

#[test]
fn cli_quiet_suppresses_per_step_lines() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_PLAN);
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.args(["--quiet", "run"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("make-out").not())
        .stdout(predicate::str::contains("2 succeeded"));
    Ok(())
}

#[test]
fn cli_graph_shows_edges_and_batches() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_PLAN);
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.arg("graph");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("make-out -> touch-marker (explicit)"))
        .stdout(predicate::str::contains("Batches:"));
    Ok(())
}

#[test]
fn cli_graph_rejects_cyclic_plan() -> Result<(), Box<dyn std::error::Error>> {
    let plan = r#"
steps:
  - id: a
    kind: barrier
    after: [b]
  - id: b
    kind: barrier
    after: [a]
"#;
    let temp = setup_project(plan);
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.arg("graph");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
    Ok(())
}

#[test]
fn cli_schema_prints_json() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.arg("schema");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"steps\""))
        .stdout(predicate::str::contains("allow_failure"));
    Ok(())
}

#[test]
fn cli_history_starts_empty_then_records_runs() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_PLAN);

    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.arg("history");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("No runs recorded yet."));

    let mut run = Command::new(cargo_bin("belay"));
    run.current_dir(temp.path());
    run.arg("run");
    run.assert().success();

    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.arg("history");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("succeeded"))
        .stdout(predicate::str::contains("belay.yml"));
    Ok(())
}

#[test]
fn cli_invalid_command_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.arg("invalid-command");
    cmd.assert().failure();
    Ok(())
}

#[test]
fn cli_debug_flag_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project(SIMPLE_PLAN);
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.args(["--debug", "graph"]);
    cmd.assert().success();
    Ok(())
}

#[test]
fn cli_rejects_malformed_plan() -> Result<(), Box<dyn std::error::Error>> {
    let temp = setup_project("steps: [not, a, step, list]");
    let mut cmd = Command::new(cargo_bin("belay"));
    cmd.current_dir(temp.path());
    cmd.arg("run");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
    Ok(())
}
