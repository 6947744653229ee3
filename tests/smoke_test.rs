//! Smoke tests for the gos CLI.
//!
//! These tests verify basic CLI functionality:
//! - `gos --version` outputs version info
//! - `gos --help` outputs help text
//! - errors are reported as JSON on stderr with a failing exit code

mod common;

use assert_cmd::Command;
use common::TestEnv;
use predicates::prelude::*;

/// Get a Command for the gos binary.
fn gos() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gos"))
}

#[test]
fn test_version_flag() {
    gos()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gos"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    gos()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("today"))
        .stdout(predicate::str::contains("sweep"));
}

#[test]
fn test_project_help() {
    gos()
        .args(["project", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("show"));
}

#[test]
fn test_invalid_command() {
    gos()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_empty_store_plan_is_json() {
    let env = TestEnv::new();
    let plan = env.json(&["today", "--date", "2030-01-01"]);
    assert_eq!(plan["date"], "2030-01-01");
    assert_eq!(plan["projects"].as_array().unwrap().len(), 0);
    assert!(plan.get("total_daily_minutes").is_none());
}

#[test]
fn test_not_found_error_is_json() {
    let env = TestEnv::new();
    env.gos()
        .args(["project", "show", "gp-ffffff"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains(r#""error":"Not found: Project not found: gp-ffffff""#))
        .stderr(predicate::str::contains(r#""recoverable":false"#));
}

#[test]
fn test_human_errors() {
    let env = TestEnv::new();
    env.gos()
        .args(["-H", "milestone", "complete", "gm-ffffff"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: Not found"));
}
