//! CLI argument tests.

use super::{fixtures_dir, spec_runner};
use predicates::prelude::*;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_arg_help() {
    spec_runner()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Runs YAML behavior specifications"));
}

#[test]
fn test_arg_version() {
    spec_runner()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("spec-runner"));
}

#[test]
fn test_arg_invalid_format() {
    spec_runner()
        .arg(fixtures_dir().join("passing"))
        .args(["--format", "xml"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid format"));
}

#[test]
fn test_arg_format_is_case_insensitive() {
    spec_runner()
        .arg(fixtures_dir().join("passing"))
        .args(["--format", "JSON"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("{"));
}

#[test]
fn test_arg_missing_path() {
    spec_runner()
        .arg("/nonexistent/specs")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Path not found"));
}

#[test]
fn test_arg_directory_without_specs() -> TestResult {
    let dir = TempDir::new()?;
    spec_runner()
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No spec files found"));
    Ok(())
}

#[test]
fn test_arg_single_file() {
    spec_runner()
        .arg(fixtures_dir().join("passing/array.spec.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("3 ok, 0 failed, 0 errors."));
}

#[test]
fn test_arg_default_path_is_current_directory() {
    spec_runner()
        .current_dir(fixtures_dir().join("passing"))
        .assert()
        .success()
        .stdout(predicate::str::contains("array.spec.yaml"));
}
