//! `--filter` and `spec.config.yaml` handling.

use super::{fixtures_dir, spec_runner};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_filter_keeps_matching_examples() {
    spec_runner()
        .arg(fixtures_dir().join("failing"))
        .args(["--filter", "equals six"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("it is small").not())
        .stdout(predicate::str::contains("0 ok, 1 failed, 0 errors."));
}

#[test]
fn test_filter_matches_context_names() {
    spec_runner()
        .arg(fixtures_dir().join("passing"))
        .args(["--filter", "two elements"])
        .assert()
        .success()
        .stdout(predicate::str::contains("it starts empty").not())
        .stdout(predicate::str::contains("2 ok, 0 failed, 0 errors."));
}

#[test]
fn test_filter_without_matches_succeeds() {
    spec_runner()
        .arg(fixtures_dir().join("failing"))
        .args(["--filter", "no such example"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 ok, 0 failed, 0 errors."));
}

#[test]
fn test_config_patterns_and_format() -> TestResult {
    let output = spec_runner()
        .arg(fixtures_dir().join("configured"))
        .output()?;
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let files = json["files"].as_array().map_or(0, Vec::len);
    assert_eq!(files, 1);
    let path = json["files"][0]["path"].as_str().unwrap_or_default();
    assert!(path.ends_with("hash.yaml"));
    Ok(())
}

#[test]
fn test_cli_format_overrides_config() {
    spec_runner()
        .arg(fixtures_dir().join("configured"))
        .args(["--format", "tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hash\n  it has the name key"))
        .stdout(predicate::str::contains("1 ok, 0 failed, 0 errors."));
}

#[test]
fn test_config_excludes_paths() -> TestResult {
    let dir = TempDir::new()?;
    fs::create_dir_all(dir.path().join("wip"))?;
    fs::write(
        dir.path().join("spec.config.yaml"),
        "exclude-patterns:\n  - \"wip/\"\n",
    )?;
    fs::write(
        dir.path().join("ok.spec.yaml"),
        "describe: ok\nchildren:\n  - it: passes\n    expect:\n      - value: 1\n        to: { eq: 1 }\n",
    )?;
    fs::write(
        dir.path().join("wip/draft.spec.yaml"),
        "describe: draft\nchildren:\n  - it: fails\n    expect:\n      - value: 1\n        to: { eq: 2 }\n",
    )?;

    spec_runner()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Files: 1"))
        .stdout(predicate::str::contains("draft").not());
    Ok(())
}

#[test]
fn test_invalid_config_is_a_config_error() -> TestResult {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("spec.config.yaml"), "colour: false\n")?;
    spec_runner()
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("spec.config.yaml"));
    Ok(())
}
