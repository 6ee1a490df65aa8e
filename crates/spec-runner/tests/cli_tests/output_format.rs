//! Tree and JSON output, exit codes.

use super::{fixtures_dir, spec_runner};
use predicates::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn test_tree_output_for_passing_specs() {
    spec_runner()
        .arg(fixtures_dir().join("passing"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Array\n  it starts empty\n"))
        .stdout(predicate::str::contains("  with two elements\n"))
        .stdout(predicate::str::contains("FAILURES:").not())
        .stdout(predicate::str::contains("=== Summary ===\nFiles: 1\n3 ok, 0 failed, 0 errors."));
}

#[test]
fn test_tree_output_lists_failures() {
    spec_runner()
        .arg(fixtures_dir().join("failing"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILURES:"))
        .stdout(predicate::str::contains("1) AssertError: 5 is not equal to 6"))
        .stdout(predicate::str::contains("trail: Integer > it equals six"))
        .stdout(predicate::str::contains("2) NoMethodError:"))
        .stdout(predicate::str::contains(" FAILED\n"))
        .stdout(predicate::str::contains("1 ok, 1 failed, 1 errors."));
}

#[test]
fn test_failure_locations_only_in_verbose_mode() {
    spec_runner()
        .arg(fixtures_dir().join("failing"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("     at ").not());

    spec_runner()
        .arg(fixtures_dir().join("failing"))
        .arg("--verbose")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("     at "));
}

#[test]
fn test_verbose_prints_per_file_table() {
    spec_runner()
        .arg(fixtures_dir().join("passing"))
        .arg(fixtures_dir().join("failing"))
        .arg("-v")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Spec File"))
        .stdout(predicate::str::contains("Files: 2"))
        .stdout(predicate::str::contains("4 ok, 1 failed, 1 errors."));
}

#[test]
fn test_json_output_schema() -> TestResult {
    let output = spec_runner()
        .arg(fixtures_dir().join("failing"))
        .args(["--format", "json"])
        .output()?;
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let timestamp = json["timestamp"].as_str().unwrap_or_default();
    assert!(timestamp.ends_with('Z'));
    assert_eq!(json["summary"]["ok"], 1);
    assert_eq!(json["summary"]["failed"], 1);
    assert_eq!(json["summary"]["errors"], 1);

    let file = &json["files"][0];
    let path = file["path"].as_str().unwrap_or_default();
    assert!(path.ends_with("numbers.spec.yaml"));
    assert_eq!(file["report"]["root"]["kind"], "context");
    assert_eq!(file["report"]["failures"][0]["class"], "AssertError");
    assert_eq!(file["report"]["failures"][0]["kind"], "failed");
    assert_eq!(file["report"]["failures"][1]["kind"], "errored");
    Ok(())
}

#[test]
fn test_load_error_exits_with_config_error() {
    spec_runner()
        .arg(fixtures_dir().join("broken"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown class 'Nope'"))
        .stdout(predicate::str::is_empty());
}
