//! Integration test for the `ingest_readings` example.
//!
//! Expectation: valid JSONL lines are echoed as `kwh<TAB>device`, malformed
//! lines are reported on stderr with their line number and skipped.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn write_temp_jsonl(name: &str) -> std::path::PathBuf {
    let tmp = std::env::temp_dir().join(format!(
        "heimwatt_core_{name}_{}.jsonl",
        std::process::id()
    ));
    fs::write(
        &tmp,
        r#"{"timestamp":"2024-03-01T12:00:00Z","device_id":"fridge","energy_consumption":1.25}
{"timestamp":"2024-03-01T12:05:00Z","energy_consumption":3}

{"timestamp":"2024-03-01T12:10:00Z","device_id":7,"energy_consumption":0.5}"#,
    )
    .unwrap_or_else(|e| panic!("failed to write temporary JSONL file: {e}"));
    tmp
}

#[test]
fn example_echoes_valid_readings() {
    let path = write_temp_jsonl("valid");
    let mut cmd = Command::new("cargo");
    cmd.args([
        "run",
        "--quiet",
        "--package",
        "heimwatt-core",
        "--example",
        "ingest_readings",
        "--",
        path.to_str()
            .unwrap_or_else(|| panic!("temporary path is not valid UTF-8: {path:?}")),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1.250\tfridge").and(predicate::str::contains("0.500\t7")));
}

#[test]
fn example_reports_rejected_lines() {
    let path = write_temp_jsonl("rejected");
    let mut cmd = Command::new("cargo");
    cmd.args([
        "run",
        "--quiet",
        "--package",
        "heimwatt-core",
        "--example",
        "ingest_readings",
        "--",
        path.to_str()
            .unwrap_or_else(|| panic!("temporary path is not valid UTF-8: {path:?}")),
    ]);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("line 2: Missing expected key in data: 'device_id'"))
        .stderr(predicate::str::contains("2 readings kept"));
}

#[test]
fn example_accepts_stdin() {
    let input = r#"{"timestamp":"2024-03-01","device_id":"a","energy_consumption":2}
not json"#;

    let mut cmd = Command::new("cargo");
    cmd.args([
        "run",
        "--quiet",
        "--package",
        "heimwatt-core",
        "--example",
        "ingest_readings",
    ]);
    cmd.write_stdin(input);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("2.000\ta"))
        .stderr(predicate::str::contains("line 2: Error decoding JSON"));
}
