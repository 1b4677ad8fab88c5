//! End-to-end CLI tests for the `tally` binary.
//!
//! These run the binary as a subprocess via `assert_cmd` and cover
//! everything that works without a tracker: help, completions, stored
//! mappings, configuration loading and its failure modes.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const TALLY_VARS: [&str; 7] = [
    "TALLY_DIR",
    "TALLY_CONFIG",
    "TALLY_TRACKER__SERVER",
    "TALLY_TRACKER__USER",
    "TALLY_TRACKER__API_TOKEN",
    "TALLY_MAPPINGS__DIR",
    "RUST_LOG",
];

/// A `tally` command isolated from the caller's environment, run in `dir`.
fn tally(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("tally").unwrap();
    for var in TALLY_VARS {
        cmd.env_remove(var);
    }
    cmd.env("TALLY_DIR", dir.join(".tally")).current_dir(dir);
    cmd
}

const MAPPING: &str = r#"{
  "project_key": "PRJ",
  "Epic": {"type_id": "10000", "estimation_key": "customfield_10016"},
  "Story": {"type_id": "10001", "estimation_key": "customfield_10016"},
  "Task": {"type_id": "10002", "estimation_key": "customfield_10016"},
  "Subtask": {"type_id": "10003", "estimation_key": "customfield_10020"},
  "Bug": {"type_id": "10004", "estimation_key": "customfield_10016"}
}"#;

fn write_config(dir: &Path, yaml: &str) {
    let tally_dir = dir.join(".tally");
    fs::create_dir_all(&tally_dir).unwrap();
    fs::write(tally_dir.join("config.yaml"), yaml).unwrap();
}

// ---------------------------------------------------------------------------
// Help, version, completion
// ---------------------------------------------------------------------------

#[test]
fn help_lists_rollup_commands() {
    let tmp = TempDir::new().unwrap();
    tally(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("epic"))
        .stdout(predicate::str::contains("initiative"))
        .stdout(predicate::str::contains("release"));
}

#[test]
fn version_json() {
    let tmp = TempDir::new().unwrap();
    let output = tally(tmp.path()).args(["version", "--json"]).output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn bash_completion_mentions_binary() {
    let tmp = TempDir::new().unwrap();
    tally(tmp.path())
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tally"));
}

// ---------------------------------------------------------------------------
// Mappings
// ---------------------------------------------------------------------------

#[test]
fn mapping_show_from_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("mappings");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("PRJ_config.json"), MAPPING).unwrap();

    tally(tmp.path())
        .args(["mapping", "show", "PRJ", "--from"])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Subtask"))
        .stdout(predicate::str::contains("customfield_10020"));

    let output = tally(tmp.path())
        .args(["--json", "mapping", "show", "PRJ", "--from"])
        .arg(&dir)
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["project_key"], "PRJ");
    assert_eq!(json["Bug"]["estimation_key"], "customfield_10016");
}

#[test]
fn mapping_show_uses_configured_directory() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("stored");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("PRJ_config.json"), MAPPING).unwrap();
    write_config(tmp.path(), &format!("mappings:\n  dir: {}\n", dir.display()));

    tally(tmp.path())
        .args(["mapping", "show", "PRJ"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10003"));
}

#[test]
fn mapping_show_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    tally(tmp.path())
        .args(["mapping", "show", "XYZ", "--from"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no mapping for XYZ"));
}

#[test]
fn incomplete_mapping_file_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("PRJ_config.json"),
        r#"{"project_key": "PRJ", "Epic": {"type_id": "1", "estimation_key": "f"}}"#,
    )
    .unwrap();
    tally(tmp.path())
        .args(["mapping", "show", "PRJ", "--from"])
        .arg(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read mapping"))
        .stderr(predicate::str::contains("no estimate field for: Task, Story, Subtask, Bug"));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn rollup_without_credentials_fails_cleanly() {
    let tmp = TempDir::new().unwrap();
    tally(tmp.path())
        .args(["epic", "PRJ-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tracker.server"));
}

#[test]
fn json_errors_are_objects() {
    let tmp = TempDir::new().unwrap();
    let output = tally(tmp.path())
        .args(["--json", "release", "1.0"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert!(json["error"].as_str().unwrap().contains("not configured"));
}

#[test]
fn config_show_masks_token_and_merges_env() {
    let tmp = TempDir::new().unwrap();
    write_config(
        tmp.path(),
        "tracker:\n  server: https://example.atlassian.net\n  user: me@example.com\n  api_token: s3cret\n",
    );

    tally(tmp.path())
        .env("TALLY_CONFIDENCE__STORY_POINT_WEIGHT_CEILING", "40")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://example.atlassian.net"))
        .stdout(predicate::str::contains("story_point_weight_ceiling: 40"))
        .stdout(predicate::str::contains("s3cret").not());
}

#[test]
fn explicit_missing_config_is_an_error() {
    let tmp = TempDir::new().unwrap();
    tally(tmp.path())
        .args(["--config", "nope.yaml", "config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn invalid_due_month_is_rejected_by_parser() {
    let tmp = TempDir::new().unwrap();
    tally(tmp.path())
        .args(["initiative", "INIT-1", "--due-month", "March"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM"));
}
