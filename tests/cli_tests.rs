//! Integration tests for the flowdef CLI
//!
//! These tests run the actual binary and verify output and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get the binary to test
fn flowdef_cmd() -> Command {
    let mut cmd = Command::cargo_bin("flowdef").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const VALID_YAML: &str = r#"
id: leave-request
version: "1.0"
forms:
  leave:
    type: object
    required: [days]
    properties:
      days: { type: integer, minimum: 1 }
steps:
  ask:
    type: humanTask
    form: leave
    rbac:
      all: [employee]
    next: record
  record:
    type: systemTask
"#;

const INVALID_JSON: &str = r#"{
  "version": "1.0",
  "forms": { "broken": { "type": "banana" } },
  "steps": {
    "ask": { "type": "humanTask", "form": "missing" },
    "odd": { "type": "robotTask" }
  }
}"#;

#[test]
fn test_help_flag() {
    flowdef_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("submit"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_valid_definition() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"))
        .stdout(predicate::str::contains("2 steps, 1 forms"));
}

#[test]
fn test_validate_lists_every_defect() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "bad.json", INVALID_JSON);

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("4 defect(s)"))
        .stdout(predicate::str::contains("id required"))
        .stdout(predicate::str::contains("broken"))
        .stdout(predicate::str::contains("missing"))
        .stdout(predicate::str::contains("robotTask"));
}

#[test]
fn test_validate_json_report() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "bad.json", INVALID_JSON);

    let output = flowdef_cmd()
        .current_dir(dir.path())
        .args(["validate", "--format", "json", file.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let defects = report.as_array().unwrap();
    assert_eq!(defects.len(), 4);
    assert!(defects
        .iter()
        .any(|d| d["kind"] == "reference" && d["entityId"] == "ask"));
}

#[test]
fn test_validate_malformed_file() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "broken.json", "{ not json");

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["validate", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLOW-001"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_validate_missing_file() {
    flowdef_cmd()
        .args(["validate", "/no/such/definition.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLOW-003"));
}

// ============================================================================
// submit
// ============================================================================

#[test]
fn test_submit_accepted_inline_payload() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["submit", file.to_str().unwrap(), "--step", "ask", "--payload", r#"{"days":3}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("accepted"));
}

#[test]
fn test_submit_rejected_payload_file() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);
    let payload = write(&dir, "payload.json", "{}");
    let payload_arg = format!("@{}", payload.display());

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["submit", file.to_str().unwrap(), "--step", "ask", "--payload", &payload_arg])
        .assert()
        .failure()
        .stdout(predicate::str::contains("rejected"))
        .stdout(predicate::str::contains("/days"))
        .stdout(predicate::str::contains("required"));
}

#[test]
fn test_submit_unknown_step() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["submit", file.to_str().unwrap(), "--step", "ghost", "--payload", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLOW-020"));
}

#[test]
fn test_submit_malformed_payload_blames_payload() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["submit", file.to_str().unwrap(), "--step", "ask", "--payload", "{days: 3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLOW-004"))
        .stderr(predicate::str::contains("payload"))
        .stderr(predicate::str::contains("definition format").not());
}

// ============================================================================
// access
// ============================================================================

#[test]
fn test_access_allowed_and_denied() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["access", file.to_str().unwrap(), "--step", "ask", "--role", "employee"])
        .assert()
        .success()
        .stdout(predicate::str::contains("allowed"));

    flowdef_cmd()
        .current_dir(dir.path())
        .args(["access", file.to_str().unwrap(), "--step", "ask", "--role", "guest"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("denied"));
}

// ============================================================================
// convert
// ============================================================================

#[test]
fn test_convert_yaml_to_json() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);

    let output = flowdef_cmd()
        .args(["convert", file.to_str().unwrap(), "--to", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let converted = flowdef::parse(&output.stdout).unwrap();
    let original = flowdef::parse_with(VALID_YAML.as_bytes(), flowdef::Format::Yaml).unwrap();
    assert_eq!(converted, original);
}

// ============================================================================
// config / secrets
// ============================================================================

#[test]
fn test_malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "leave.yaml", VALID_YAML);
    let config = write(&dir, "config.yaml", "db: [unclosed");

    flowdef_cmd()
        .args([
            "--config",
            config.to_str().unwrap(),
            "validate",
            file.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLOW-030"));
}
