//! End-to-end tests for the profile-variables binary
//!
//! Covers argument parsing, the replay and config subcommands, output
//! destinations and exit codes, using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::tempdir;

// Helper to get a command isolated from the caller's configuration
fn profile_variables_cmd() -> Command {
    let mut cmd = Command::cargo_bin("profile-variables").unwrap();
    for name in [
        "PROFILE_VARIABLES_CONFIG",
        "PROFILE_VARIABLES_RECORD_TASKS",
        "PROFILE_VARIABLES_RECORD_VARS",
        "PROFILE_VARIABLES_RECORD_HOSTS",
        "PROFILE_VARIABLES_MODE",
        "PROFILE_VARIABLES_OUTPUT",
        "RUST_LOG",
    ] {
        cmd.env_remove(name);
    }
    cmd.arg("--no-default-config");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

// ============================================================================
// Help and Version
// ============================================================================

#[test]
fn test_help() {
    profile_variables_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("replay"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version() {
    profile_variables_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_verbose_banner_shows_library_version() {
    profile_variables_cmd()
        .args(["-vv", "config"])
        .assert()
        .success()
        .stderr(predicate::str::contains(format!(
            "profile-variables v{}",
            profile_variables::VERSION
        )));
}

#[test]
fn test_invalid_mode_rejected() {
    profile_variables_cmd()
        .args(["replay", "run.yml", "--mode", "eventually"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("eventually"));
}

// ============================================================================
// Replay
// ============================================================================

#[test]
fn test_replay_without_filters_prints_empty_array() {
    profile_variables_cmd()
        .arg("replay")
        .arg(fixture("two_hosts.yml"))
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn test_replay_with_extra_vars_prints_audit() {
    let output = profile_variables_cmd()
        .arg("replay")
        .arg(fixture("two_hosts.yml"))
        .args(["-e", "profile_variables_record_vars=var_on_play"])
        .args(["-e", "profile_variables_record_tasks=Debug 1"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let document: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let records = document.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["host"], "hosta");
    assert_eq!(records[1]["host"], "hostb");
    assert_eq!(records[0]["tracked_variables"]["var_on_play"], "hello play");
    // Four-space indentation
    assert!(stdout.contains("\n    {\n        \"host\": \"hosta\""));
}

#[test]
fn test_replay_boundary_mode_from_flag() {
    let output = profile_variables_cmd()
        .arg("replay")
        .arg(fixture("two_hosts.yml"))
        .args(["--mode", "boundary"])
        .args(["-e", "profile_variables_record_tasks=Debug"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document.as_array().unwrap().len(), 4);
}

#[test]
fn test_replay_filters_from_environment() {
    let output = profile_variables_cmd()
        .env("PROFILE_VARIABLES_RECORD_VARS", "var_on_play")
        .env("PROFILE_VARIABLES_RECORD_HOSTS", "hostb")
        .arg("replay")
        .arg(fixture("two_hosts.yml"))
        .output()
        .unwrap();

    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let records = document.as_array().unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r["host"] == "hostb"));
}

#[test]
fn test_replay_writes_output_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.json");

    profile_variables_cmd()
        .arg("replay")
        .arg(fixture("two_plays.json"))
        .args(["-e", "profile_variables_record_vars=pg_installed"])
        .arg("--output")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let content = std::fs::read_to_string(&path).unwrap();
    let document: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(document.as_array().unwrap().len(), 4);
}

#[test]
fn test_replay_extra_vars_from_file() {
    let dir = tempdir().unwrap();
    let vars = dir.path().join("vars.yml");
    std::fs::write(
        &vars,
        "profile_variables_record_vars: [var_on_play]\nprofile_variables_record_hosts: hosta\n",
    )
    .unwrap();

    let output = profile_variables_cmd()
        .arg("replay")
        .arg(fixture("two_hosts.yml"))
        .arg("-e")
        .arg(format!("@{}", vars.display()))
        .output()
        .unwrap();

    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document.as_array().unwrap().len(), 4);
}

#[test]
fn test_replay_missing_fixture_exit_code() {
    profile_variables_cmd()
        .args(["replay", "/nonexistent/run.yml"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("/nonexistent/run.yml"));
}

#[test]
fn test_replay_malformed_extra_var_rejected() {
    profile_variables_cmd()
        .arg("replay")
        .arg(fixture("two_hosts.yml"))
        .args(["-e", "no_equals_sign"])
        .assert()
        .failure();
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_shows_defaults() {
    profile_variables_cmd()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[callback_profile_variables]"));
}

#[test]
fn test_config_with_invalid_mode_exit_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[callback_profile_variables]\nmode = \"sometimes\"\n").unwrap();

    profile_variables_cmd()
        .arg("-c")
        .arg(&path)
        .arg("config")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("bad.toml"))
        .stderr(predicate::str::contains("sometimes"));
}

#[test]
fn test_replay_with_unparseable_config_exit_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.yml");
    std::fs::write(&path, "callback_profile_variables: [unclosed\n").unwrap();

    profile_variables_cmd()
        .arg("--config")
        .arg(&path)
        .arg("replay")
        .arg(fixture("two_hosts.yml"))
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_config_json_reflects_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profile_variables.toml");
    std::fs::write(
        &path,
        "[callback_profile_variables]\nrecord_vars = \"a:b\"\nmode = \"boundary\"\n",
    )
    .unwrap();

    let output = profile_variables_cmd()
        .arg("--config")
        .arg(&path)
        .args(["config", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let document: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["callback_profile_variables"]["record_vars"], "a:b");
    assert_eq!(document["callback_profile_variables"]["mode"], "boundary");
}
