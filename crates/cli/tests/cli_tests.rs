//! CLI integration tests
//!
//! These only exercise paths that never reach a cluster.

use std::path::Path;
use std::process::{Command, Output};

/// Run the binary with an isolated home directory and environment
fn pvcusage(home: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pvcusage"));
    cmd.args(args)
        .env("HOME", home)
        .env_remove("KUBECONFIG")
        .env_remove("RUST_LOG");

    for (key, _) in std::env::vars() {
        if key.starts_with("PVCUSAGE_") {
            cmd.env_remove(key);
        }
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    cmd.output().expect("Failed to execute pvcusage")
}

fn write_config(home: &Path, content: &str) {
    let dir = home.join(".config").join("pvcusage");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.json"), content).unwrap();
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["--help"], &[]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("PVC usage"), "Should show app description");
    assert!(stdout.contains("usage"), "Should show usage command");
    assert!(stdout.contains("perf"), "Should show perf command");
    assert!(stdout.contains("--filter"), "Should show filter option");
    assert!(stdout.contains("--top"), "Should show top option");
    assert!(stdout.contains("--watch"), "Should show watch option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["--version"], &[]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("pvcusage"), "Should show binary name");
}

/// Test perf command help
#[test]
fn test_perf_help() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["perf", "--help"], &[]);

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Perf help should succeed");
    assert!(stdout.contains("--pvc"), "Should show pvc option");
    assert!(stdout.contains("--pod"), "Should show pod option");
    assert!(stdout.contains("--namespace"), "Should show namespace option");
    assert!(stdout.contains("--interval"), "Should show interval option");
}

/// Test that perf requires a PVC
#[test]
fn test_perf_requires_pvc() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["perf", "--namespace", "kafka"], &[]);

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Perf without --pvc should fail");
    assert!(stderr.contains("--pvc"), "Should name the missing option");
}

/// Test that a malformed filter fails before connecting
#[test]
fn test_invalid_filter_rejected() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["--filter", "invalid"], &[]);

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid filter should fail");
    assert!(stderr.contains("Invalid filter"), "Should report the filter");
}

/// Test that a zero watch interval is rejected
#[test]
fn test_zero_interval_rejected() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["--watch", "-s", "0"], &[]);

    assert!(!output.status.success(), "Zero interval should fail");
}

/// Test that flags and subcommands are not mixed
#[test]
fn test_top_level_flags_conflict_with_subcommand() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["--top", "3", "perf", "--pvc", "data"], &[]);

    assert!(!output.status.success(), "Usage flags before a subcommand should fail");
}

/// Test defaults of the effective configuration
#[test]
fn test_config_defaults() {
    let home = tempfile::tempdir().unwrap();
    let output = pvcusage(home.path(), &["config"], &[]);

    assert!(output.status.success(), "Config should succeed");
    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["watch_interval"], 5);
    assert_eq!(settings["top"], 0);
    assert_eq!(settings["namespace"], serde_json::Value::Null);
}

/// Test that the config file is read
#[test]
fn test_config_file() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), r#"{"namespace": "kafka", "top": 3, "watch_interval": 10}"#);

    let output = pvcusage(home.path(), &["config"], &[]);

    assert!(output.status.success(), "Config should succeed");
    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["namespace"], "kafka");
    assert_eq!(settings["top"], 3);
    assert_eq!(settings["watch_interval"], 10);
}

/// Test that environment variables override the config file
#[test]
fn test_env_overrides_config_file() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), r#"{"namespace": "kafka", "top": 3}"#);

    let output = pvcusage(
        home.path(),
        &["config"],
        &[("PVCUSAGE_NAMESPACE", "billing")],
    );

    assert!(output.status.success(), "Config should succeed");
    let settings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(settings["namespace"], "billing");
    assert_eq!(settings["top"], 3);
}

/// Test that a malformed config file is reported
#[test]
fn test_malformed_config_file() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "{ not json");

    let output = pvcusage(home.path(), &["config"], &[]);

    assert!(!output.status.success(), "Malformed config should fail");
}
