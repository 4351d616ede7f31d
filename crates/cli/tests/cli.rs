use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn write_config(dir: &TempDir) -> std::path::PathBuf {
    let content = format!(
        r#"
[general]
snapshots_dir = "{}"

[repository]
backend = "memory"

[[sources]]
id = "frl_migration_act"
family = "legislation"
source_type = "FRL_ACT"
locator = "https://www.legislation.gov.au/C1958A00062/latest"
canonical_url = "https://www.legislation.gov.au/C1958A00062"
title = "Migration Act 1958"
"#,
        dir.path().join("snapshots").display()
    );
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("regwatch");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("snapshots_dir"));
    assert!(content.contains("[[sources]]"));
    assert!(content.contains("FRL_ACT"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# existing").expect("write existing");

    let mut cmd = cargo_bin_cmd!("regwatch");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn doctor_reports_ok_for_valid_config() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir);

    let mut cmd = cargo_bin_cmd!("regwatch");
    let output = cmd
        .args(["doctor", "--json", "--config"])
        .arg(&config_path)
        .output()
        .expect("run doctor");

    assert!(output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(report["overall"], "ok");
    assert_eq!(report["config"]["status"], "ok");
    assert_eq!(report["sources"]["status"], "ok");
}

#[test]
fn doctor_flags_invalid_source_type() {
    let dir = TempDir::new().expect("temp dir");
    let content = r#"
[repository]
backend = "memory"

[[sources]]
id = "bad_source"
family = "legislation"
source_type = "FRL_BILL"
locator = "https://example.gov.au"
canonical_url = "https://example.gov.au"
"#;
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, content).expect("write config");

    let mut cmd = cargo_bin_cmd!("regwatch");
    let output = cmd
        .args(["doctor", "--json", "--config"])
        .arg(&config_path)
        .output()
        .expect("run doctor");

    assert!(!output.status.success());

    let report: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(report["overall"], "error");
    assert!(
        report["sources"]["message"]
            .as_str()
            .unwrap()
            .contains("FRL_BILL")
    );
}

#[test]
fn watch_rejects_unknown_source_id() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir);

    let mut cmd = cargo_bin_cmd!("regwatch");
    cmd.args(["watch", "--dry-run", "--source", "nonexistent", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown source id"));
}

#[test]
fn watch_fails_without_configured_sources() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[repository]\nbackend = \"memory\"\n").expect("write config");

    let mut cmd = cargo_bin_cmd!("regwatch");
    cmd.args(["watch", "--dry-run", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No sources configured"));
}
