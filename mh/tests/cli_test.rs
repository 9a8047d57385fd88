//! Tests for the `mh` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mh(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mh").unwrap();
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_demo_text_report() {
    let home = TempDir::new().unwrap();
    mh(&home)
        .args(["demo", "--observers", "2", "--mutations", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 scheduled"))
        .stdout(predicate::str::contains("2 coalesced"));
}

#[test]
fn test_demo_json_report() {
    let home = TempDir::new().unwrap();
    let output = mh(&home)
        .args(["demo", "--rounds", "2", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["dispatch"]["passes"], 2);
    assert_eq!(report["observers"].as_array().unwrap().len(), 2);
    assert_eq!(report["event-loop-name"], "main");
}

#[test]
fn test_config_reads_local_file() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".mutation-host.yml"), "event-loop:\n  name: render\n").unwrap();

    mh(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: render"));
}
