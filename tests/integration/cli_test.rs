//! End-to-end tests for the cupax-agent binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

use crate::helpers::{fixtures_dir, load_fixture};

/// The binary with a throwaway HOME so no user config is picked up.
fn agent(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cupax-agent").expect("binary not built");
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("AGENT_WORK_DIR")
        .env_remove("AGENT_TIMEOUT");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let home = TempDir::new().unwrap();
    agent(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("parse"))
        .stdout(predicate::str::contains("cleanup"));
}

#[test]
fn parse_prints_report_json() {
    let home = TempDir::new().unwrap();
    let output = agent(&home)
        .arg("parse")
        .arg(fixtures_dir())
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["processes_created"], 3);
    assert_eq!(json["network"].as_array().unwrap().len(), 2);
}

#[test]
fn parse_empty_directory_fails() {
    let home = TempDir::new().unwrap();
    let empty = TempDir::new().unwrap();
    agent(&home)
        .arg("parse")
        .arg(empty.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Noriben output files not found"));
}

#[test]
fn cleanup_uses_configured_work_dir() {
    let home = TempDir::new().unwrap();
    let work = home.path().join("work");
    fs::create_dir_all(work.join("job1")).unwrap();
    fs::write(
        work.join("job1").join("Noriben_x.txt"),
        load_fixture("Noriben_27_Jan_25__14_02_11_000000.txt"),
    )
    .unwrap();
    let config = home.path().join("agent.toml");
    fs::write(&config, format!("[workspace]\nwork_dir = '{}'\n", work.display())).unwrap();

    for _ in 0..2 {
        agent(&home)
            .arg("cleanup")
            .arg("job1")
            .arg("--config")
            .arg(&config)
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleaned up: job1"));
    }
    assert!(!work.join("job1").exists());
}

#[test]
fn env_override_is_validated() {
    let home = TempDir::new().unwrap();
    agent(&home)
        .env("AGENT_TIMEOUT", "soon")
        .args(["cleanup", "job1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AGENT_TIMEOUT"));
}

#[cfg(unix)]
#[test]
fn analyze_prints_failure_response() {
    let home = TempDir::new().unwrap();
    let sample = home.path().join("sample.exe");
    fs::write(&sample, b"MZ").unwrap();

    let output = agent(&home)
        .env("AGENT_WORK_DIR", home.path().join("work"))
        .env("AGENT_PYTHON_PATH", "sh")
        .env("AGENT_NORIBEN_PATH", home.path().join("missing.sh"))
        .arg("analyze")
        .arg(&sample)
        .args(["--id", "job1"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Noriben execution failed"));
}
