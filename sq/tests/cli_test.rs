//! CLI smoke tests for the `sq` binary

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Write a config that keeps every file inside the temp dir
fn write_config(temp_dir: &TempDir) -> PathBuf {
    let db_path = temp_dir.path().join("queue.db");
    let config_path = temp_dir.path().join("syncqueue.yml");
    let yaml = format!(
        r#"
storage:
  db-path: {}
endpoints:
  base-url: http://127.0.0.1:9
  timeout-ms: 500
sync:
  retry-delay-ms: 0
"#,
        db_path.display()
    );
    fs::write(&config_path, yaml).unwrap();
    config_path
}

fn sq(temp_dir: &TempDir, config_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sq").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("HOME", temp_dir.path())
        .env("XDG_DATA_HOME", temp_dir.path().join("data"))
        .env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .arg("--config")
        .arg(config_path);
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("sq")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("request"))
        .stdout(predicate::str::contains("purge"))
        .stdout(predicate::str::contains("run"));
}

#[test]
fn test_request_then_status_json() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    sq(&temp_dir, &config)
        .args([
            "request",
            "/api/workouts",
            "--body",
            r#"{"id":"w1"}"#,
            "-H",
            "X-Client: cli",
            "--priority",
            "high",
            "--category",
            "workout",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued request req-"));

    sq(&temp_dir, &config)
        .args(["data", "nutrition", r#"{"kcal":640}"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued nutrition record sync-"));

    sq(&temp_dir, &config)
        .args(["status", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pending_requests\": 1"))
        .stdout(predicate::str::contains("\"pending_sync_records\": 1"));
}

#[test]
fn test_drain_against_unreachable_endpoint_keeps_items() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    sq(&temp_dir, &config)
        .args(["request", "/api/meals", "--method", "put"])
        .assert()
        .success();

    sq(&temp_dir, &config)
        .arg("drain")
        .assert()
        .success()
        .stdout(predicate::str::contains("failed 1"));

    sq(&temp_dir, &config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("pending: 1"));
}

#[test]
fn test_clear_requests() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    sq(&temp_dir, &config).args(["request", "/a"]).assert().success();
    sq(&temp_dir, &config).args(["request", "/b"]).assert().success();

    sq(&temp_dir, &config)
        .args(["clear", "requests"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 2 items"));
}

#[test]
fn test_invalid_body_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    sq(&temp_dir, &config)
        .args(["request", "/api/workouts", "--body", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_zero_max_retries_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = write_config(&temp_dir);

    sq(&temp_dir, &config)
        .args(["request", "/api/workouts", "--max-retries", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_retries"));
}
