//! Corruption recovery tests for the seven binary.
//!
//! These tests verify the system can handle:
//! - A store file that is not JSON at all
//! - A store whose workout list no longer decodes
//! - Missing files

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("seven").expect("Failed to find seven binary");
    cmd.env("XDG_CONFIG_HOME", dir.path().join("config"))
        .arg("--data-dir")
        .arg(dir.path().join("data"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn store_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("data/store.json")
}

#[test]
fn test_corrupted_store_file() {
    let dir = setup_test_dir();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(store_path(&dir), "{ invalid json }}}}").expect("Failed to write corrupted store");

    cli(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Streak: 0 day(s)"));

    // A completed session replaces the corrupt file with a valid one
    cli(&dir).arg("start").arg("--fast").assert().success();

    let contents = fs::read_to_string(store_path(&dir)).unwrap();
    let store: Value = serde_json::from_str(&contents).expect("store should be valid JSON again");
    assert_eq!(store["streak.days"], 1);
}

#[test]
fn test_undecodable_workouts_fall_back_to_defaults() {
    let dir = setup_test_dir();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(
        store_path(&dir),
        r#"{"streak.days": 4, "custom.workouts": [{"id": "not-a-uuid"}]}"#,
    )
    .unwrap();

    cli(&dir)
        .args(["workouts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Quick Warm-up"))
        .stdout(predicate::str::contains("Intensive Workout"));

    // Other keys survive the bad workout list
    cli(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Streak: 4 day(s)"));
}

#[test]
fn test_wrongly_typed_history_is_ignored() {
    let dir = setup_test_dir();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(store_path(&dir), r#"{"workout.history": "yesterday"}"#).unwrap();

    cli(&dir).arg("start").arg("--fast").assert().success();

    let store: Value =
        serde_json::from_str(&fs::read_to_string(store_path(&dir)).unwrap()).unwrap();
    let days = store["workout.history"].as_object().expect("history rebuilt as a map");
    assert_eq!(days.len(), 1);
}

#[test]
fn test_missing_data_dir_is_created_on_first_write() {
    let dir = setup_test_dir();
    assert!(!dir.path().join("data").exists());

    cli(&dir)
        .args(["workouts", "new", "--name", "Quick", "--step", "lunges"])
        .assert()
        .success();

    assert!(store_path(&dir).exists());
}
