// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

mod common;
use common::*;

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    sl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("monitor"))
        .stdout(predicate::str::contains("tail"));
}

#[test]
fn invalid_filter_fails_before_connecting() {
    let home = TempDir::new().unwrap();
    sl(&home)
        .args(["watch", "mongo", "todos", "--where", "age ~ 3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid operator: '~'"));
}

#[test]
fn missing_url_points_at_config_file() {
    let home = TempDir::new().unwrap();
    sl(&home)
        .args(["tail", "/chat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no server url configured"))
        .stderr(predicate::str::contains("spacelink/config.toml"));
}

#[test]
fn empty_subject_is_rejected() {
    let home = TempDir::new().unwrap();
    sl(&home)
        .args(["tail", "", "--url", "ws://127.0.0.1:9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty subject"));
}

#[test]
fn config_reads_default_file_and_applies_flags() {
    let home = TempDir::new().unwrap();
    write_default_config(
        &home,
        "url = \"https://api.example.com/\"\nproject = \"todo-app\"\ntoken = \"secret\"\n",
    );

    sl(&home)
        .args(["config", "--project", "other"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://api.example.com/"))
        .stdout(predicate::str::contains("project = \"other\""))
        .stdout(predicate::str::contains("token = \"<redacted>\""))
        .stdout(predicate::str::contains("secret").not());
}

#[test]
fn config_environment_overrides() {
    let home = TempDir::new().unwrap();
    sl(&home)
        .arg("config")
        .env("SPACELINK_URL", "wss://env.example.com")
        .assert()
        .success()
        .stdout(predicate::str::contains("url = \"wss://env.example.com\""));
}

#[test]
fn unsupported_url_is_rejected() {
    let home = TempDir::new().unwrap();
    sl(&home)
        .args(["config", "--url", "ftp://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported url"));
}
