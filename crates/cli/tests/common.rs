// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// The `sl` binary, isolated from the user's config and environment.
pub fn sl(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("sl");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("SPACELINK_CONFIG")
        .env_remove("SPACELINK_URL")
        .env_remove("SPACELINK_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

/// Writes `<config dir>/spacelink/config.toml` under `home`.
pub fn write_default_config(home: &TempDir, content: &str) {
    let dir = home.path().join(".config").join("spacelink");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), content).unwrap();
}
