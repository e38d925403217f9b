// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! slcli - command-line access to spacelink live queries, monitors and pub/sub.
//!
//! Every command resolves a [`spacelink::ClientConfig`], opens one
//! subscription and prints what it receives as JSON lines on stdout until
//! interrupted.

pub mod cli;
pub mod commands;
pub mod config;
pub mod env;
pub mod error;
pub mod output;

pub use cli::{Cli, Command, GlobalArgs};
pub use error::{Error, Result};

/// Log level used when neither `--verbose` nor `RUST_LOG` says otherwise.
const DEFAULT_LOG: &str = "warn";

/// Picks the tracing filter directive: `--verbose` wins over `RUST_LOG`.
pub fn log_directive(verbose: bool, rust_log: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    match rust_log {
        Some(directive) if !directive.trim().is_empty() => directive.to_string(),
        _ => DEFAULT_LOG.to_string(),
    }
}

/// Runs a parsed command line to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let Cli { global, command } = cli;
    match command {
        Command::Watch(args) => commands::watch::run(&global, args).await,
        Command::Monitor(args) => commands::monitor::run(&global, args).await,
        Command::Tail(args) => commands::tail::run(&global, args).await,
        Command::Config => commands::config::run(&global),
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
