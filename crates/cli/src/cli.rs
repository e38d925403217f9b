// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

const EXAMPLES_HELP: &str = "\
Examples:
  sl watch mongo todos --where 'userId == \"u1\"'
  sl watch mongo todos --changes-only
  sl monitor mongo posts --where 'score >= 10'
  sl tail /chat/general --queue workers";

#[derive(Parser, Debug)]
#[command(name = "sl")]
#[command(version)]
#[command(about = "Watch realtime queries, monitors and pub/sub subjects")]
#[command(after_help = EXAMPLES_HELP)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file [default: <config dir>/spacelink/config.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backend URL (http(s):// or ws(s)://)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Project to scope subscriptions to
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// Bearer token sent with every frame
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Log at debug level on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print live query updates as JSON lines
    Watch(WatchArgs),

    /// Print monitor group events as JSON lines
    Monitor(MonitorArgs),

    /// Print messages published on a subject
    Tail(TailArgs),

    /// Print the resolved configuration
    Config,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Database type, e.g. mongo
    pub db: String,

    /// Collection to watch
    pub collection: String,

    /// Filter condition, e.g. 'userId == "u1"' (repeatable, combined with AND)
    #[arg(short = 'w', long = "where", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Print each changed row instead of the full snapshot
    #[arg(long)]
    pub changes_only: bool,

    /// Do not print the initial result set
    #[arg(long)]
    pub skip_initial: bool,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Database type, e.g. mongo
    pub db: String,

    /// Collection to monitor
    pub collection: String,

    /// Filter condition (repeatable, combined with AND)
    #[arg(short = 'w', long = "where", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Field identifying a document when deduplicating inserts (repeatable)
    #[arg(long = "unique-key", value_name = "FIELD")]
    pub unique_keys: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TailArgs {
    /// Subject to subscribe to
    pub subject: String,

    /// Share messages with other members of this queue group
    #[arg(short, long)]
    pub queue: Option<String>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
