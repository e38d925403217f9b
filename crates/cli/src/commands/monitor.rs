// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use sl_core::{parse_filters, Expr};
use spacelink::Client;

use super::{stream, updates};
use crate::cli::{GlobalArgs, MonitorArgs};
use crate::config;
use crate::error::Result;
use crate::output;

pub async fn run(global: &GlobalArgs, args: MonitorArgs) -> Result<()> {
    let expr = filter(&args)?;
    let client = Client::new(config::resolve(global)?)?;

    let mut query = client.monitor(&args.db, &args.collection);
    if let Some(expr) = &expr {
        query = query.filter(expr);
    }
    if !args.unique_keys.is_empty() {
        query = query.unique_keys(args.unique_keys.iter().cloned());
    }

    let (updates, rx) = updates();
    let errors = updates.clone();
    let subscription = query.subscribe(
        move |event| updates.line(output::monitor_event(event)),
        move |err| errors.failed(err),
    );

    let result = stream(rx, &mut std::io::stdout()).await;
    subscription.unsubscribe();
    client.shutdown();
    result
}

/// Parses the `--where` conditions of a monitor command.
pub fn filter(args: &MonitorArgs) -> Result<Option<Expr>> {
    Ok(parse_filters(&args.filters)?)
}
