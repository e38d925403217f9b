// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use sl_core::parse_filters;
use spacelink::{Client, LiveQuery};

use super::{stream, updates};
use crate::cli::{GlobalArgs, WatchArgs};
use crate::config;
use crate::error::Result;
use crate::output;

pub async fn run(global: &GlobalArgs, args: WatchArgs) -> Result<()> {
    // Bad filters fail before anything touches the network.
    let query = Query::from_args(&args)?;
    let client = Client::new(config::resolve(global)?)?;

    let (updates, rx) = updates();
    let errors = updates.clone();
    let subscription = query
        .apply(client.live_query(&args.db, &args.collection))
        .subscribe(
            move |event| updates.line(output::live_event(event)),
            move |err| errors.failed(err),
        );

    let result = stream(rx, &mut std::io::stdout()).await;
    subscription.unsubscribe();
    client.shutdown();
    result
}

/// Validated query options from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Option<sl_core::Expr>,
    pub changes_only: bool,
    pub skip_initial: bool,
}

impl Query {
    pub fn from_args(args: &WatchArgs) -> Result<Self> {
        Ok(Query {
            filter: parse_filters(&args.filters)?,
            changes_only: args.changes_only,
            skip_initial: args.skip_initial || args.changes_only,
        })
    }

    fn apply(&self, mut query: LiveQuery) -> LiveQuery {
        if let Some(expr) = &self.filter {
            query = query.filter(expr);
        }
        if self.changes_only {
            query = query.changes_only();
        } else if self.skip_initial {
            query = query.skip_initial();
        }
        query
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
