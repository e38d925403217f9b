// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command implementations.
//!
//! Subscription callbacks run on the client's event loop, so they only
//! forward rendered lines over a channel. [`stream`] prints them.

pub mod config;
pub mod monitor;
pub mod tail;
pub mod watch;

use std::io::Write;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::error::{Error, Result};
use crate::output;

/// What a subscription hands to the printing loop.
#[derive(Debug)]
pub enum Update {
    Line(Value),
    Failed(String),
}

/// Callback-side handle for forwarding updates.
#[derive(Debug, Clone)]
pub struct Updates {
    tx: UnboundedSender<Update>,
}

impl Updates {
    pub fn line(&self, value: Value) {
        // The receiver only goes away once the command is exiting.
        let _ = self.tx.send(Update::Line(value));
    }

    pub fn failed(&self, err: &spacelink::Error) {
        let _ = self.tx.send(Update::Failed(err.to_string()));
    }
}

pub fn updates() -> (Updates, UnboundedReceiver<Update>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Updates { tx }, rx)
}

/// Prints updates until interrupted, the subscription fails, or every
/// sender is gone.
pub async fn stream(mut rx: UnboundedReceiver<Update>, out: &mut impl Write) -> Result<()> {
    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Some(Update::Line(value)) => output::write_line(out, &value)?,
                Some(Update::Failed(message)) => return Err(Error::Subscription(message)),
                None => return Ok(()),
            },
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
