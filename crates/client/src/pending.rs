// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outstanding requests awaiting a reply.
//!
//! Every request gets an entry keyed by its correlation id. The entry is
//! resolved by the first of: a reply frame with that id, its deadline, or the
//! loss of the connection it was written to.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::live::SubscriptionKey;

/// Where a reply goes.
#[derive(Debug)]
pub(crate) enum Reply {
    /// A caller awaiting [`Client::request`](crate::Client::request).
    Caller(oneshot::Sender<Result<Value>>),
    /// A live query subscription.
    Subscribe(SubscriptionKey),
    /// A monitor group, by group id.
    MonitorSubscribe(String),
    /// A pub/sub subscription, by subscription id.
    PubsubSubscribe(String),
    /// A service registration, by service name.
    ServiceRegister(String),
}

impl Reply {
    /// Internal requests are reissued on reconnect instead of failing.
    fn is_replayed(&self) -> bool {
        !matches!(self, Reply::Caller(_))
    }
}

/// One in-flight request.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub id: String,
    pub kind: String,
    pub deadline: Instant,
    /// True once the frame has been written to a live connection.
    pub sent: bool,
    pub reply: Reply,
}

/// Table of in-flight requests.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    entries: HashMap<String, PendingRequest>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: String, kind: &str, timeout: Duration, reply: Reply) {
        let entry = PendingRequest {
            id: id.clone(),
            kind: kind.to_string(),
            deadline: Instant::now() + timeout,
            sent: false,
            reply,
        };
        self.entries.insert(id, entry);
    }

    /// Removes and returns the entry for a reply id.
    pub fn take(&mut self, id: &str) -> Option<PendingRequest> {
        self.entries.remove(id)
    }

    pub fn mark_sent(&mut self, id: &str) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.sent = true;
        }
    }

    /// Earliest deadline among outstanding requests.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    /// Removes and returns every entry whose deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> Vec<PendingRequest> {
        let expired: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.deadline <= now)
            .map(|entry| entry.id.clone())
            .collect();
        expired
            .iter()
            .filter_map(|id| self.entries.remove(id))
            .collect()
    }

    /// Handles the loss of the connection.
    ///
    /// Caller requests that were already written fail with
    /// [`Error::ConnectionLost`]. Written internal requests are dropped so the
    /// reconnect replay can reissue them. Unsent requests stay, their frames
    /// are still queued.
    pub fn connection_lost(&mut self) {
        let lost: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.sent)
            .map(|entry| entry.id.clone())
            .collect();
        for id in lost {
            let Some(entry) = self.entries.remove(&id) else {
                continue;
            };
            if let Reply::Caller(tx) = entry.reply {
                let _ = tx.send(Err(Error::ConnectionLost));
            }
        }
    }

    /// Returns true if an internal request for `target` is still outstanding.
    pub fn has_pending(&self, target: impl Fn(&Reply) -> bool) -> bool {
        self.entries
            .values()
            .any(|entry| entry.reply.is_replayed() && target(&entry.reply))
    }

    /// Fails every outstanding caller request with `Error::Closed`.
    pub fn close(&mut self) {
        for (_, entry) in self.entries.drain() {
            if let Reply::Caller(tx) = entry.reply {
                let _ = tx.send(Err(Error::Closed));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
