// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pub/sub subscriptions.
//!
//! Messages are delivered once, to the subscription the server names in the
//! feed. Queue groups are resolved server side by picking one subscriber per
//! queue.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use sl_core::protocol::{
    kinds, PubsubAck, PubsubFeed, PubsubSubscribeRequest, PubsubUnsubscribeRequest,
};
use tracing::{debug, warn};

pub use sl_core::protocol::PubsubMessage;

use crate::callbacks::{Callbacks, Shared};
use crate::client::{Client, Command};
use crate::error::{Error, Result};
use crate::outbox::Outbox;
use crate::pending::Reply;

/// Entry point for pub/sub, created by [`Client::pubsub`].
#[derive(Debug, Clone)]
pub struct PubSub {
    client: Client,
}

impl PubSub {
    pub(crate) fn new(client: Client) -> Self {
        PubSub { client }
    }

    /// Receives every message published on `subject`.
    pub fn subscribe(
        &self,
        subject: &str,
        on_message: impl Fn(&PubsubMessage) + Send + Sync + 'static,
        on_error: impl Fn(&Error) + Send + Sync + 'static,
    ) -> Result<PubsubSubscription> {
        self.queue_subscribe(subject, "", on_message, on_error)
    }

    /// Shares messages on `subject` with the other members of `queue`.
    ///
    /// Each message goes to one member of the queue.
    pub fn queue_subscribe(
        &self,
        subject: &str,
        queue: &str,
        on_message: impl Fn(&PubsubMessage) + Send + Sync + 'static,
        on_error: impl Fn(&Error) + Send + Sync + 'static,
    ) -> Result<PubsubSubscription> {
        if subject.is_empty() {
            let err = sl_core::Error::InvalidInput("empty subject".to_string());
            return Err(err.into());
        }
        let shared = Shared::new();
        let record = PubsubRecord {
            id: self.client.next_id(),
            subject: subject.to_string(),
            queue: queue.to_string(),
            callbacks: Callbacks::new(on_message, on_error),
            shared: shared.clone(),
        };
        let handle = PubsubSubscription {
            client: self.client.clone(),
            id: record.id.clone(),
            subject: record.subject.clone(),
            shared,
        };
        self.client.command(Command::PubsubSubscribe(record));
        Ok(handle)
    }
}

/// Handle to one pub/sub subscription.
#[derive(Debug, Clone)]
pub struct PubsubSubscription {
    client: Client,
    id: String,
    subject: String,
    shared: Shared,
}

impl PubsubSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Stops delivery at once and tells the server, best effort.
    pub fn unsubscribe(&self) {
        if self.shared.deactivate() {
            self.client
                .command(Command::PubsubUnsubscribe(self.id.clone()));
        }
    }
}

#[derive(Debug)]
pub(crate) struct PubsubRecord {
    id: String,
    subject: String,
    queue: String,
    callbacks: Callbacks<PubsubMessage>,
    shared: Shared,
}

/// All pub/sub subscriptions of one client, by subscription id.
#[derive(Debug)]
pub(crate) struct PubsubRegistry {
    project: String,
    records: HashMap<String, PubsubRecord>,
}

impl PubsubRegistry {
    pub fn new(project: impl Into<String>) -> Self {
        PubsubRegistry {
            project: project.into(),
            records: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn subscribe(&mut self, record: PubsubRecord, out: &mut Outbox) {
        debug!(subscription = %record.id, subject = %record.subject, "subscribing to subject");
        self.send_subscribe(&record, out);
        self.records.insert(record.id.clone(), record);
    }

    fn send_subscribe(&self, record: &PubsubRecord, out: &mut Outbox) {
        let request = PubsubSubscribeRequest {
            id: record.id.clone(),
            subject: record.subject.clone(),
            queue: record.queue.clone(),
            project: self.project.clone(),
        };
        out.request_message(
            kinds::PUBSUB_SUBSCRIBE,
            &request,
            Reply::PubsubSubscribe(record.id.clone()),
        );
    }

    pub fn unsubscribe(&mut self, id: &str, out: &mut Outbox) {
        if let Some(record) = self.records.remove(id) {
            record.shared.deactivate();
            send_unsubscribe(&record, out);
        }
    }

    pub fn fail(&mut self, id: &str, err: Error, out: &mut Outbox) {
        let Some(record) = self.records.remove(id) else {
            return;
        };
        warn!(
            subscription = %id,
            subject = %record.subject,
            error = %err,
            "pub/sub subscription failed"
        );
        if record.shared.deactivate() {
            record.callbacks.error(&err);
        }
        send_unsubscribe(&record, out);
    }

    /// Handles the reply to `pubsub-subscribe`.
    pub fn on_ack(&mut self, id: &str, data: Value, out: &mut Outbox) {
        let ack: PubsubAck = match serde_json::from_value(data) {
            Ok(ack) => ack,
            Err(e) => return self.fail(id, Error::MalformedFrame(e.to_string()), out),
        };
        if !ack.accepted() {
            let reason = ack
                .error
                .unwrap_or_else(|| format!("status {}", ack.status));
            return self.fail(id, Error::SubscribeRejected(reason), out);
        }
        debug!(subscription = %id, "pub/sub subscription accepted");
    }

    /// Handles a `pubsub-subscribe-feed` message.
    pub fn on_feed(&mut self, data: &Value) {
        let feed = match PubsubFeed::deserialize(data) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(error = %e, "dropping malformed pub/sub feed");
                return;
            }
        };
        match self.records.get(&feed.id) {
            Some(record) if record.shared.is_active() => record.callbacks.event(&feed.msg),
            Some(_) => {}
            None => debug!(subscription = %feed.id, "message for unknown subscription"),
        }
    }

    /// Reissues every subscription not already queued.
    pub fn replay(&self, out: &mut Outbox) {
        for record in self.records.values() {
            let queued = out.pending().has_pending(|reply| {
                matches!(reply, Reply::PubsubSubscribe(id) if *id == record.id)
            });
            if !queued {
                self.send_subscribe(record, out);
            }
        }
    }
}

fn send_unsubscribe(record: &PubsubRecord, out: &mut Outbox) {
    let request = PubsubUnsubscribeRequest {
        subject: record.subject.clone(),
        id: record.id.clone(),
    };
    out.send_message(kinds::PUBSUB_UNSUBSCRIBE, &request);
}

#[cfg(test)]
#[path = "pubsub_tests.rs"]
mod tests;
