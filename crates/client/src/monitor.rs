// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Monitor groups.
//!
//! Every subscriber that watches the same database, collection and filter
//! shares one server-side feed. The group keeps a plain document snapshot,
//! applies insert/update/delete notifications to it, and fans each change out
//! to all of its subscribers in one pass.

use std::fmt;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use sl_core::protocol::{
    kinds, ChangeKind, MonitorAck, MonitorFeed, MonitorRequest, MonitorUnsubscribe, WriteScope,
};
use sl_core::{filter, lower, Expr};
use tracing::{debug, warn};

use crate::callbacks::{Callbacks, Shared};
use crate::client::{Client, Command};
use crate::error::Error;
use crate::outbox::Outbox;
use crate::pending::Reply;

/// Unique keys used to deduplicate inserts when none are given.
const DEFAULT_UNIQUE_KEYS: [&str; 1] = ["_id"];

/// Kind of monitor notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    /// The group snapshot, sent once the server acknowledged the group.
    Monitor,
    Insert,
    Update,
    Delete,
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MonitorKind::Monitor => "monitor",
            MonitorKind::Insert => "insert",
            MonitorKind::Update => "update",
            MonitorKind::Delete => "delete",
        })
    }
}

/// What a monitor callback receives.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorEvent {
    /// The group snapshot after the change.
    pub docs: Vec<Value>,
    pub kind: MonitorKind,
    /// Documents inserted, updated (new values) or deleted.
    pub changed: Vec<Value>,
}

/// What a group is keyed by. Filters compare structurally.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MonitorTarget {
    pub db: String,
    pub collection: String,
    pub find: Value,
    pub unique_keys: Vec<String>,
}

impl MonitorTarget {
    fn same_group(&self, other: &MonitorTarget) -> bool {
        self.db == other.db && self.collection == other.collection && self.find == other.find
    }
}

/// Builder for a monitor subscription, created by [`Client::monitor`].
#[must_use]
pub struct MonitorQuery {
    client: Client,
    target: MonitorTarget,
}

impl MonitorQuery {
    pub(crate) fn new(client: Client, db: &str, collection: &str) -> Self {
        let target = MonitorTarget {
            db: db.to_string(),
            collection: collection.to_string(),
            find: json!({}),
            unique_keys: DEFAULT_UNIQUE_KEYS
                .iter()
                .map(|key| key.to_string())
                .collect(),
        };
        MonitorQuery { client, target }
    }

    pub fn filter(mut self, expr: &Expr) -> Self {
        self.target.find = lower(expr);
        self
    }

    pub fn find(mut self, find: Value) -> Self {
        self.target.find = find;
        self
    }

    /// Fields that identify a document when deduplicating inserts.
    ///
    /// Only the first subscriber of a group decides its keys.
    pub fn unique_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target.unique_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn subscribe(
        self,
        on_event: impl Fn(&MonitorEvent) + Send + Sync + 'static,
        on_error: impl Fn(&Error) + Send + Sync + 'static,
    ) -> MonitorSubscription {
        let shared = Shared::new();
        let listener = MonitorListener {
            id: self.client.next_id(),
            callbacks: Callbacks::new(on_event, on_error),
            shared: shared.clone(),
        };
        let id = listener.id.clone();
        self.client.command(Command::MonitorSubscribe {
            target: self.target,
            listener,
        });
        MonitorSubscription {
            client: self.client,
            id,
            shared,
        }
    }
}

/// Handle to one monitor subscriber.
#[derive(Debug, Clone)]
pub struct MonitorSubscription {
    client: Client,
    id: String,
    shared: Shared,
}

impl MonitorSubscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy of the last snapshot delivered to this subscriber.
    pub fn snapshot(&self) -> Vec<Value> {
        self.shared.view()
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Leaves the group. The last subscriber to leave tears the group down.
    pub fn unsubscribe(&self) {
        if self.shared.deactivate() {
            self.client
                .command(Command::MonitorUnsubscribe(self.id.clone()));
        }
    }
}

#[derive(Debug)]
pub(crate) struct MonitorListener {
    id: String,
    callbacks: Callbacks<MonitorEvent>,
    shared: Shared,
}

#[derive(Debug)]
struct MonitorGroup {
    id: String,
    target: MonitorTarget,
    docs: Vec<Value>,
    acked: bool,
    listeners: Vec<MonitorListener>,
}

impl MonitorGroup {
    fn deliver(&self, event: &MonitorEvent) {
        for listener in &self.listeners {
            deliver_to(listener, event);
        }
    }

    fn snapshot_event(&self) -> MonitorEvent {
        MonitorEvent {
            docs: self.docs.clone(),
            kind: MonitorKind::Monitor,
            changed: Vec::new(),
        }
    }

    /// Applies a notification. Returns the event to deliver, if anything changed.
    fn apply(&mut self, feed: &MonitorFeed) -> Option<MonitorEvent> {
        let (kind, changed) = match feed.kind {
            ChangeKind::Insert | ChangeKind::Initial => {
                (MonitorKind::Insert, self.insert(feed.documents()))
            }
            ChangeKind::Update => {
                (MonitorKind::Update, self.update(&feed.find, &feed.update, feed.op))
            }
            ChangeKind::Delete => (MonitorKind::Delete, self.delete(&feed.find, feed.op)),
        };
        if changed.is_empty() {
            return None;
        }
        Some(MonitorEvent {
            docs: self.docs.clone(),
            kind,
            changed,
        })
    }

    fn insert(&mut self, docs: Vec<Value>) -> Vec<Value> {
        let mut inserted = Vec::new();
        for doc in docs {
            let keys = &self.target.unique_keys;
            if self.docs.iter().any(|d| same_document(d, &doc, keys)) {
                continue;
            }
            self.docs.push(doc.clone());
            inserted.push(doc);
        }
        inserted
    }

    fn update(&mut self, find: &Value, update: &Value, op: WriteScope) -> Vec<Value> {
        let mut updated = Vec::new();
        let matching = self.docs.iter_mut().filter(|d| filter::matches(find, d));
        for doc in matching {
            if apply_update(doc, update) {
                updated.push(doc.clone());
            }
            if op == WriteScope::One {
                break;
            }
        }
        updated
    }

    fn delete(&mut self, find: &Value, op: WriteScope) -> Vec<Value> {
        let mut deleted = Vec::new();
        let mut kept = Vec::with_capacity(self.docs.len());
        for doc in self.docs.drain(..) {
            let first_only_done = op == WriteScope::One && !deleted.is_empty();
            if !first_only_done && filter::matches(find, &doc) {
                deleted.push(doc);
            } else {
                kept.push(doc);
            }
        }
        self.docs = kept;
        deleted
    }
}

fn deliver_to(listener: &MonitorListener, event: &MonitorEvent) {
    if listener.shared.is_active() {
        listener.shared.set_view(event.docs.clone());
        listener.callbacks.event(event);
    }
}

/// Two documents are the same if every unique key is present in both and equal.
fn same_document(a: &Value, b: &Value, unique_keys: &[String]) -> bool {
    !unique_keys.is_empty()
        && unique_keys.iter().all(|key| match (a.get(key), b.get(key)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        })
}

/// Applies an update document in place. Returns true if `doc` changed.
///
/// `$set` assigns dotted paths and plain keys are merged at the top level.
/// Other operators are ignored.
fn apply_update(doc: &mut Value, update: &Value) -> bool {
    let Value::Object(update) = update else {
        return false;
    };
    let before = doc.clone();
    for (key, value) in update {
        match (key.as_str(), value) {
            ("$set", Value::Object(fields)) => {
                for (path, field) in fields {
                    set_path(doc, path, field.clone());
                }
            }
            (op, _) if op.starts_with('$') => debug!(operator = op, "ignoring update operator"),
            (field, value) => set_path(doc, field, value.clone()),
        }
    }
    *doc != before
}

fn set_path(doc: &mut Value, path: &str, value: Value) {
    let mut current = doc;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        let next = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !next.is_object() {
            *next = Value::Object(Map::new());
        }
        current = next;
    }
}

/// All monitor groups of one client.
#[derive(Debug)]
pub(crate) struct MonitorRegistry {
    project: String,
    groups: Vec<MonitorGroup>,
}

impl MonitorRegistry {
    pub fn new(project: impl Into<String>) -> Self {
        MonitorRegistry {
            project: project.into(),
            groups: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Adds a subscriber, creating its group on first use.
    pub fn subscribe(
        &mut self,
        target: MonitorTarget,
        listener: MonitorListener,
        out: &mut Outbox,
    ) {
        let existing = self
            .groups
            .iter_mut()
            .find(|g| g.target.same_group(&target));
        if let Some(group) = existing {
            debug!(group = %group.id, listener = %listener.id, "joining monitor group");
            if group.acked {
                deliver_to(&listener, &group.snapshot_event());
            }
            group.listeners.push(listener);
            return;
        }

        let group = MonitorGroup {
            id: out.next_id(),
            target,
            docs: Vec::new(),
            acked: false,
            listeners: vec![listener],
        };
        debug!(group = %group.id, collection = %group.target.collection, "creating monitor group");
        self.send_subscribe(&group, out);
        self.groups.push(group);
    }

    fn send_subscribe(&self, group: &MonitorGroup, out: &mut Outbox) {
        let request = MonitorRequest {
            id: group.id.clone(),
            db_type: group.target.db.clone(),
            group: group.target.collection.clone(),
            filter: group.target.find.clone(),
            project: self.project.clone(),
        };
        out.request_message(
            kinds::MONITOR_SUBSCRIBE,
            &request,
            Reply::MonitorSubscribe(group.id.clone()),
        );
    }

    /// Removes a subscriber. The last one out sends `monitor-unsubscribe`.
    pub fn unsubscribe(&mut self, listener_id: &str, out: &mut Outbox) {
        let has_listener = |g: &MonitorGroup| g.listeners.iter().any(|l| l.id == listener_id);
        let Some(pos) = self.groups.iter().position(has_listener) else {
            return;
        };
        let group = &mut self.groups[pos];
        group
            .listeners
            .retain(|listener| listener.id != listener_id);
        if !group.listeners.is_empty() {
            return;
        }

        let group = self.groups.remove(pos);
        debug!(group = %group.id, "closing monitor group");
        let request = MonitorUnsubscribe {
            id: group.id.clone(),
            db_type: group.target.db.clone(),
            group: group.target.collection.clone(),
        };
        out.send_message(kinds::MONITOR_UNSUBSCRIBE, &request);
    }

    /// Errors every subscriber of a group and removes it.
    pub fn fail(&mut self, group_id: &str, err: Error) {
        let Some(pos) = self.groups.iter().position(|group| group.id == group_id) else {
            return;
        };
        let group = self.groups.remove(pos);
        warn!(group = %group.id, error = %err, "monitor group failed");
        for listener in &group.listeners {
            if listener.shared.deactivate() {
                listener.callbacks.error(&err);
            }
        }
    }

    /// Handles the reply to `monitor-subscribe`.
    pub fn on_ack(&mut self, group_id: &str, data: Value) {
        let ack: MonitorAck = match serde_json::from_value(data) {
            Ok(ack) => ack,
            Err(e) => return self.fail(group_id, Error::MalformedFrame(e.to_string())),
        };
        if !ack.ack {
            let reason = ack
                .error
                .unwrap_or_else(|| "rejected by server".to_string());
            return self.fail(group_id, Error::SubscribeRejected(reason));
        }
        let Some(group) = self.groups.iter_mut().find(|group| group.id == group_id) else {
            return;
        };
        group.docs = ack.docs;
        group.acked = true;
        group.deliver(&group.snapshot_event());
    }

    /// Handles a `monitor-feed` notification.
    pub fn on_feed(&mut self, data: &Value) {
        let feed = match MonitorFeed::deserialize(data) {
            Ok(feed) => feed,
            Err(e) => {
                warn!(error = %e, "dropping malformed monitor feed");
                return;
            }
        };
        let Some(group) = self.groups.iter_mut().find(|group| group.id == feed.id) else {
            debug!(group = %feed.id, "feed for unknown monitor group");
            return;
        };
        if let Some(event) = group.apply(&feed) {
            group.deliver(&event);
        }
    }

    /// Reissues `monitor-subscribe` for every group not already queued.
    pub fn replay(&self, out: &mut Outbox) {
        for group in &self.groups {
            let queued = out.pending().has_pending(|reply| {
                matches!(reply, Reply::MonitorSubscribe(id) if *id == group.id)
            });
            if !queued {
                self.send_subscribe(group, out);
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
