// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Live queries.
//!
//! A live query subscribes to a filtered collection and keeps a local
//! snapshot of the matching rows. The server sends the initial rows with its
//! acknowledgement and then streams `realtime-feed` notifications, which are
//! merged by a [`Reconciler`] before the caller's callback runs.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};
use sl_core::protocol::{
    kinds, ChangeKind, FeedRow, LiveQueryOptions, SubscribeAck, SubscribeRequest,
    UnsubscribeRequest,
};
use sl_core::{lower, Expr, MergeOutcome, Reconciler, RowChange};
use tracing::{debug, warn};

use crate::callbacks::{Callbacks, Shared};
use crate::client::{Client, Command};
use crate::error::Error;
use crate::outbox::Outbox;
use crate::pending::Reply;

/// Identifies one live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    /// Database identifier, e.g. `mongo`.
    pub db: String,
    /// Collection or table name.
    pub group: String,
    /// Subscription id.
    pub id: String,
}

impl SubscriptionKey {
    pub fn new(db: impl Into<String>, group: impl Into<String>, id: impl Into<String>) -> Self {
        SubscriptionKey {
            db: db.into(),
            group: group.into(),
            id: id.into(),
        }
    }
}

/// What a live query callback receives.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// The full visible snapshot after a change.
    ///
    /// `changed` is the payload of the row that changed (its identity for
    /// deletes), absent for the initial snapshot.
    Snapshot {
        docs: Vec<Value>,
        kind: ChangeKind,
        changed: Option<Value>,
    },
    /// A single changed row, delivered in changes-only mode.
    Change { kind: ChangeKind, doc: Value },
}

/// Builder for a live query, created by [`Client::live_query`].
#[must_use]
pub struct LiveQuery {
    client: Client,
    db: String,
    collection: String,
    find: Value,
    options: LiveQueryOptions,
}

impl LiveQuery {
    pub(crate) fn new(client: Client, db: &str, collection: &str) -> Self {
        LiveQuery {
            client,
            db: db.to_string(),
            collection: collection.to_string(),
            find: json!({}),
            options: LiveQueryOptions::default(),
        }
    }

    /// Restricts the query to rows matching `expr`.
    pub fn filter(mut self, expr: &Expr) -> Self {
        self.find = lower(expr);
        self
    }

    /// Uses a find document as given.
    pub fn find(mut self, find: Value) -> Self {
        self.find = find;
        self
    }

    pub fn options(mut self, options: LiveQueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Do not report the initial result set.
    pub fn skip_initial(mut self) -> Self {
        self.options.skip_initial = true;
        self
    }

    /// Report single changed rows instead of snapshots.
    ///
    /// Implies [`skip_initial`](Self::skip_initial).
    pub fn changes_only(mut self) -> Self {
        self.options.changes_only = true;
        self.options.skip_initial = true;
        self
    }

    /// Starts the subscription.
    ///
    /// `on_event` runs on the client's event loop for every delivered change.
    /// `on_error` runs at most once, after which the subscription is gone.
    pub fn subscribe(
        self,
        on_event: impl Fn(&LiveEvent) + Send + Sync + 'static,
        on_error: impl Fn(&Error) + Send + Sync + 'static,
    ) -> LiveSubscription {
        let key = SubscriptionKey::new(self.db, self.collection, self.client.next_id());
        let shared = Shared::new();
        let record = LiveRecord {
            key: key.clone(),
            find: self.find,
            options: self.options,
            callbacks: Callbacks::new(on_event, on_error),
            shared: shared.clone(),
            rows: Reconciler::new(),
        };
        self.client
            .command(Command::LiveSubscribe(Box::new(record)));
        LiveSubscription {
            client: self.client,
            key,
            shared,
        }
    }
}

/// Handle to an active live query.
#[derive(Debug, Clone)]
pub struct LiveSubscription {
    client: Client,
    key: SubscriptionKey,
    shared: Shared,
}

impl LiveSubscription {
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Copy of the latest visible snapshot.
    pub fn snapshot(&self) -> Vec<Value> {
        self.shared.view()
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Stops the subscription.
    ///
    /// No callback runs after this returns, even for notifications already
    /// in flight. Calling it again does nothing.
    pub fn unsubscribe(&self) {
        if self.shared.deactivate() {
            self.client
                .command(Command::LiveUnsubscribe(self.key.clone()));
        }
    }
}

/// Engine-side state of one live query.
#[derive(Debug)]
pub(crate) struct LiveRecord {
    key: SubscriptionKey,
    find: Value,
    options: LiveQueryOptions,
    callbacks: Callbacks<LiveEvent>,
    shared: Shared,
    rows: Reconciler,
}

impl LiveRecord {
    fn deliver(&self, event: &LiveEvent) {
        if self.shared.is_active() {
            self.callbacks.event(event);
        }
    }

    fn publish_view(&self) {
        self.shared.set_view(self.rows.view());
    }

    /// Merges the rows carried by a positive ack and reports them once.
    fn merge_initial(&mut self, docs: &[FeedRow]) {
        let mut changes = Vec::new();
        for row in docs {
            if let Some((outcome, unseen, change)) = self.merge(row) {
                if reportable(outcome, unseen) {
                    changes.push(LiveEvent::Change {
                        kind: row.kind,
                        doc: changed_doc(row, &change),
                    });
                }
            }
        }
        self.publish_view();

        if self.options.skip_initial {
            return;
        }
        if self.options.changes_only {
            changes.iter().for_each(|event| self.deliver(event));
        } else {
            self.deliver(&LiveEvent::Snapshot {
                docs: self.rows.view(),
                kind: ChangeKind::Initial,
                changed: None,
            });
        }
    }

    /// Merges one pushed notification and reports it.
    fn merge_feed(&mut self, row: &FeedRow) {
        let Some((outcome, unseen, change)) = self.merge(row) else {
            return;
        };
        if outcome.changed_view() {
            self.publish_view();
        }
        if self.options.skip_initial && row.kind == ChangeKind::Initial {
            return;
        }

        if self.options.changes_only {
            if reportable(outcome, unseen) {
                self.deliver(&LiveEvent::Change {
                    kind: row.kind,
                    doc: changed_doc(row, &change),
                });
            }
        } else {
            self.deliver(&LiveEvent::Snapshot {
                docs: self.rows.view(),
                kind: row.kind,
                changed: Some(changed_doc(row, &change)),
            });
        }
    }

    fn merge(&mut self, row: &FeedRow) -> Option<(MergeOutcome, bool, RowChange)> {
        let Some(change) = RowChange::from_feed(row) else {
            warn!(subscription = %self.key.id, "dropping row without identity");
            return None;
        };
        let unseen = self.rows.get(&change.row_id).is_none();
        let outcome = self.rows.apply(&change);
        debug!(
            subscription = %self.key.id,
            row = %change.row_id,
            kind = %row.kind,
            ?outcome,
            "merged row"
        );
        Some((outcome, unseen, change))
    }
}

/// Changes-only mode reports everything except stale and repeated rows.
///
/// A delete for a row never seen is still reported: with `skipInitial` the
/// client has not seen most rows.
fn reportable(outcome: MergeOutcome, unseen: bool) -> bool {
    match outcome {
        MergeOutcome::Stale => false,
        MergeOutcome::Unchanged => unseen,
        _ => true,
    }
}

/// The payload reported for a change: the row, or its identity for deletes.
fn changed_doc(row: &FeedRow, change: &RowChange) -> Value {
    if row.kind != ChangeKind::Delete {
        return change.payload.clone();
    }
    match &row.find {
        Some(find) => find.clone(),
        None => json!({ "_id": change.row_id }),
    }
}

/// All live queries of one client.
#[derive(Debug)]
pub(crate) struct LiveRegistry {
    project: String,
    records: HashMap<SubscriptionKey, LiveRecord>,
}

impl LiveRegistry {
    pub fn new(project: impl Into<String>) -> Self {
        LiveRegistry {
            project: project.into(),
            records: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn subscribe(&mut self, record: LiveRecord, out: &mut Outbox) {
        debug!(subscription = %record.key.id, group = %record.key.group, "subscribing");
        self.send_subscribe(&record, out);
        self.records.insert(record.key.clone(), record);
    }

    fn send_subscribe(&self, record: &LiveRecord, out: &mut Outbox) {
        let request = SubscribeRequest {
            id: record.key.id.clone(),
            group: record.key.group.clone(),
            filter: record.find.clone(),
            db_type: record.key.db.clone(),
            project: self.project.clone(),
            options: record.options,
        };
        out.request_message(
            kinds::REALTIME_SUBSCRIBE,
            &request,
            Reply::Subscribe(record.key.clone()),
        );
    }

    /// Removes a subscription and tells the server, best effort.
    pub fn unsubscribe(&mut self, key: &SubscriptionKey, out: &mut Outbox) {
        if let Some(record) = self.records.remove(key) {
            record.shared.deactivate();
            send_unsubscribe(&record, out);
        }
    }

    /// Reports a failed subscribe to its owner and removes it.
    pub fn fail(&mut self, key: &SubscriptionKey, err: Error, out: &mut Outbox) {
        let Some(record) = self.records.remove(key) else {
            return;
        };
        warn!(subscription = %key.id, error = %err, "live query failed");
        if record.shared.deactivate() {
            record.callbacks.error(&err);
        }
        send_unsubscribe(&record, out);
    }

    /// Handles the reply to a `realtime-subscribe` request.
    pub fn on_ack(&mut self, key: &SubscriptionKey, data: Value, out: &mut Outbox) {
        let ack: SubscribeAck = match serde_json::from_value(data) {
            Ok(ack) => ack,
            Err(e) => return self.fail(key, Error::MalformedFrame(e.to_string()), out),
        };
        if !ack.ack {
            let reason = ack
                .error
                .unwrap_or_else(|| "rejected by server".to_string());
            return self.fail(key, Error::SubscribeRejected(reason), out);
        }
        match self.records.get_mut(key) {
            Some(record) => record.merge_initial(&ack.docs),
            None => debug!(subscription = %key.id, "ack for removed subscription"),
        }
    }

    /// Handles a `realtime-feed` notification.
    pub fn on_feed(&mut self, data: &Value) {
        let row: FeedRow = match FeedRow::deserialize(data) {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "dropping malformed realtime feed");
                return;
            }
        };
        match self.find_mut(&row) {
            Some(record) => record.merge_feed(&row),
            None => debug!(subscription = %row.id, "feed for unknown subscription"),
        }
    }

    fn find_mut(&mut self, row: &FeedRow) -> Option<&mut LiveRecord> {
        let key = SubscriptionKey::new(row.db_type.as_str(), row.group.as_str(), row.id.as_str());
        if self.records.contains_key(&key) {
            return self.records.get_mut(&key);
        }
        // Some servers omit dbType/group on feed rows.
        self.records.values_mut().find(|record| {
            record.key.id == row.id
                && (row.db_type.is_empty() || row.db_type == record.key.db)
                && (row.group.is_empty() || row.group == record.key.group)
        })
    }

    /// Reissues every subscription whose subscribe is not already queued.
    pub fn replay(&self, out: &mut Outbox) {
        for record in self.records.values() {
            let queued = out.pending().has_pending(|reply| {
                matches!(reply, Reply::Subscribe(k) if *k == record.key)
            });
            if !queued {
                self.send_subscribe(record, out);
            }
        }
    }
}

fn send_unsubscribe(record: &LiveRecord, out: &mut Outbox) {
    let request = UnsubscribeRequest {
        group: record.key.group.clone(),
        id: record.key.id.clone(),
        options: record.options,
    };
    out.send_message(kinds::REALTIME_UNSUBSCRIBE, &request);
}

#[cfg(test)]
#[path = "live_tests.rs"]
mod tests;
