// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for client-server communication.
//!
//! Every message travels as a [`Frame`]:
//!
//! ```text
//! { "id": "<correlation id>", "type": "<message type>", "data": { ... } }
//! ```
//!
//! A frame whose `id` matches an outstanding request is that request's reply.
//! Frames without a matching id are pushed notifications routed by `type`.
//! The structs below describe the `data` object of each message type.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message type names used on the wire.
pub mod kinds {
    pub const REALTIME_SUBSCRIBE: &str = "realtime-subscribe";
    pub const REALTIME_UNSUBSCRIBE: &str = "realtime-unsubscribe";
    pub const REALTIME_FEED: &str = "realtime-feed";
    pub const MONITOR_SUBSCRIBE: &str = "monitor-subscribe";
    pub const MONITOR_UNSUBSCRIBE: &str = "monitor-unsubscribe";
    pub const MONITOR_FEED: &str = "monitor-feed";
    pub const PUBSUB_SUBSCRIBE: &str = "pubsub-subscribe";
    pub const PUBSUB_UNSUBSCRIBE: &str = "pubsub-unsubscribe";
    pub const PUBSUB_FEED: &str = "pubsub-subscribe-feed";
    pub const SERVICE_REGISTER: &str = "service-register";
    pub const SERVICE_REQUEST: &str = "service-request";
}

/// A single message on the socket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    /// Correlation id. Present on requests and their replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Message type, e.g. `realtime-subscribe`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message body.
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    /// Creates a frame carrying a correlation id.
    pub fn new(id: impl Into<String>, kind: impl Into<String>, data: Value) -> Self {
        Frame {
            id: Some(id.into()),
            kind: kind.into(),
            data,
        }
    }

    /// Creates a frame without a correlation id (server pushes).
    pub fn push(kind: impl Into<String>, data: Value) -> Self {
        Frame {
            id: None,
            kind: kind.into(),
            data,
        }
    }

    /// Returns the frame with `token` merged into its data object.
    ///
    /// A null body becomes `{"token": ...}`. Non-object bodies are left alone.
    pub fn with_token(mut self, token: Option<&str>) -> Self {
        let Some(token) = token else {
            return self;
        };
        if self.data.is_null() {
            self.data = Value::Object(serde_json::Map::new());
        }
        if let Value::Object(map) = &mut self.data {
            map.insert("token".to_string(), Value::String(token.to_string()));
        }
        self
    }

    /// Decodes the data object into a typed message.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes a frame from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Converts a message struct into a frame body.
pub fn to_data<T: Serialize>(msg: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(msg)
}

/// The kind of change carried by a row notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Part of the initial result set.
    Initial,
    /// A row started matching the query.
    Insert,
    /// A row changed. Older servers send this as `write`.
    #[serde(alias = "write")]
    Update,
    /// A row was deleted or stopped matching.
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Initial => "initial",
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery options for a live query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveQueryOptions {
    /// Do not report the initial result set.
    #[serde(default)]
    pub skip_initial: bool,
    /// Report single changed rows instead of whole snapshots.
    #[serde(default)]
    pub changes_only: bool,
}

/// `realtime-subscribe` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    /// Subscription id.
    pub id: String,
    /// Collection or table name.
    pub group: String,
    /// Lowered filter (find document).
    #[serde(rename = "where")]
    pub filter: Value,
    /// Database identifier, e.g. `mongo`.
    pub db_type: String,
    /// Project the subscription belongs to.
    pub project: String,
    pub options: LiveQueryOptions,
}

/// `realtime-unsubscribe` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnsubscribeRequest {
    pub group: String,
    pub id: String,
    pub options: LiveQueryOptions,
}

/// Acknowledgement of a subscribe-style request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ack<D> {
    pub ack: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Initial documents, when the request produces any.
    #[serde(default = "Vec::new")]
    pub docs: Vec<D>,
}

/// Ack for `realtime-subscribe`: docs are initial feed rows.
pub type SubscribeAck = Ack<FeedRow>;

/// Ack for `monitor-subscribe`: docs are plain documents.
pub type MonitorAck = Ack<Value>;

/// One row notification, from `realtime-feed` or a subscribe ack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedRow {
    #[serde(default)]
    pub db_type: String,
    #[serde(default)]
    pub group: String,
    /// Subscription id the row is addressed to.
    #[serde(default)]
    pub id: String,
    /// Row identity: the row's primary key, a string or number.
    #[serde(default, alias = "rowId", skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<Value>,
    /// Server-assigned logical timestamp.
    #[serde(default)]
    pub time: i64,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub payload: Value,
    /// Identity clause, sent by servers that address rows by key fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub find: Option<Value>,
}

impl FeedRow {
    /// Returns the row identity: `docId`, or the canonical JSON of `find`.
    ///
    /// String keys are used as is. Other keys use their JSON text, so the
    /// numeric key `42` becomes `"42"`.
    pub fn row_id(&self) -> Option<String> {
        match &self.doc_id {
            Some(Value::String(id)) => return Some(id.clone()),
            Some(Value::Null) | None => {}
            Some(id) => return Some(id.to_string()),
        }
        self.find
            .as_ref()
            .and_then(|find| serde_json::to_string(find).ok())
    }
}

/// `monitor-subscribe` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRequest {
    /// Group id.
    pub id: String,
    pub db_type: String,
    pub group: String,
    #[serde(rename = "where")]
    pub filter: Value,
    pub project: String,
}

/// `monitor-unsubscribe` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorUnsubscribe {
    pub id: String,
    pub db_type: String,
    pub group: String,
}

/// Whether a monitor write touched one document or all matching documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteScope {
    One,
    #[default]
    All,
}

/// `monitor-feed` push body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorFeed {
    /// Group id.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub op: WriteScope,
    /// Inserted document (`op: one`).
    #[serde(default)]
    pub doc: Value,
    /// Inserted documents (`op: all`).
    #[serde(default)]
    pub docs: Vec<Value>,
    /// Documents affected by an update or delete.
    #[serde(default)]
    pub find: Value,
    /// Update document for `update` changes.
    #[serde(default)]
    pub update: Value,
}

impl MonitorFeed {
    /// Returns the inserted documents regardless of how they were sent.
    pub fn documents(&self) -> Vec<Value> {
        let mut documents = match &self.doc {
            Value::Array(docs) => docs.clone(),
            Value::Null => Vec::new(),
            doc => vec![doc.clone()],
        };
        documents.extend(self.docs.iter().cloned());
        documents
    }
}

/// `pubsub-subscribe` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PubsubSubscribeRequest {
    pub id: String,
    pub subject: String,
    pub queue: String,
    pub project: String,
}

/// `pubsub-unsubscribe` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PubsubUnsubscribeRequest {
    pub subject: String,
    pub id: String,
}

/// Reply to `pubsub-subscribe`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PubsubAck {
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PubsubAck {
    /// Returns true if the server accepted the subscription.
    pub fn accepted(&self) -> bool {
        self.status == 200
    }
}

/// A published message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PubsubMessage {
    pub subject: String,
    #[serde(default)]
    pub data: Value,
}

/// `pubsub-subscribe-feed` push body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PubsubFeed {
    /// Subscription id chosen by the server.
    pub id: String,
    pub msg: PubsubMessage,
}

/// `service-register` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceRegister {
    pub service: String,
}

/// `service-request` push body: the server invoking a registered function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceCall {
    #[serde(default)]
    pub id: String,
    pub func: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub auth: Option<Value>,
}

impl ServiceCall {
    /// Returns the caller's auth claims, treating `{}` as absent.
    pub fn auth(&self) -> Option<&Value> {
        match &self.auth {
            Some(Value::Object(map)) if map.is_empty() => None,
            Some(Value::Null) | None => None,
            Some(auth) => Some(auth),
        }
    }
}

/// `service-request` reply body sent back by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceReply {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceReply {
    pub fn ok(id: impl Into<String>, params: Value) -> Self {
        ServiceReply {
            id: id.into(),
            params: Some(params),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, error: impl Into<String>) -> Self {
        ServiceReply {
            id: id.into(),
            params: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
