// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound frame queue and request bookkeeping.
//!
//! Every outbound frame is queued here and written by the engine in FIFO
//! order whenever a connection is up. Requests also get a pending entry so
//! their reply can be routed back.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sl_core::protocol::to_data;
use sl_core::{Frame, IdGenerator};
use tracing::warn;

use crate::pending::{PendingRequests, Reply};

pub(crate) struct Outbox {
    queue: VecDeque<Frame>,
    pending: PendingRequests,
    ids: Arc<dyn IdGenerator>,
    timeout: Duration,
}

impl Outbox {
    pub fn new(ids: Arc<dyn IdGenerator>, timeout: Duration) -> Self {
        Outbox {
            queue: VecDeque::new(),
            pending: PendingRequests::new(),
            ids,
            timeout,
        }
    }

    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }

    /// Queues a frame that expects no reply. Returns its correlation id.
    pub fn send(&mut self, kind: &str, data: Value) -> String {
        let id = self.ids.next_id();
        self.push(id.clone(), kind, data);
        id
    }

    /// Queues a request and registers where its reply goes.
    pub fn request(&mut self, kind: &str, data: Value, reply: Reply) -> String {
        let id = self.ids.next_id();
        self.request_with_id(id.clone(), kind, data, reply);
        id
    }

    /// Queues a request under an id chosen by the caller.
    pub fn request_with_id(&mut self, id: String, kind: &str, data: Value, reply: Reply) {
        self.pending.insert(id.clone(), kind, self.timeout, reply);
        self.push(id, kind, data);
    }

    /// Serializes `msg` and queues it as a frame that expects no reply.
    ///
    /// A message that cannot be serialized is logged and dropped.
    pub fn send_message<T: Serialize>(&mut self, kind: &str, msg: &T) -> Option<String> {
        match to_data(msg) {
            Ok(data) => Some(self.send(kind, data)),
            Err(e) => {
                warn!(kind, error = %e, "dropping unserializable frame");
                None
            }
        }
    }

    /// Serializes `msg` and queues it as a request. Dropped like
    /// [`send_message`](Self::send_message) if serialization fails.
    pub fn request_message<T: Serialize>(
        &mut self,
        kind: &str,
        msg: &T,
        reply: Reply,
    ) -> Option<String> {
        match to_data(msg) {
            Ok(data) => Some(self.request(kind, data, reply)),
            Err(e) => {
                warn!(kind, error = %e, "dropping unserializable request");
                None
            }
        }
    }

    /// Queues a frame under an id chosen by the caller.
    pub fn push(&mut self, id: String, kind: &str, data: Value) {
        self.queue.push_back(Frame::new(id, kind, data));
    }

    pub fn pop_front(&mut self) -> Option<Frame> {
        self.queue.pop_front()
    }

    /// Puts back a frame whose write failed.
    pub fn push_front(&mut self, frame: Frame) {
        self.queue.push_front(frame);
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    pub fn pending_mut(&mut self) -> &mut PendingRequests {
        &mut self.pending
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
