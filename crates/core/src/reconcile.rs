// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Merge row notifications into a local snapshot with timestamp conflict resolution.
//!
//! Merge rules:
//! - Unknown row: tracked on first sight; a delete creates a tombstone
//! - Known row: applied only if its timestamp is not older than the recorded one
//! - Equal timestamps: the later arrival wins
//! - Deleted rows keep a tombstone so late, older notifications stay rejected
//!
//! The visible view lists live rows in the order they were first observed.
//! Applying the same notification twice leaves the view unchanged.

use std::collections::HashMap;

use serde_json::Value;

use crate::protocol::{ChangeKind, FeedRow};

/// One row believed relevant to a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedRow {
    /// Row identity.
    pub id: String,
    /// Timestamp of the last accepted notification.
    pub time: i64,
    /// Current field values, `{}` when deleted.
    pub payload: Value,
    /// True once the row has been deleted.
    pub deleted: bool,
}

/// A single change to merge.
#[derive(Debug, Clone, PartialEq)]
pub struct RowChange {
    pub row_id: String,
    pub time: i64,
    pub kind: ChangeKind,
    pub payload: Value,
}

impl RowChange {
    pub fn new(row_id: impl Into<String>, time: i64, kind: ChangeKind, payload: Value) -> Self {
        RowChange {
            row_id: row_id.into(),
            time,
            kind,
            payload,
        }
    }

    /// Builds a change from a feed row. Returns `None` if the row has no identity.
    pub fn from_feed(row: &FeedRow) -> Option<Self> {
        let row_id = row.row_id()?;
        Some(RowChange {
            row_id,
            time: row.time,
            kind: row.kind,
            payload: row.payload.clone(),
        })
    }
}

/// What a merge did to the visible view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A row became visible.
    Inserted,
    /// A visible row's payload changed.
    Updated,
    /// A visible row was tombstoned.
    Removed,
    /// Accepted, but the view is the same as before.
    Unchanged,
    /// Rejected: older than what is recorded.
    Stale,
}

impl MergeOutcome {
    /// Returns true if the visible view changed.
    pub fn changed_view(&self) -> bool {
        matches!(
            self,
            MergeOutcome::Inserted | MergeOutcome::Updated | MergeOutcome::Removed
        )
    }
}

/// Tombstone-aware, ordered set of tracked rows for one subscription.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    rows: Vec<TrackedRow>,
    index: HashMap<String, usize>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one change.
    pub fn apply(&mut self, change: &RowChange) -> MergeOutcome {
        let deleted = change.kind == ChangeKind::Delete;
        let payload = if deleted {
            empty_payload()
        } else {
            change.payload.clone()
        };

        let Some(&pos) = self.index.get(&change.row_id) else {
            self.index.insert(change.row_id.clone(), self.rows.len());
            self.rows.push(TrackedRow {
                id: change.row_id.clone(),
                time: change.time,
                payload,
                deleted,
            });
            return if deleted {
                MergeOutcome::Unchanged
            } else {
                MergeOutcome::Inserted
            };
        };

        let row = &mut self.rows[pos];
        if row.time > change.time {
            return MergeOutcome::Stale;
        }

        let outcome = match (row.deleted, deleted) {
            (true, true) => MergeOutcome::Unchanged,
            (true, false) => MergeOutcome::Inserted,
            (false, true) => MergeOutcome::Removed,
            (false, false) if row.payload == payload => MergeOutcome::Unchanged,
            (false, false) => MergeOutcome::Updated,
        };

        row.time = change.time;
        row.payload = payload;
        row.deleted = deleted;
        outcome
    }

    /// Merges changes in order.
    ///
    /// Returns the number of changes that altered the visible view.
    pub fn apply_all(&mut self, changes: &[RowChange]) -> usize {
        changes
            .iter()
            .filter(|change| self.apply(change).changed_view())
            .count()
    }

    /// Returns a copy of the visible view: live payloads in first-seen order.
    pub fn view(&self) -> Vec<Value> {
        self.rows
            .iter()
            .filter(|row| !row.deleted)
            .map(|row| row.payload.clone())
            .collect()
    }

    /// Looks up a tracked row, tombstones included.
    pub fn get(&self, row_id: &str) -> Option<&TrackedRow> {
        self.index.get(row_id).map(|&pos| &self.rows[pos])
    }

    /// All tracked rows in first-seen order, tombstones included.
    pub fn rows(&self) -> &[TrackedRow] {
        &self.rows
    }

    /// Number of tracked rows, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows in the visible view.
    pub fn visible_len(&self) -> usize {
        self.rows.iter().filter(|row| !row.deleted).count()
    }
}

fn empty_payload() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
