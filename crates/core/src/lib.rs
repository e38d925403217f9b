// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! sl-core: Shared library for the spacelink realtime client
//!
//! This crate provides the wire protocol types, filter expressions, the
//! snapshot reconciler, and id generation used by the spacelink client and
//! the `sl` command-line tool.

pub mod error;
pub mod filter;
pub mod id;
pub mod protocol;
pub mod reconcile;

pub use error::{Error, Result};
pub use filter::{lower, matches, parse_filter, parse_filters, Expr, Op};
pub use id::{IdGenerator, SequentialIds, UuidGenerator};
pub use protocol::{ChangeKind, Frame, LiveQueryOptions};
pub use reconcile::{MergeOutcome, Reconciler, RowChange, TrackedRow};
