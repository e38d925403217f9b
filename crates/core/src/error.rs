// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for sl-core operations.

use thiserror::Error;

/// All possible errors that can occur in sl-core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "invalid filter: {0}\n  hint: conditions look like 'field op value', e.g. userId == \"u1\""
    )]
    InvalidFilter(String),

    #[error(
        "invalid operator: '{0}'\n  hint: valid operators are: == != > < >= <= in notIn regex"
    )]
    InvalidOperator(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for sl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
