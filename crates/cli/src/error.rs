// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the `sl` command.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no server url configured\n  hint: pass --url or add url = \"wss://...\" to {0}")]
    NoUrl(String),

    #[error("subscription failed: {0}")]
    Subscription(String),

    #[error(transparent)]
    Client(#[from] spacelink::Error),

    #[error(transparent)]
    Filter(#[from] sl_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// A specialized Result type for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
