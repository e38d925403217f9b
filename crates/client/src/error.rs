// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::transport::TransportError;

/// All possible errors that can occur in the spacelink client.
///
/// Connectivity failures are retried internally and never surface here on
/// their own. They reach a caller only as [`Error::ConnectionLost`] for a
/// request that was already on the wire.
#[derive(Debug, Error)]
pub enum Error {
    #[error("connection lost before a reply arrived")]
    ConnectionLost,

    #[error("request timed out: no reply to '{kind}' request {id}")]
    RequestTimeout { kind: String, id: String },

    #[error("subscription rejected: {0}")]
    SubscribeRejected(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("client is shut down")]
    Closed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] sl_core::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// A specialized Result type for spacelink operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
