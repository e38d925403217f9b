// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration can be built in code or loaded from a TOML file:
//!
//! ```toml
//! url = "https://api.example.com/"
//! project = "todo-app"
//! token = "..."
//! reconnect_delay_ms = 5000
//! request_timeout_ms = 10000
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path appended to the base URL to reach the socket endpoint.
const SOCKET_PATH: &str = "v1/json/socket";

/// Connection and request settings for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the backend (`http(s)://` or `ws(s)://`).
    pub url: String,
    /// Project every subscription is scoped to.
    #[serde(default)]
    pub project: String,
    /// Bearer token injected into every outbound frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Delay before each reconnection attempt in milliseconds (default: 5000).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Time to wait for a reply in milliseconds (default: 10000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    10000
}

impl ClientConfig {
    /// Creates a configuration with default timings.
    pub fn new(url: impl Into<String>, project: impl Into<String>) -> Self {
        ClientConfig {
            url: url.into(),
            project: project.into(),
            token: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config: ClientConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the URL has a supported scheme.
    pub fn validate(&self) -> Result<()> {
        let supported = ["http://", "https://", "ws://", "wss://"];
        if !supported.iter().any(|scheme| self.url.starts_with(scheme)) {
            return Err(Error::Config(format!(
                "unsupported url '{}'\n  hint: use http://, https://, ws:// or wss://",
                self.url
            )));
        }
        Ok(())
    }

    /// Returns the WebSocket URL of the socket endpoint.
    ///
    /// `http(s)://host/` becomes `ws(s)://host/v1/json/socket`. WebSocket URLs
    /// are used as given.
    pub fn socket_url(&self) -> String {
        let url = &self.url;
        let rest = if let Some(rest) = url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return url.clone();
        };

        if rest.ends_with('/') {
            format!("{rest}{SOCKET_PATH}")
        } else {
            format!("{rest}/{SOCKET_PATH}")
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
