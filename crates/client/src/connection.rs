// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background connection management.
//!
//! Connection attempts run in a spawned task so the engine keeps serving
//! commands and timers while a connect is in flight. Attempts repeat with a
//! fixed delay until one succeeds or the manager is cancelled.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::Transport;

/// Lifecycle state of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        })
    }
}

/// Connection state visible to the engine, the connect task and client handles.
///
/// Uses atomic fields for lock-free reads.
#[derive(Debug, Default)]
pub struct SharedConnectionState {
    state: AtomicU8,
    /// Attempts made by the current connect task.
    attempt: AtomicU32,
}

impl SharedConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.get() == ConnectionState::Connecting
    }

    /// Human-readable status, e.g. `connecting (attempt 3)`.
    pub fn status_string(&self) -> String {
        match (self.get(), self.attempt()) {
            (ConnectionState::Connecting, attempt) if attempt > 0 => {
                format!("connecting (attempt {attempt})")
            }
            (state, _) => state.to_string(),
        }
    }
}

/// Configuration for the connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Socket URL to connect to.
    pub url: String,
    /// Delay between attempts.
    pub retry_delay: Duration,
}

/// Builds a fresh transport for each attempt.
pub type TransportFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Manages background connect tasks.
pub struct ConnectionManager<T: Transport> {
    config: ConnectionConfig,
    factory: TransportFactory<T>,
    shared_state: Arc<SharedConnectionState>,
    event_tx: mpsc::Sender<T>,
    cancel_token: CancellationToken,
}

impl<T: Transport> ConnectionManager<T> {
    /// Create a new connection manager.
    ///
    /// Returns the manager and a receiver for connected transports.
    pub fn new(
        config: ConnectionConfig,
        factory: TransportFactory<T>,
        shared_state: Arc<SharedConnectionState>,
    ) -> (Self, mpsc::Receiver<T>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let manager = Self {
            config,
            factory,
            shared_state,
            event_tx,
            cancel_token: CancellationToken::new(),
        };
        (manager, event_rx)
    }

    /// Start connecting now.
    ///
    /// The state is `Connecting` as soon as this returns, so callers can use
    /// it to avoid starting a second task.
    pub fn spawn_connect_task(&self) {
        self.spawn_delayed_connect(Duration::ZERO);
    }

    /// Start connecting after `delay`.
    pub fn spawn_delayed_connect(&self, delay: Duration) {
        self.shared_state.set(ConnectionState::Connecting);
        self.shared_state.set_attempt(0);

        let config = self.config.clone();
        let factory = Arc::clone(&self.factory);
        let shared_state = Arc::clone(&self.shared_state);
        let event_tx = self.event_tx.clone();
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    _ = cancel_token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            connect_with_retry(config, factory, shared_state, event_tx, cancel_token).await;
        });
    }

    /// Cancel any pending connection attempts.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

/// Connect task: fixed delay between attempts, no limit on their number.
async fn connect_with_retry<T: Transport>(
    config: ConnectionConfig,
    factory: TransportFactory<T>,
    shared_state: Arc<SharedConnectionState>,
    event_tx: mpsc::Sender<T>,
    cancel_token: CancellationToken,
) {
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);
        shared_state.set_attempt(attempt);
        debug!(url = %config.url, attempt, "connecting");

        let mut transport = factory();
        let result = tokio::select! {
            _ = cancel_token.cancelled() => return,
            result = transport.connect(&config.url) => result,
        };

        let error = match result {
            Ok(()) => {
                info!(url = %config.url, attempt, "connected");
                // Connected is set by the engine once it owns the transport.
                let _ = event_tx.send(transport).await;
                return;
            }
            Err(e) => e.to_string(),
        };

        warn!(
            url = %config.url,
            attempt,
            %error,
            retry_in = ?config.retry_delay,
            "connection failed"
        );
        tokio::select! {
            _ = cancel_token.cancelled() => return,
            _ = tokio::time::sleep(config.retry_delay) => {}
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
