// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The client handle.
//!
//! A [`Client`] is a cheap, cloneable handle to an engine task that owns the
//! connection and all subscription state. Every method sends a command to the
//! engine and returns without waiting for the network.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use sl_core::{IdGenerator, UuidGenerator};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::callbacks::{Handler, ReconnectHandler};
use crate::config::ClientConfig;
use crate::connection::{ConnectionState, SharedConnectionState};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::live::{LiveQuery, LiveRecord, SubscriptionKey};
use crate::monitor::{MonitorListener, MonitorQuery, MonitorTarget};
use crate::pubsub::{PubSub, PubsubRecord};
use crate::service::Service;
use crate::transport::{Transport, WebSocketTransport};

/// Commands sent from client handles to the engine.
pub(crate) enum Command {
    Send {
        id: String,
        kind: String,
        data: Value,
    },
    Request {
        id: String,
        kind: String,
        data: Value,
        reply: oneshot::Sender<Result<Value>>,
    },
    SetToken(Option<String>),
    Connect,
    LiveSubscribe(Box<LiveRecord>),
    LiveUnsubscribe(SubscriptionKey),
    MonitorSubscribe {
        target: MonitorTarget,
        listener: MonitorListener,
    },
    MonitorUnsubscribe(String),
    PubsubSubscribe(PubsubRecord),
    PubsubUnsubscribe(String),
    StartService(Service),
    On { kind: String, handler: Handler },
    OnReconnect(ReconnectHandler),
    Shutdown,
}

/// Handle to a realtime connection.
///
/// Cloning is cheap; all clones share one connection. The engine stops when
/// [`shutdown`](Client::shutdown) is called or the last handle, including
/// subscription handles, is dropped.
#[derive(Clone)]
pub struct Client {
    commands: mpsc::UnboundedSender<Command>,
    ids: Arc<dyn IdGenerator>,
    state: Arc<SharedConnectionState>,
}

impl Client {
    /// Creates a client that connects over WebSocket.
    ///
    /// Must be called from within a tokio runtime. The connection is opened
    /// lazily by the first outbound message or by [`connect`](Client::connect).
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_parts(config, WebSocketTransport::new, Arc::new(UuidGenerator))
    }

    /// Creates a client with a custom transport and id generator.
    pub fn with_parts<T, F>(
        config: ClientConfig,
        factory: F,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self>
    where
        T: Transport,
        F: Fn() -> T + Send + Sync + 'static,
    {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Config(format!("a tokio runtime is required: {e}")))?;

        let (commands, rx) = mpsc::unbounded_channel();
        let state = Arc::new(SharedConnectionState::new());
        let engine = Engine::new(
            config,
            Arc::new(factory),
            Arc::clone(&ids),
            Arc::clone(&state),
            rx,
        );
        runtime.spawn(engine.run());

        Ok(Client {
            commands,
            ids,
            state,
        })
    }

    pub(crate) fn next_id(&self) -> String {
        self.ids.next_id()
    }

    pub(crate) fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("engine stopped, dropping command");
        }
    }

    /// Queues a message and returns its correlation id.
    ///
    /// Never fails: while disconnected the message waits in the outbound
    /// queue and a connection attempt starts.
    pub fn send(&self, kind: &str, data: Value) -> String {
        let id = self.next_id();
        self.command(Command::Send {
            id: id.clone(),
            kind: kind.to_string(),
            data,
        });
        id
    }

    /// Sends a message and waits for the reply with the same id.
    ///
    /// Fails with [`Error::RequestTimeout`] if no reply arrives in time, or
    /// [`Error::ConnectionLost`] if the connection drops after the message
    /// was written.
    pub async fn request(&self, kind: &str, data: Value) -> Result<Value> {
        let (reply, rx) = oneshot::channel();
        let id = self.next_id();
        self.commands
            .send(Command::Request {
                id,
                kind: kind.to_string(),
                data,
                reply,
            })
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)?
    }

    /// Sets the token injected into outbound messages.
    ///
    /// Applies to every message written afterwards, including ones already
    /// queued.
    pub fn set_token(&self, token: Option<String>) {
        self.command(Command::SetToken(token));
    }

    /// Starts connecting without waiting for an outbound message.
    pub fn connect(&self) {
        self.command(Command::Connect);
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Human-readable connection status.
    pub fn status(&self) -> String {
        self.state.status_string()
    }

    /// Starts building a live query on `collection`.
    pub fn live_query(&self, db: &str, collection: &str) -> LiveQuery {
        LiveQuery::new(self.clone(), db, collection)
    }

    /// Starts building a monitor subscription on `collection`.
    pub fn monitor(&self, db: &str, collection: &str) -> MonitorQuery {
        MonitorQuery::new(self.clone(), db, collection)
    }

    pub fn pubsub(&self) -> PubSub {
        PubSub::new(self.clone())
    }

    /// Registers a service and answers its requests until shutdown.
    pub fn start_service(&self, service: Service) {
        self.command(Command::StartService(service));
    }

    /// Runs `handler` for every pushed message of type `kind`.
    ///
    /// Handlers run on the event loop after any built-in handling.
    pub fn on(&self, kind: &str, handler: impl Fn(&Value) + Send + Sync + 'static) {
        self.command(Command::On {
            kind: kind.to_string(),
            handler: Arc::new(handler),
        });
    }

    /// Runs `handler` after every reconnection, not after the first connection.
    pub fn on_reconnect(&self, handler: impl Fn() + Send + Sync + 'static) {
        self.command(Command::OnReconnect(Arc::new(handler)));
    }

    /// Stops the engine and closes the connection.
    ///
    /// Outstanding requests fail with [`Error::Closed`].
    pub fn shutdown(&self) {
        self.command(Command::Shutdown);
    }

    /// Returns true once the engine has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state.get())
            .finish()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
