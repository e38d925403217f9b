// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! spacelink: realtime client for a hosted data backend
//!
//! One socket carries live queries, monitor groups, pub/sub subscriptions,
//! services and plain request/reply messages. The connection opens lazily,
//! reconnects on failure and restores every subscription after a reconnect.
//!
//! ```no_run
//! # async fn demo() -> spacelink::Result<()> {
//! use spacelink::{Client, ClientConfig, Expr};
//!
//! let client = Client::new(ClientConfig::new("https://api.example.com", "todo-app"))?;
//! let todos = client
//!     .live_query("mongo", "todos")
//!     .filter(&Expr::eq("userId", "u1"))
//!     .subscribe(|event| println!("{event:?}"), |err| eprintln!("{err}"));
//! # let _ = todos;
//! # Ok(())
//! # }
//! ```

mod callbacks;
pub mod client;
pub mod config;
pub mod connection;
mod engine;
pub mod error;
pub mod live;
pub mod monitor;
mod outbox;
mod pending;
pub mod pubsub;
pub mod service;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use config::ClientConfig;
pub use connection::ConnectionState;
pub use error::{Error, Result};
pub use live::{LiveEvent, LiveQuery, LiveSubscription, SubscriptionKey};
pub use monitor::{MonitorEvent, MonitorKind, MonitorQuery, MonitorSubscription};
pub use pubsub::{PubSub, PubsubMessage, PubsubSubscription};
pub use service::{Service, ServiceFn};
pub use transport::{
    Transport, TransportError, TransportFuture, TransportResult, WebSocketTransport,
};

pub use sl_core::{
    ChangeKind, Expr, IdGenerator, LiveQueryOptions, Op, SequentialIds, UuidGenerator,
};
