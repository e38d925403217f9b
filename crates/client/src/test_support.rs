// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory server and transport for engine tests.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sl_core::{Frame, SequentialIds};
use tokio::sync::{mpsc, watch};

use crate::client::Client;
use crate::config::ClientConfig;
use crate::transport::{Transport, TransportError, TransportFuture};

/// How long a test waits for a frame before failing.
const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(100);

struct ServerShared {
    sessions: mpsc::UnboundedSender<Session>,
    gate: watch::Sender<bool>,
    failures: AtomicU32,
    connects: AtomicU32,
}

/// Accepts connections from [`MockTransport`]s.
pub(crate) struct MockServer {
    shared: Arc<ServerShared>,
    sessions: mpsc::UnboundedReceiver<Session>,
}

impl MockServer {
    pub fn new() -> Self {
        let (tx, sessions) = mpsc::unbounded_channel();
        let (gate, _) = watch::channel(true);
        let shared = ServerShared {
            sessions: tx,
            gate,
            failures: AtomicU32::new(0),
            connects: AtomicU32::new(0),
        };
        MockServer {
            shared: Arc::new(shared),
            sessions,
        }
    }

    pub fn factory(&self) -> impl Fn() -> MockTransport + Send + Sync + 'static {
        let shared = Arc::clone(&self.shared);
        move || MockTransport {
            server: Arc::clone(&shared),
            link: None,
        }
    }

    /// Waits for the next client connection.
    pub async fn accept(&mut self) -> Session {
        match tokio::time::timeout(WAIT, self.sessions.recv()).await {
            Ok(Some(session)) => session,
            _ => panic!("no connection within {WAIT:?}"),
        }
    }

    /// Asserts no connection arrives for a short while.
    pub async fn assert_no_connection(&mut self) {
        if let Ok(Some(_)) = tokio::time::timeout(QUIET, self.sessions.recv()).await {
            panic!("unexpected connection");
        }
    }

    /// Holds connection attempts until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.shared.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.shared.gate.send_replace(true);
    }

    /// Refuses the next `n` connection attempts.
    pub fn fail_next(&self, n: u32) {
        self.shared.failures.store(n, Ordering::SeqCst);
    }

    /// Connection attempts seen so far, refused ones included.
    pub fn connects(&self) -> u32 {
        self.shared.connects.load(Ordering::SeqCst)
    }
}

/// Server end of one connection. Dropping it closes the connection.
pub(crate) struct Session {
    outgoing: mpsc::UnboundedReceiver<Frame>,
    incoming: mpsc::UnboundedSender<Frame>,
}

impl Session {
    /// Next frame written by the client.
    pub async fn next_frame(&mut self) -> Frame {
        match tokio::time::timeout(WAIT, self.outgoing.recv()).await {
            Ok(Some(frame)) => frame,
            Ok(None) => panic!("client closed the connection"),
            Err(_) => panic!("no frame within {WAIT:?}"),
        }
    }

    /// Next frame, which must be of type `kind`.
    pub async fn expect(&mut self, kind: &str) -> Frame {
        let frame = self.next_frame().await;
        assert_eq!(frame.kind, kind, "unexpected frame: {frame:?}");
        frame
    }

    /// Asserts the client writes nothing for a short while.
    pub async fn assert_quiet(&mut self) {
        if let Ok(Some(frame)) = tokio::time::timeout(QUIET, self.outgoing.recv()).await {
            panic!("unexpected frame: {frame:?}");
        }
    }

    /// Answers `request` with the same id and type.
    pub fn reply(&self, request: &Frame, data: Value) {
        let id = request.id.clone().unwrap();
        self.incoming
            .send(Frame::new(id, request.kind.clone(), data))
            .unwrap();
    }

    /// Pushes an unsolicited message.
    pub fn push(&self, kind: &str, data: Value) {
        self.incoming.send(Frame::push(kind, data)).unwrap();
    }
}

struct Link {
    to_server: mpsc::UnboundedSender<Frame>,
    from_server: mpsc::UnboundedReceiver<Frame>,
}

/// Client end of a [`MockServer`] connection.
pub(crate) struct MockTransport {
    server: Arc<ServerShared>,
    link: Option<Link>,
}

impl Transport for MockTransport {
    fn connect(&mut self, _url: &str) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut gate = self.server.gate.subscribe();
            loop {
                let open = *gate.borrow_and_update();
                if open || gate.changed().await.is_err() {
                    break;
                }
            }

            self.server.connects.fetch_add(1, Ordering::SeqCst);
            let refused = self
                .server
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(TransportError::ConnectionFailed("refused".to_string()));
            }

            let (to_server, outgoing) = mpsc::unbounded_channel();
            let (incoming, from_server) = mpsc::unbounded_channel();
            self.server
                .sessions
                .send(Session { outgoing, incoming })
                .map_err(|_| TransportError::ConnectionFailed("server gone".to_string()))?;
            self.link = Some(Link {
                to_server,
                from_server,
            });
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            self.link = None;
            Ok(())
        })
    }

    fn send(&mut self, frame: Frame) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let link = self.link.as_ref().ok_or(TransportError::ConnectionClosed)?;
            if link.to_server.send(frame).is_err() {
                self.link = None;
                return Err(TransportError::SendFailed("server closed".to_string()));
            }
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<Frame>> {
        Box::pin(async move {
            let link = self.link.as_mut().ok_or(TransportError::ConnectionClosed)?;
            match link.from_server.recv().await {
                Some(frame) => Ok(Some(frame)),
                None => {
                    self.link = None;
                    Ok(None)
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.link.is_some()
    }
}

/// Fast timings so reconnects and timeouts happen within a test.
pub(crate) fn test_config() -> ClientConfig {
    let mut config = ClientConfig::new("ws://mock.test/v1/json/socket", "test-app");
    config.reconnect_delay_ms = 20;
    config.request_timeout_ms = 300;
    config
}

pub(crate) fn test_client(server: &MockServer) -> Client {
    test_client_with(server, test_config())
}

pub(crate) fn test_client_with(server: &MockServer, config: ClientConfig) -> Client {
    Client::with_parts(config, server.factory(), Arc::new(SequentialIds::new("id"))).unwrap()
}

/// Collects callback values for assertions from the test task.
pub(crate) fn recorder<T: Send + 'static>() -> (
    impl Fn(T) + Send + Sync + 'static,
    mpsc::UnboundedReceiver<T>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    (move |value: T| drop(tx.send(value)), rx)
}

/// Next recorded value, failing after a timeout.
pub(crate) async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    match tokio::time::timeout(WAIT, rx.recv()).await {
        Ok(Some(value)) => value,
        _ => panic!("no callback within {WAIT:?}"),
    }
}

/// Asserts nothing is recorded for a short while.
pub(crate) async fn assert_none<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    if let Ok(Some(value)) = tokio::time::timeout(QUIET, rx.recv()).await {
        panic!("unexpected callback: {value:?}");
    }
}
