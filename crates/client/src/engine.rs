// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The engine task.
//!
//! One task owns the transport, the outbound queue, the pending request table
//! and every subscription registry. It wakes on client commands, connection
//! events, inbound frames and request deadlines, handles the wake, then
//! flushes the queue. All user callbacks run on this task.

use std::collections::HashMap;
use std::sync::Arc;

use sl_core::protocol::kinds;
use sl_core::{Frame, IdGenerator};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::callbacks::{Handler, ReconnectHandler};
use crate::client::Command;
use crate::config::ClientConfig;
use crate::connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, SharedConnectionState, TransportFactory,
};
use crate::error::Error;
use crate::live::LiveRegistry;
use crate::monitor::MonitorRegistry;
use crate::outbox::Outbox;
use crate::pending::Reply;
use crate::pubsub::PubsubRegistry;
use crate::service::ServiceRegistry;
use crate::transport::{Transport, TransportResult};

/// Why the loop woke up.
enum Wake<T> {
    Command(Option<Command>),
    Connected(T),
    Inbound(TransportResult<Option<Frame>>),
    Deadline,
}

pub(crate) struct Engine<T: Transport> {
    config: ClientConfig,
    token: Option<String>,
    state: Arc<SharedConnectionState>,
    manager: ConnectionManager<T>,
    events: mpsc::Receiver<T>,
    commands: mpsc::UnboundedReceiver<Command>,
    transport: Option<T>,
    connected_once: bool,
    outbox: Outbox,
    live: LiveRegistry,
    monitors: MonitorRegistry,
    pubsub: PubsubRegistry,
    services: ServiceRegistry,
    handlers: HashMap<String, Vec<Handler>>,
    reconnect_handlers: Vec<ReconnectHandler>,
}

impl<T: Transport> Engine<T> {
    pub fn new(
        config: ClientConfig,
        factory: TransportFactory<T>,
        ids: Arc<dyn IdGenerator>,
        state: Arc<SharedConnectionState>,
        commands: mpsc::UnboundedReceiver<Command>,
    ) -> Self {
        let connection = ConnectionConfig {
            url: config.socket_url(),
            retry_delay: config.reconnect_delay(),
        };
        let (manager, events) = ConnectionManager::new(connection, factory, Arc::clone(&state));
        Engine {
            token: config.token.clone(),
            outbox: Outbox::new(ids, config.request_timeout()),
            live: LiveRegistry::new(config.project.as_str()),
            monitors: MonitorRegistry::new(config.project.as_str()),
            pubsub: PubsubRegistry::new(config.project.as_str()),
            services: ServiceRegistry::new(),
            config,
            state,
            manager,
            events,
            commands,
            transport: None,
            connected_once: false,
            handlers: HashMap::new(),
            reconnect_handlers: Vec::new(),
        }
    }

    pub async fn run(mut self) {
        debug!(url = %self.config.socket_url(), "engine started");
        loop {
            let deadline = self.outbox.pending().next_deadline();
            // Commands first, so anything a caller issued before a connection
            // event is applied before the flush that event triggers.
            let wake = tokio::select! {
                biased;
                command = self.commands.recv() => Wake::Command(command),
                Some(transport) = self.events.recv() => Wake::Connected(transport),
                inbound = recv_from(&mut self.transport) => Wake::Inbound(inbound),
                _ = sleep_until(deadline) => Wake::Deadline,
            };

            match wake {
                Wake::Command(None | Some(Command::Shutdown)) => break,
                Wake::Command(Some(command)) => self.handle_command(command),
                Wake::Connected(transport) => self.connected(transport),
                Wake::Inbound(inbound) => self.handle_inbound(inbound),
                Wake::Deadline => self.expire_requests(),
            }
            self.flush().await;
        }
        self.stop().await;
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send { id, kind, data } => self.outbox.push(id, &kind, data),
            Command::Request {
                id,
                kind,
                data,
                reply,
            } => {
                self.outbox
                    .request_with_id(id, &kind, data, Reply::Caller(reply));
            }
            Command::SetToken(token) => self.token = token,
            Command::Connect => self.start_connecting(),
            Command::LiveSubscribe(record) => self.live.subscribe(*record, &mut self.outbox),
            Command::LiveUnsubscribe(key) => self.live.unsubscribe(&key, &mut self.outbox),
            Command::MonitorSubscribe { target, listener } => {
                self.monitors.subscribe(target, listener, &mut self.outbox);
            }
            Command::MonitorUnsubscribe(id) => self.monitors.unsubscribe(&id, &mut self.outbox),
            Command::PubsubSubscribe(record) => self.pubsub.subscribe(record, &mut self.outbox),
            Command::PubsubUnsubscribe(id) => self.pubsub.unsubscribe(&id, &mut self.outbox),
            Command::StartService(service) => self.services.start(service, &mut self.outbox),
            Command::On { kind, handler } => self.handlers.entry(kind).or_default().push(handler),
            Command::OnReconnect(handler) => self.reconnect_handlers.push(handler),
            // Handled by the loop.
            Command::Shutdown => {}
        }
    }

    fn connected(&mut self, transport: T) {
        self.transport = Some(transport);
        self.state.set(ConnectionState::Connected);
        if self.connected_once {
            self.reconnected();
        }
        self.connected_once = true;
    }

    /// Reissues all subscriptions and runs the reconnect handlers.
    fn reconnected(&mut self) {
        info!(
            live = self.live.len(),
            monitors = self.monitors.len(),
            pubsub = self.pubsub.len(),
            services = self.services.len(),
            "reconnected, restoring subscriptions"
        );
        self.live.replay(&mut self.outbox);
        self.monitors.replay(&mut self.outbox);
        self.pubsub.replay(&mut self.outbox);
        self.services.replay(&mut self.outbox);
        for handler in &self.reconnect_handlers {
            handler();
        }
    }

    fn handle_inbound(&mut self, inbound: TransportResult<Option<Frame>>) {
        match inbound {
            Ok(Some(frame)) => self.handle_frame(frame),
            Ok(None) => {
                info!("connection closed by server");
                self.connection_lost();
            }
            Err(e) if !e.is_fatal() => warn!(error = %e, "dropping inbound frame"),
            Err(e) => {
                warn!(error = %e, "connection error");
                self.connection_lost();
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        let pending = self.outbox.pending_mut();
        if let Some(entry) = frame.id.as_deref().and_then(|id| pending.take(id)) {
            match entry.reply {
                Reply::Caller(tx) => {
                    let _ = tx.send(Ok(frame.data));
                }
                Reply::Subscribe(key) => self.live.on_ack(&key, frame.data, &mut self.outbox),
                Reply::MonitorSubscribe(id) => self.monitors.on_ack(&id, frame.data),
                Reply::PubsubSubscribe(id) => self.pubsub.on_ack(&id, frame.data, &mut self.outbox),
                Reply::ServiceRegister(name) => self.services.on_ack(&name, frame.data),
            }
            return;
        }

        let mut handled = true;
        match frame.kind.as_str() {
            kinds::REALTIME_FEED => self.live.on_feed(&frame.data),
            kinds::MONITOR_FEED => self.monitors.on_feed(&frame.data),
            kinds::PUBSUB_FEED => self.pubsub.on_feed(&frame.data),
            kinds::SERVICE_REQUEST => {
                self.services
                    .on_call(&frame.data, frame.id.as_deref(), &mut self.outbox)
            }
            _ => handled = false,
        }
        if let Some(handlers) = self.handlers.get(&frame.kind) {
            handlers.iter().for_each(|handler| handler(&frame.data));
            handled = true;
        }
        if !handled {
            debug!(kind = %frame.kind, id = ?frame.id, "unhandled frame");
        }
    }

    fn expire_requests(&mut self) {
        for entry in self.outbox.pending_mut().take_expired(Instant::now()) {
            debug!(id = %entry.id, kind = %entry.kind, sent = entry.sent, "request timed out");
            let err = Error::RequestTimeout {
                kind: entry.kind,
                id: entry.id,
            };
            match entry.reply {
                Reply::Caller(tx) => {
                    let _ = tx.send(Err(err));
                }
                Reply::Subscribe(key) => self.live.fail(&key, err, &mut self.outbox),
                Reply::MonitorSubscribe(id) => self.monitors.fail(&id, err),
                Reply::PubsubSubscribe(id) => self.pubsub.fail(&id, err, &mut self.outbox),
                Reply::ServiceRegister(name) => {
                    warn!(service = %name, "service registration timed out")
                }
            }
        }
    }

    /// Writes queued frames in order while the connection is up.
    async fn flush(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            if self.outbox.queued() > 0 {
                self.start_connecting();
            }
            return;
        };

        while let Some(frame) = self.outbox.pop_front() {
            let id = frame.id.clone();
            let wire = frame.clone().with_token(self.token.as_deref());
            match transport.send(wire).await {
                Ok(()) => {
                    if let Some(id) = id {
                        self.outbox.pending_mut().mark_sent(&id);
                    }
                }
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, kind = %frame.kind, "dropping unencodable frame")
                }
                Err(e) => {
                    warn!(error = %e, "write failed");
                    self.outbox.push_front(frame);
                    self.connection_lost();
                    return;
                }
            }
        }
    }

    fn start_connecting(&self) {
        if self.transport.is_none() && self.state.get() == ConnectionState::Disconnected {
            self.manager.spawn_connect_task();
        }
    }

    fn connection_lost(&mut self) {
        self.transport = None;
        self.state.set(ConnectionState::Disconnected);
        self.outbox.pending_mut().connection_lost();
        let delay = self.config.reconnect_delay();
        info!(retry_in = ?delay, queued = self.outbox.queued(), "connection lost");
        self.manager.spawn_delayed_connect(delay);
    }

    async fn stop(&mut self) {
        self.manager.cancel();
        if self.transport.is_some() {
            self.flush().await;
        }
        if let Some(mut transport) = self.transport.take() {
            let _ = transport.disconnect().await;
        }
        self.outbox.pending_mut().close();
        self.state.set(ConnectionState::Disconnected);
        info!(dropped = self.outbox.queued(), "client stopped");
    }
}

/// Next inbound frame, or never when there is no connection.
async fn recv_from<T: Transport>(transport: &mut Option<T>) -> TransportResult<Option<Frame>> {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
