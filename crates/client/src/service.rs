// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Services: named functions the server can invoke over the socket.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use sl_core::protocol::{kinds, Ack, ServiceCall, ServiceRegister, ServiceReply};
use tracing::{debug, info, warn};

use crate::outbox::Outbox;
use crate::pending::Reply;

/// Reply sent when a request names a function no service registered.
const UNKNOWN_FUNCTION: &str = "No function registered on the function";

/// A service function: `(params, auth) -> result`.
///
/// `auth` is `None` when the caller is anonymous.
pub type ServiceFn = Arc<dyn Fn(Value, Option<Value>) -> Value + Send + Sync>;

/// A named set of functions, started with [`Client::start_service`](crate::Client::start_service).
#[derive(Clone)]
pub struct Service {
    name: String,
    functions: HashMap<String, ServiceFn>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Service {
            name: name.into(),
            functions: HashMap::new(),
        }
    }

    /// Registers a function. A later registration under the same name wins.
    #[must_use]
    pub fn function(
        mut self,
        name: impl Into<String>,
        f: impl Fn(Value, Option<Value>) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, func: &str, params: Value, auth: Option<Value>) -> Option<Value> {
        self.functions.get(func).map(|f| f(params, auth))
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("functions", &names)
            .finish()
    }
}

/// Started services of one client.
#[derive(Debug, Default)]
pub(crate) struct ServiceRegistry {
    services: Vec<Service>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Registers a service with the server. Restarting a name replaces it.
    pub fn start(&mut self, service: Service, out: &mut Outbox) {
        send_register(service.name(), out);
        self.services
            .retain(|existing| existing.name != service.name);
        self.services.push(service);
    }

    pub fn on_ack(&mut self, name: &str, data: Value) {
        match serde_json::from_value::<Ack<Value>>(data) {
            Ok(ack) if ack.ack => info!(service = name, "service started"),
            Ok(ack) => warn!(service = name, error = ?ack.error, "service registration rejected"),
            Err(e) => warn!(service = name, error = %e, "malformed service registration reply"),
        }
    }

    /// Handles a `service-request` push and queues the reply.
    ///
    /// `frame_id` is used when the request body carries no id of its own.
    pub fn on_call(&self, data: &Value, frame_id: Option<&str>, out: &mut Outbox) {
        let mut call = match ServiceCall::deserialize(data) {
            Ok(call) => call,
            Err(e) => {
                warn!(error = %e, "dropping malformed service request");
                return;
            }
        };
        if call.id.is_empty() {
            call.id = frame_id.unwrap_or_default().to_string();
        }

        let auth = call.auth().cloned();
        let result = self
            .services
            .iter()
            .find_map(|service| service.call(&call.func, call.params.clone(), auth.clone()));
        let reply = match result {
            Some(params) => {
                debug!(func = %call.func, "service function ran");
                ServiceReply::ok(call.id, params)
            }
            None => {
                warn!(func = %call.func, "no function registered");
                ServiceReply::error(call.id, UNKNOWN_FUNCTION)
            }
        };
        out.send_message(kinds::SERVICE_REQUEST, &reply);
    }

    /// Registers every service again.
    pub fn replay(&self, out: &mut Outbox) {
        for service in &self.services {
            let queued = out.pending().has_pending(|reply| {
                matches!(reply, Reply::ServiceRegister(name) if *name == service.name)
            });
            if !queued {
                send_register(service.name(), out);
            }
        }
    }
}

fn send_register(name: &str, out: &mut Outbox) {
    let request = ServiceRegister {
        service: name.to_string(),
    };
    out.request_message(
        kinds::SERVICE_REGISTER,
        &request,
        Reply::ServiceRegister(name.to_string()),
    );
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
