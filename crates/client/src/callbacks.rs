// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Callback pairs owned by subscriptions.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::error::Error;

/// Handler for frames of a given type, registered with [`Client::on`](crate::Client::on).
pub type Handler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handler run after every reconnection.
pub type ReconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Data handler and error handler of one subscription.
pub(crate) struct Callbacks<E> {
    on_event: Arc<dyn Fn(&E) + Send + Sync>,
    on_error: Arc<dyn Fn(&Error) + Send + Sync>,
}

impl<E> Callbacks<E> {
    pub fn new(
        on_event: impl Fn(&E) + Send + Sync + 'static,
        on_error: impl Fn(&Error) + Send + Sync + 'static,
    ) -> Self {
        Callbacks {
            on_event: Arc::new(on_event),
            on_error: Arc::new(on_error),
        }
    }

    pub fn event(&self, event: &E) {
        (self.on_event)(event)
    }

    pub fn error(&self, err: &Error) {
        (self.on_error)(err)
    }
}

impl<E> fmt::Debug for Callbacks<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callbacks")
    }
}

/// State shared between a subscription handle and the engine.
///
/// The `active` flag is cleared by the handle on unsubscribe and checked by
/// the engine before every delivery. `view` holds the latest delivered docs.
#[derive(Debug, Clone)]
pub(crate) struct Shared {
    active: Arc<AtomicBool>,
    view: Arc<Mutex<Vec<Value>>>,
}

impl Shared {
    pub fn new() -> Self {
        Shared {
            active: Arc::new(AtomicBool::new(true)),
            view: Arc::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Clears the active flag. Returns true if it was set.
    pub fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    pub fn view(&self) -> Vec<Value> {
        self.view.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set_view(&self, docs: Vec<Value>) {
        *self.view.lock().unwrap_or_else(|e| e.into_inner()) = docs;
    }
}

#[cfg(test)]
#[path = "callbacks_tests.rs"]
mod tests;
