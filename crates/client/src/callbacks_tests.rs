// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use std::sync::atomic::AtomicUsize;

#[test]
fn callbacks_route_events_and_errors() {
    let events = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let callbacks = Callbacks::new(
        {
            let events = Arc::clone(&events);
            move |n: &usize| {
                events.fetch_add(*n, Ordering::SeqCst);
            }
        },
        {
            let errors = Arc::clone(&errors);
            move |_: &Error| {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        },
    );

    callbacks.event(&2);
    callbacks.event(&3);
    callbacks.error(&Error::ConnectionLost);

    assert_eq!(events.load(Ordering::SeqCst), 5);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[test]
fn shared_starts_active() {
    let shared = Shared::new();
    assert!(shared.is_active());
    assert!(shared.view().is_empty());
}

#[test]
fn deactivate_is_idempotent() {
    let shared = Shared::new();
    assert!(shared.deactivate());
    assert!(!shared.deactivate());
    assert!(!shared.is_active());
}

#[test]
fn view_is_shared_between_clones() {
    let shared = Shared::new();
    let handle = shared.clone();
    shared.set_view(vec![json!({"a": 1})]);
    assert_eq!(handle.view(), vec![json!({"a": 1})]);
}
