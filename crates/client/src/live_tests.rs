// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sl_core::{Frame, SequentialIds};

type Events = Arc<Mutex<Vec<LiveEvent>>>;
type Errors = Arc<Mutex<Vec<String>>>;

fn outbox() -> Outbox {
    Outbox::new(Arc::new(SequentialIds::new("r")), Duration::from_secs(10))
}

fn key(id: &str) -> SubscriptionKey {
    SubscriptionKey::new("mongo", "todos", id)
}

fn record(id: &str, options: LiveQueryOptions) -> (LiveRecord, Events, Errors) {
    record_with(id, json!({"userId": "u1"}), options)
}

fn record_with(id: &str, find: Value, options: LiveQueryOptions) -> (LiveRecord, Events, Errors) {
    let events = Events::default();
    let errors = Errors::default();
    let callbacks = Callbacks::new(
        {
            let events = Arc::clone(&events);
            move |event: &LiveEvent| events.lock().unwrap().push(event.clone())
        },
        {
            let errors = Arc::clone(&errors);
            move |err: &Error| errors.lock().unwrap().push(err.to_string())
        },
    );
    let record = LiveRecord {
        key: key(id),
        find,
        options,
        callbacks,
        shared: Shared::new(),
        rows: Reconciler::new(),
    };
    (record, events, errors)
}

fn drain(out: &mut Outbox) -> Vec<Frame> {
    std::iter::from_fn(|| out.pop_front()).collect()
}

fn row(doc_id: &str, time: i64, kind: &str, payload: Value) -> Value {
    json!({
        "dbType": "mongo", "group": "todos", "id": "s1",
        "docId": doc_id, "time": time, "type": kind, "payload": payload
    })
}

/// Registry with one subscription `s1` that has been acked with `initial`.
fn subscribed(
    options: LiveQueryOptions,
    initial: Vec<Value>,
) -> (LiveRegistry, Outbox, Events, Errors) {
    let mut registry = LiveRegistry::new("todo-app");
    let mut out = outbox();
    let (record, events, errors) = record("s1", options);
    registry.subscribe(record, &mut out);
    for frame in drain(&mut out) {
        out.pending_mut().take(frame.id.as_deref().unwrap());
    }
    registry.on_ack(&key("s1"), json!({"ack": true, "docs": initial}), &mut out);
    (registry, out, events, errors)
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscribe
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn subscribe_queues_realtime_subscribe() {
    let mut registry = LiveRegistry::new("todo-app");
    let mut out = outbox();
    let options = LiveQueryOptions {
        skip_initial: true,
        changes_only: false,
    };
    let (record, _, _) = record("s1", options);
    registry.subscribe(record, &mut out);

    let frames = drain(&mut out);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, kinds::REALTIME_SUBSCRIBE);
    assert_eq!(
        frames[0].data,
        json!({
            "id": "s1",
            "group": "todos",
            "where": {"userId": "u1"},
            "dbType": "mongo",
            "project": "todo-app",
            "options": {"skipInitial": true, "changesOnly": false}
        })
    );
    let is_s1 = |reply: &Reply| matches!(reply, Reply::Subscribe(k) if *k == key("s1"));
    assert!(out.pending().has_pending(is_s1));
    assert_eq!(registry.len(), 1);
}

#[test]
fn ack_delivers_initial_snapshot_once() {
    let initial = vec![
        row("r1", 10, "initial", json!({"todo": "a"})),
        row("r2", 11, "initial", json!({"todo": "b"})),
    ];
    let (registry, _, events, _) = subscribed(LiveQueryOptions::default(), initial);

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![LiveEvent::Snapshot {
            docs: vec![json!({"todo": "a"}), json!({"todo": "b"})],
            kind: ChangeKind::Initial,
            changed: None
        }]
    );
    assert_eq!(registry.records[&key("s1")].shared.view().len(), 2);
}

#[test]
fn empty_initial_result_is_delivered() {
    let (_, _, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    assert_eq!(
        *events.lock().unwrap(),
        vec![LiveEvent::Snapshot {
            docs: vec![],
            kind: ChangeKind::Initial,
            changed: None,
        }]
    );
}

#[test]
fn skip_initial_suppresses_initial_but_keeps_view() {
    let options = LiveQueryOptions {
        skip_initial: true,
        changes_only: false,
    };
    let (registry, _, events, _) = subscribed(
        options,
        vec![row("r1", 10, "initial", json!({"todo": "a"}))],
    );

    assert!(events.lock().unwrap().is_empty());
    assert_eq!(
        registry.records[&key("s1")].shared.view(),
        vec![json!({"todo": "a"})]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn insert_delivers_snapshot_with_changed_row() {
    let (mut registry, _, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    registry.on_feed(&row("r1", 100, "insert", json!({"todo": "a"})));

    let events = events.lock().unwrap();
    assert_eq!(
        events.last().unwrap(),
        &LiveEvent::Snapshot {
            docs: vec![json!({"todo": "a"})],
            kind: ChangeKind::Insert,
            changed: Some(json!({"todo": "a"}))
        }
    );
}

#[test]
fn delete_reports_find_as_changed() {
    let (mut registry, _, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    registry.on_feed(&row("r1", 100, "insert", json!({"todo": "a"})));
    let mut delete = row("r1", 150, "delete", Value::Null);
    delete["find"] = json!({"_id": "r1"});
    registry.on_feed(&delete);

    assert_eq!(
        events.lock().unwrap().last().unwrap(),
        &LiveEvent::Snapshot {
            docs: vec![],
            kind: ChangeKind::Delete,
            changed: Some(json!({"_id": "r1"})),
        }
    );
}

#[test]
fn changes_only_delivers_single_rows() {
    let options = LiveQueryOptions {
        skip_initial: true,
        changes_only: true,
    };
    let initial = vec![row("r1", 10, "initial", json!({"v": 1}))];
    let (mut registry, _, events, _) = subscribed(options, initial);
    registry.on_feed(&row("r1", 20, "update", json!({"v": 2})));

    assert_eq!(
        *events.lock().unwrap(),
        vec![LiveEvent::Change {
            kind: ChangeKind::Update,
            doc: json!({"v": 2}),
        }]
    );
}

#[test]
fn changes_only_suppresses_stale_and_repeated_rows() {
    let options = LiveQueryOptions {
        skip_initial: true,
        changes_only: true,
    };
    let (mut registry, _, events, _) = subscribed(options, vec![]);
    registry.on_feed(&row("r1", 20, "insert", json!({"v": 2})));
    registry.on_feed(&row("r1", 20, "insert", json!({"v": 2})));
    registry.on_feed(&row("r1", 10, "update", json!({"v": 1})));

    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn changes_only_reports_delete_of_unseen_row() {
    let options = LiveQueryOptions {
        skip_initial: true,
        changes_only: true,
    };
    let (mut registry, _, events, _) = subscribed(options, vec![]);
    registry.on_feed(&row("r9", 20, "delete", Value::Null));

    assert_eq!(
        *events.lock().unwrap(),
        vec![LiveEvent::Change {
            kind: ChangeKind::Delete,
            doc: json!({"_id": "r9"}),
        }]
    );
}

#[test]
fn feed_without_db_and_group_matches_by_id() {
    let (mut registry, _, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    registry.on_feed(&json!({
        "id": "s1", "docId": "r1", "time": 1, "type": "insert", "payload": {"x": 1}
    }));
    assert_eq!(events.lock().unwrap().len(), 2);
}

#[test]
fn feed_for_unknown_subscription_is_dropped() {
    let (mut registry, _, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    let mut other = row("r1", 1, "insert", json!({}));
    other["id"] = json!("s2");
    registry.on_feed(&other);
    registry.on_feed(&json!({"type": 42}));
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn todo_scenario() {
    let (mut registry, _, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    let view = |registry: &LiveRegistry| registry.records[&key("s1")].shared.view();
    assert!(view(&registry).is_empty());

    registry.on_feed(&row("r1", 100, "insert", json!({"todo": "a"})));
    assert_eq!(view(&registry), vec![json!({"todo": "a"})]);

    registry.on_feed(&row("r1", 150, "delete", Value::Null));
    assert!(view(&registry).is_empty());

    registry.on_feed(&row("r1", 120, "update", json!({"todo": "stale"})));
    assert!(view(&registry).is_empty());

    let events = events.lock().unwrap();
    let LiveEvent::Snapshot { docs, .. } = events.last().unwrap() else {
        panic!("expected a snapshot");
    };
    assert!(docs.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Failure and teardown
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn negative_ack_fails_and_removes_subscription() {
    let mut registry = LiveRegistry::new("p");
    let mut out = outbox();
    let (record, events, errors) = record("s1", LiveQueryOptions::default());
    registry.subscribe(record, &mut out);
    drain(&mut out);

    registry.on_ack(
        &key("s1"),
        json!({"ack": false, "error": "denied"}),
        &mut out,
    );

    assert_eq!(
        *errors.lock().unwrap(),
        vec!["subscription rejected: denied".to_string()]
    );
    assert!(events.lock().unwrap().is_empty());
    assert_eq!(registry.len(), 0);
    let frames = drain(&mut out);
    assert_eq!(frames[0].kind, kinds::REALTIME_UNSUBSCRIBE);
}

#[test]
fn fail_reports_error_once() {
    let mut registry = LiveRegistry::new("p");
    let mut out = outbox();
    let (record, _, errors) = record("s1", LiveQueryOptions::default());
    registry.subscribe(record, &mut out);

    registry.fail(&key("s1"), Error::ConnectionLost, &mut out);
    registry.fail(&key("s1"), Error::ConnectionLost, &mut out);
    assert_eq!(errors.lock().unwrap().len(), 1);
}

#[test]
fn unsubscribe_stops_delivery_and_tells_server() {
    let (mut registry, mut out, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    registry.unsubscribe(&key("s1"), &mut out);
    registry.on_feed(&row("r1", 1, "insert", json!({})));

    assert_eq!(events.lock().unwrap().len(), 1);
    let frames = drain(&mut out);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].kind, kinds::REALTIME_UNSUBSCRIBE);
    assert_eq!(frames[0].data["id"], "s1");
    assert_eq!(frames[0].data["group"], "todos");
}

#[test]
fn deactivated_subscription_gets_no_callbacks() {
    let (mut registry, _, events, _) = subscribed(LiveQueryOptions::default(), vec![]);
    registry.records[&key("s1")].shared.deactivate();
    registry.on_feed(&row("r1", 1, "insert", json!({})));
    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn numeric_primary_keys_are_tracked() {
    let numeric = |time: i64, kind: &str, payload: Value| {
        json!({
            "dbType": "mongo", "group": "todos", "id": "s1",
            "docId": 7, "time": time, "type": kind, "payload": payload
        })
    };
    let (mut registry, _, events, errors) = subscribed(
        LiveQueryOptions::default(),
        vec![numeric(10, "initial", json!({"todo": "a"}))],
    );
    registry.on_feed(&numeric(20, "delete", json!({})));
    registry.on_feed(&numeric(15, "update", json!({"todo": "stale"})));

    assert!(errors.lock().unwrap().is_empty());
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0],
        LiveEvent::Snapshot {
            docs: vec![json!({"todo": "a"})],
            kind: ChangeKind::Initial,
            changed: None,
        }
    );
    assert!(matches!(&events[2], LiveEvent::Snapshot { docs, .. } if docs.is_empty()));
    assert!(registry.records[&key("s1")].rows.get("7").unwrap().deleted);
}

// ─────────────────────────────────────────────────────────────────────────────
// Replay
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn replay_skips_subscriptions_still_queued() {
    let mut registry = LiveRegistry::new("p");
    let mut out = outbox();
    let (record, _, _) = record("s1", LiveQueryOptions::default());
    registry.subscribe(record, &mut out);

    registry.replay(&mut out);
    assert_eq!(out.queued(), 1);
}

#[test]
fn replay_reissues_every_subscription() {
    let skip_initial = LiveQueryOptions {
        skip_initial: true,
        changes_only: false,
    };
    let changes_only = LiveQueryOptions {
        skip_initial: true,
        changes_only: true,
    };
    let subscriptions = [
        ("s1", json!({"userId": "u1"}), LiveQueryOptions::default()),
        ("s2", json!({"done": false}), skip_initial),
        ("s3", json!({"$or": [{"a": 1}, {"b": 2}]}), changes_only),
    ];
    let mut registry = LiveRegistry::new("p");
    let mut out = outbox();
    for (id, find, options) in &subscriptions {
        let (record, _, _) = record_with(id, find.clone(), *options);
        registry.subscribe(record, &mut out);
    }
    for frame in drain(&mut out) {
        out.pending_mut().mark_sent(frame.id.as_deref().unwrap());
    }
    out.pending_mut().connection_lost();

    registry.replay(&mut out);
    let mut frames = drain(&mut out);
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.kind == kinds::REALTIME_SUBSCRIBE));
    frames.sort_by(|a, b| a.data["id"].as_str().cmp(&b.data["id"].as_str()));

    for (frame, (id, find, options)) in frames.iter().zip(&subscriptions) {
        assert_eq!(frame.data["id"], *id);
        assert_eq!(frame.data["where"], *find);
        assert_eq!(
            frame.data["options"],
            json!({"skipInitial": options.skip_initial, "changesOnly": options.changes_only})
        );
    }
}
