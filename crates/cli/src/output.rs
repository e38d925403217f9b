// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON line rendering of subscription events.

use std::io::Write;

use serde_json::{json, Value};
use spacelink::{LiveEvent, MonitorEvent, PubsubMessage};

use crate::error::Result;

pub fn live_event(event: &LiveEvent) -> Value {
    match event {
        LiveEvent::Snapshot {
            docs,
            kind,
            changed,
        } => {
            let mut line = json!({"type": kind.to_string(), "docs": docs});
            if let Some(changed) = changed {
                line["changed"] = changed.clone();
            }
            line
        }
        LiveEvent::Change { kind, doc } => json!({"type": kind.to_string(), "doc": doc}),
    }
}

pub fn monitor_event(event: &MonitorEvent) -> Value {
    json!({"type": event.kind.to_string(), "docs": event.docs, "changed": event.changed})
}

pub fn pubsub_message(message: &PubsubMessage) -> Value {
    json!({"subject": message.subject, "data": message.data})
}

/// Writes one compact JSON value followed by a newline and flushes.
pub fn write_line(out: &mut impl Write, value: &Value) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
