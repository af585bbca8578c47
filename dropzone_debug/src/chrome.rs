// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Each session is drawn on its own track (`tid` is the session counter):
//! the session itself and both collection phases are duration slices,
//! publications and rejections are instants.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for record in decode(bytes) {
        let ts = record.at_us;
        match record.event {
            RecordedEvent::SessionStart(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": "Session",
                    "cat": "Session",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.session,
                    "args": {
                        "item": e.item.as_str(),
                        "home": e.home.as_str(),
                        "candidates": e.candidates,
                    }
                }));
            }
            RecordedEvent::SessionStop(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": "Session",
                    "cat": "Session",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.session,
                    "args": {
                        "cancelled_lift": e.cancelled_lift,
                        "cancelled_frame": e.cancelled_frame,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": format!("{:?}", e.phase),
                    "cat": "Collect",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.session,
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": format!("{:?}", e.phase),
                    "cat": "Collect",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.session,
                    "args": {
                        "dimensions": e.dimensions,
                    }
                }));
            }
            RecordedEvent::Publish(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Publish",
                    "cat": "Publish",
                    "ts": ts,
                    "pid": 0,
                    "tid": e.session,
                    "s": "t",
                    "args": {
                        "kind": format!("{:?}", e.kind),
                        "containers": e.containers,
                        "items": e.items,
                    }
                }));
            }
            RecordedEvent::Rejected { reason } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Rejected",
                    "cat": "Session",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "reason": reason,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}
