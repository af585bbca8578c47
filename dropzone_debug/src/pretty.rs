// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use dropzone_core::error::CollectionError;
use dropzone_core::trace::{
    CollectPhase, PhaseBeginEvent, PhaseEndEvent, PublishEvent, PublishKind, SessionStartEvent,
    SessionStopEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn phase_name(phase: CollectPhase) -> &'static str {
    match phase {
        CollectPhase::Measure => "measure",
        CollectPhase::Publish => "publish",
    }
}

fn publish_name(kind: PublishKind) -> &'static str {
    match kind {
        PublishKind::Initial => "initial",
        PublishKind::Batch => "batch",
        PublishKind::Late => "late",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_session_start(&mut self, e: &SessionStartEvent) {
        let _ = writeln!(
            self.writer,
            "[start] session={} item={} home={} candidates={}",
            e.session, e.item, e.home, e.candidates,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[{}] session={} begin",
            phase_name(e.phase),
            e.session,
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[{}] session={} end dimensions={}",
            phase_name(e.phase),
            e.session,
            e.dimensions,
        );
    }

    fn on_publish(&mut self, e: &PublishEvent) {
        let _ = writeln!(
            self.writer,
            "[publish] session={} kind={} containers={} items={}",
            e.session,
            publish_name(e.kind),
            e.containers,
            e.items,
        );
    }

    fn on_session_stop(&mut self, e: &SessionStopEvent) {
        let _ = writeln!(
            self.writer,
            "[stop] session={} cancelled_lift={} cancelled_frame={}",
            e.session, e.cancelled_lift, e.cancelled_frame,
        );
    }

    fn on_rejected(&mut self, err: &CollectionError) {
        let _ = writeln!(self.writer, "[rejected] {err}");
    }
}
