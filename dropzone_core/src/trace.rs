// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured diagnostics for collection sessions.
//!
//! The marshal reports each session transition to a [`TraceSink`]. All sink
//! methods default to no-ops, so implementing only the events you care about
//! is fine. Events carry no timestamps; sinks that need them stamp events on
//! arrival (see the `dropzone_debug` crate).
//!
//! These events complement the `tracing` log output: logs are for humans,
//! trace events are for tools.

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use crate::error::CollectionError;
use crate::id::{ContainerId, ItemId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which half of frame collection is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollectPhase {
    /// Frame N: reading geometry.
    Measure,
    /// Frame N+1: publishing batches and attaching scroll watchers.
    Publish,
}

/// Why dimensions were published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PublishKind {
    /// The dragged item and its home container, published synchronously.
    Initial,
    /// The batched result of frame collection.
    Batch,
    /// An entity registered while a session was active.
    Late,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a session starts, after the initial publish.
#[derive(Clone, Debug)]
pub struct SessionStartEvent {
    /// Session counter.
    pub session: u64,
    /// The dragged item.
    pub item: ItemId,
    /// Its home container.
    pub home: ContainerId,
    /// How many other entities were queued for frame collection.
    pub candidates: usize,
}

/// Marks the beginning of a collection phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Session counter.
    pub session: u64,
    /// Which phase is starting.
    pub phase: CollectPhase,
}

/// Marks the end of a collection phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Session counter.
    pub session: u64,
    /// Which phase ended.
    pub phase: CollectPhase,
    /// Dimensions measured ([`Measure`](CollectPhase::Measure)) or published
    /// ([`Publish`](CollectPhase::Publish)).
    pub dimensions: usize,
}

/// Emitted for every publication to the publisher.
#[derive(Clone, Copy, Debug)]
pub struct PublishEvent {
    /// Session counter.
    pub session: u64,
    /// Why this publication happened.
    pub kind: PublishKind,
    /// Number of container dimensions.
    pub containers: usize,
    /// Number of item dimensions.
    pub items: usize,
}

/// Emitted when an active session is stopped.
#[derive(Clone, Copy, Debug)]
pub struct SessionStopEvent {
    /// Session counter.
    pub session: u64,
    /// Whether a pending lift task was cancelled.
    pub cancelled_lift: bool,
    /// Whether a pending frame task was cancelled.
    pub cancelled_frame: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the marshal.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called after the initial publish of a new session.
    fn on_session_start(&mut self, e: &SessionStartEvent) {
        _ = e;
    }

    /// Called when a collection phase starts.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called when a collection phase ends.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called after dimensions are handed to the publisher.
    fn on_publish(&mut self, e: &PublishEvent) {
        _ = e;
    }

    /// Called when an active session is stopped.
    fn on_session_stop(&mut self, e: &SessionStopEvent) {
        _ = e;
    }

    /// Called when a session could not be started.
    fn on_rejected(&mut self, err: &CollectionError) {
        _ = err;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Shared handle to a sink, as installed on the marshal.
pub type SharedSink = Rc<RefCell<dyn TraceSink>>;

/// Thin wrapper around an optional shared [`TraceSink`].
///
/// Each method performs one `Option` branch before dispatching. The sink is
/// borrowed only for the duration of the call.
///
/// A sink may call back into the marshal. Events raised while the sink is
/// already handling one (for example a stop triggered from
/// [`on_publish`](TraceSink::on_publish)) are dropped rather than delivered
/// re-entrantly.
#[derive(Clone, Default)]
pub struct Tracer {
    sink: Option<SharedSink>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("enabled", &self.sink.is_some())
            .finish()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to `sink`.
    #[must_use]
    pub fn new(sink: SharedSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// Creates a tracer that discards all events.
    #[must_use]
    pub const fn none() -> Self {
        Self { sink: None }
    }

    fn emit(&self, f: impl FnOnce(&mut dyn TraceSink)) {
        if let Some(sink) = &self.sink
            && let Ok(mut sink) = sink.try_borrow_mut()
        {
            f(&mut *sink);
        }
    }

    /// Emits a [`SessionStartEvent`].
    pub fn session_start(&self, e: &SessionStartEvent) {
        self.emit(|s| s.on_session_start(e));
    }

    /// Emits a [`PhaseBeginEvent`].
    pub fn phase_begin(&self, e: &PhaseBeginEvent) {
        self.emit(|s| s.on_phase_begin(e));
    }

    /// Emits a [`PhaseEndEvent`].
    pub fn phase_end(&self, e: &PhaseEndEvent) {
        self.emit(|s| s.on_phase_end(e));
    }

    /// Emits a [`PublishEvent`].
    pub fn publish(&self, e: &PublishEvent) {
        self.emit(|s| s.on_publish(e));
    }

    /// Emits a [`SessionStopEvent`].
    pub fn session_stop(&self, e: &SessionStopEvent) {
        self.emit(|s| s.on_session_stop(e));
    }

    /// Emits a rejected session start.
    pub fn rejected(&self, err: &CollectionError) {
        self.emit(|s| s.on_rejected(err));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        phases: Vec<(u64, CollectPhase)>,
        rejected: usize,
    }

    impl TraceSink for RecordingSink {
        fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
            self.phases.push((e.session, e.phase));
        }

        fn on_rejected(&mut self, _err: &CollectionError) {
            self.rejected += 1;
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_publish(&PublishEvent {
            session: 1,
            kind: PublishKind::Initial,
            containers: 1,
            items: 1,
        });
        sink.on_rejected(&CollectionError::AlreadyCollecting);
    }

    #[test]
    fn tracer_none_does_nothing() {
        let tracer = Tracer::none();
        tracer.phase_begin(&PhaseBeginEvent {
            session: 0,
            phase: CollectPhase::Measure,
        });
    }

    #[test]
    fn tracer_dispatches_to_sink() {
        let sink = Rc::new(RefCell::new(RecordingSink::default()));
        let tracer = Tracer::new(sink.clone());
        tracer.phase_begin(&PhaseBeginEvent {
            session: 3,
            phase: CollectPhase::Publish,
        });
        tracer.rejected(&CollectionError::MissingRequest);

        let sink = sink.borrow();
        assert_eq!(sink.phases, [(3, CollectPhase::Publish)]);
        assert_eq!(sink.rejected, 1);
    }

    #[test]
    fn reentrant_events_are_dropped() {
        #[derive(Default)]
        struct Echo {
            tracer: Option<Tracer>,
            publishes: usize,
            phases: usize,
        }

        impl TraceSink for Echo {
            fn on_publish(&mut self, _: &PublishEvent) {
                self.publishes += 1;
                if let Some(tracer) = &self.tracer {
                    tracer.phase_begin(&PhaseBeginEvent {
                        session: 1,
                        phase: CollectPhase::Measure,
                    });
                }
            }

            fn on_phase_begin(&mut self, _: &PhaseBeginEvent) {
                self.phases += 1;
            }
        }

        let sink = Rc::new(RefCell::new(Echo::default()));
        let tracer = Tracer::new(sink.clone());
        sink.borrow_mut().tracer = Some(tracer.clone());

        tracer.publish(&PublishEvent {
            session: 1,
            kind: PublishKind::Batch,
            containers: 0,
            items: 0,
        });
        tracer.phase_begin(&PhaseBeginEvent {
            session: 1,
            phase: CollectPhase::Publish,
        });

        let mut echo = sink.borrow_mut();
        assert_eq!(echo.publishes, 1);
        assert_eq!(echo.phases, 1);
        // Break the cycle between the sink and its tracer.
        echo.tracer = None;
    }
}
