// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records, each stamped with the microseconds
//! elapsed since the recorder was created. [`decode`] reads them back as an
//! iterator of [`Record`].
//!
//! Rejections store only the error message.

use std::fmt;
use std::time::Instant;

use dropzone_core::error::CollectionError;
use dropzone_core::id::{ContainerId, ItemId};
use dropzone_core::trace::{
    CollectPhase, PhaseBeginEvent, PhaseEndEvent, PublishEvent, PublishKind, SessionStartEvent,
    SessionStopEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SESSION_START: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_PUBLISH: u8 = 4;
const TAG_SESSION_STOP: u8 = 5;
const TAG_REJECTED: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// Source of record timestamps, in microseconds.
pub type Clock = Box<dyn FnMut() -> u64>;

/// A [`TraceSink`] that encodes events into a compact binary buffer.
pub struct RecorderSink {
    buf: Vec<u8>,
    clock: Clock,
}

impl fmt::Debug for RecorderSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecorderSink")
            .field("len", &self.buf.len())
            .finish_non_exhaustive()
    }
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder timed from now.
    #[must_use]
    pub fn new() -> Self {
        let origin = Instant::now();
        Self::with_clock(Box::new(move || {
            u64::try_from(origin.elapsed().as_micros()).unwrap_or(u64::MAX)
        }))
    }

    /// Creates an empty recorder that stamps records with `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            buf: Vec::new(),
            clock,
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin(&mut self, tag: u8) {
        let at = (self.clock)();
        self.write_u8(tag);
        self.write_u64(at);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_count(&mut self, v: usize) {
        self.write_u64(u64::try_from(v).unwrap_or(u64::MAX));
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_str(&mut self, s: &str) {
        // Ids and error messages are short; anything longer is recorded empty.
        match u32::try_from(s.len()) {
            Ok(len) => {
                self.write_u32(len);
                self.buf.extend_from_slice(s.as_bytes());
            }
            Err(_) => self.write_u32(0),
        }
    }

    fn write_phase(&mut self, p: CollectPhase) {
        self.write_u8(match p {
            CollectPhase::Measure => 0,
            CollectPhase::Publish => 1,
        });
    }

    fn write_publish_kind(&mut self, k: PublishKind) {
        self.write_u8(match k {
            PublishKind::Initial => 0,
            PublishKind::Batch => 1,
            PublishKind::Late => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_session_start(&mut self, e: &SessionStartEvent) {
        self.begin(TAG_SESSION_START);
        self.write_u64(e.session);
        self.write_str(e.item.as_str());
        self.write_str(e.home.as_str());
        self.write_count(e.candidates);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.begin(TAG_PHASE_BEGIN);
        self.write_u64(e.session);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.begin(TAG_PHASE_END);
        self.write_u64(e.session);
        self.write_phase(e.phase);
        self.write_count(e.dimensions);
    }

    fn on_publish(&mut self, e: &PublishEvent) {
        self.begin(TAG_PUBLISH);
        self.write_u64(e.session);
        self.write_publish_kind(e.kind);
        self.write_count(e.containers);
        self.write_count(e.items);
    }

    fn on_session_stop(&mut self, e: &SessionStopEvent) {
        self.begin(TAG_SESSION_STOP);
        self.write_u64(e.session);
        self.write_bool(e.cancelled_lift);
        self.write_bool(e.cancelled_frame);
    }

    fn on_rejected(&mut self, err: &CollectionError) {
        self.begin(TAG_REJECTED);
        self.write_str(&err.to_string());
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`SessionStartEvent`].
    SessionStart(SessionStartEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`PublishEvent`].
    Publish(PublishEvent),
    /// A [`SessionStopEvent`].
    SessionStop(SessionStopEvent),
    /// A refused session start.
    Rejected {
        /// The error message.
        reason: String,
    },
}

/// A decoded event with its timestamp.
#[derive(Clone, Debug)]
pub struct Record {
    /// Microseconds since the recorder's origin.
    pub at_us: u64,
    /// The event.
    pub event: RecordedEvent,
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`Record`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded records.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_bytes(&mut self, n: usize) -> Option<&[u8]> {
        let end = self.pos.checked_add(n)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.read_bytes(4)?.try_into().ok()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.read_bytes(8)?.try_into().ok()?))
    }

    fn read_count(&mut self) -> Option<usize> {
        usize::try_from(self.read_u64()?).ok()
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_str(&mut self) -> Option<String> {
        let len = usize::try_from(self.read_u32()?).ok()?;
        String::from_utf8(self.read_bytes(len)?.to_vec()).ok()
    }

    fn read_phase(&mut self) -> Option<CollectPhase> {
        Some(match self.read_u8()? {
            0 => CollectPhase::Measure,
            _ => CollectPhase::Publish,
        })
    }

    fn read_publish_kind(&mut self) -> Option<PublishKind> {
        Some(match self.read_u8()? {
            0 => PublishKind::Initial,
            1 => PublishKind::Batch,
            _ => PublishKind::Late,
        })
    }

    fn decode_session_start(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SessionStart(SessionStartEvent {
            session: self.read_u64()?,
            item: ItemId::new(self.read_str()?),
            home: ContainerId::new(self.read_str()?),
            candidates: self.read_count()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            session: self.read_u64()?,
            phase: self.read_phase()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            session: self.read_u64()?,
            phase: self.read_phase()?,
            dimensions: self.read_count()?,
        }))
    }

    fn decode_publish(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Publish(PublishEvent {
            session: self.read_u64()?,
            kind: self.read_publish_kind()?,
            containers: self.read_count()?,
            items: self.read_count()?,
        }))
    }

    fn decode_session_stop(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::SessionStop(SessionStopEvent {
            session: self.read_u64()?,
            cancelled_lift: self.read_bool()?,
            cancelled_frame: self.read_bool()?,
        }))
    }

    fn decode_rejected(&mut self) -> Option<RecordedEvent> {
        let reason = self.read_str()?;
        Some(RecordedEvent::Rejected { reason })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_us = self.read_u64()?;
        let event = match tag {
            TAG_SESSION_START => self.decode_session_start(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_PUBLISH => self.decode_publish(),
            TAG_SESSION_STOP => self.decode_session_stop(),
            TAG_REJECTED => self.decode_rejected(),
            _ => None, // unknown tag → stop iteration
        }?;
        Some(Record { at_us, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
