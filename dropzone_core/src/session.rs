// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collection session state.
//!
//! A [`Session`] is a small `Copy` value. The marshal keeps it in a
//! [`SessionCell`] and only ever swaps whole values in and out, so a
//! registration that arrives between two scheduled tasks never observes a
//! half-updated session.

use core::cell::Cell;

use crate::schedule::TaskHandle;

/// Pending scheduled work for the active session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Timers {
    /// The deferred task that starts frame collection.
    pub lift: Option<TaskHandle>,
    /// The frame task currently requested (measure or publish).
    pub frame: Option<TaskHandle>,
}

impl Timers {
    /// No pending work.
    pub const NONE: Self = Self {
        lift: None,
        frame: None,
    };
}

/// Where a session is in its lifecycle.
///
/// `Idle → InitialPublish → Deferred → Measuring → Publishing → Published`,
/// with a stop returning to `Idle` from anywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionStage {
    /// No session.
    #[default]
    Idle,
    /// Synchronously measuring and publishing the dragged item and its home.
    InitialPublish,
    /// Waiting for the lift task.
    Deferred,
    /// Waiting for, or running, the measurement frame.
    Measuring,
    /// Waiting for, or running, the publication frame.
    Publishing,
    /// All collected dimensions are published; still watching scroll and
    /// publishing late registrations until stopped.
    Published,
}

/// The session part of the marshal's state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Session {
    /// Counter identifying this session; scheduled tasks carry it to detect
    /// that they outlived their session.
    pub id: u64,
    /// Whether a session is active.
    pub collecting: bool,
    /// Lifecycle stage.
    pub stage: SessionStage,
    /// Pending scheduled work.
    pub timers: Timers,
}

impl Session {
    /// An inactive session that remembers the last id.
    #[must_use]
    pub const fn idle(id: u64) -> Self {
        Self {
            id,
            collecting: false,
            stage: SessionStage::Idle,
            timers: Timers::NONE,
        }
    }

    /// Whether this is the active session `id`.
    #[must_use]
    pub const fn is_current(&self, id: u64) -> bool {
        self.collecting && self.id == id
    }

    /// The same session at a new stage with new timers.
    #[must_use]
    pub const fn advance(self, stage: SessionStage, timers: Timers) -> Self {
        Self {
            stage,
            timers,
            ..self
        }
    }
}

/// Holder for the current [`Session`], read and replaced as a whole.
#[derive(Debug, Default)]
pub(crate) struct SessionCell(Cell<Session>);

impl SessionCell {
    pub(crate) fn get(&self) -> Session {
        self.0.get()
    }

    pub(crate) fn replace(&self, session: Session) -> Session {
        self.0.replace(session)
    }
}
