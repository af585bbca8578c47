// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interaction phases consumed from the external drag state machine.
//!
//! The marshal does not own phase transitions; it only reacts to them via
//! [`DimensionMarshal::on_phase_change`](crate::marshal::DimensionMarshal::on_phase_change).

use crate::descriptor::ItemDescriptor;
use crate::error::CollectionError;

/// Phase of the drag interaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No drag in progress (also reached when a drag is cancelled).
    #[default]
    Idle,
    /// A drag was requested and is waiting for other preconditions.
    Preparing,
    /// Dimensions for the requested item must be collected.
    CollectingInitialDimensions,
    /// The item is being dragged.
    Dragging,
    /// The item was released and is animating into place.
    DropAnimating,
    /// The drop finished.
    DropComplete,
}

/// The part of the external state the marshal reads on each change.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseSnapshot {
    /// Current phase.
    pub phase: Phase,
    /// The item requested for dragging, while collecting initial dimensions.
    pub request: Option<ItemDescriptor>,
}

impl PhaseSnapshot {
    /// A snapshot with no request.
    #[must_use]
    pub const fn new(phase: Phase) -> Self {
        Self {
            phase,
            request: None,
        }
    }

    /// A [`Phase::CollectingInitialDimensions`] snapshot requesting `item`.
    #[must_use]
    pub fn collecting(item: ItemDescriptor) -> Self {
        Self {
            phase: Phase::CollectingInitialDimensions,
            request: Some(item),
        }
    }
}

/// What the marshal did in response to a phase change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseReaction {
    /// A collection session started.
    Started,
    /// Collection was requested but refused; the publisher was told to
    /// cancel.
    Rejected(CollectionError),
    /// The active session was stopped.
    Stopped,
    /// Nothing to do for this phase.
    Ignored,
}
