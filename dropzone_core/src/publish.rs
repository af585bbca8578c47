// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Publication contract towards the external drag store.
//!
//! The marshal never keeps a dimension: it measures, hands the result to a
//! [`Publisher`], and forgets it. Calls arrive as:
//!
//! - one container batch and one item batch (one element each) for the
//!   initial publish of a session,
//! - single-element batches for entities registered while collecting,
//! - exactly one container batch and one item batch at the end of frame
//!   collection,
//! - [`cancel`](Publisher::cancel) whenever a session cannot start, so the
//!   external state machine can unwind the drag.
//!
//! # Re-entrancy
//!
//! The marshal holds no internal borrows while calling a publisher, so an
//! implementation may call back into the marshal (for example, to stop
//! collecting from inside `cancel`).

use alloc::vec::Vec;

use kurbo::Vec2;

use crate::dimension::{ContainerDimension, ItemDimension};
use crate::id::ContainerId;

/// Receives dimensions and control signals from the marshal.
///
/// Methods take `&self`; the publisher is shared with scroll listeners.
/// Implementations that record state use interior mutability.
pub trait Publisher {
    /// Publishes a batch of item dimensions.
    fn publish_items(&self, dimensions: Vec<ItemDimension>);

    /// Publishes a batch of container dimensions.
    fn publish_containers(&self, dimensions: Vec<ContainerDimension>);

    /// Reports a new scroll offset for a watched container.
    fn update_container_scroll(&self, id: &ContainerId, offset: Vec2);

    /// Asks the external state machine to abandon the current drag.
    fn cancel(&self);
}
