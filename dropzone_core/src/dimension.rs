// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point-in-time geometry measurements.
//!
//! A dimension is produced on demand by an entity's measurement capability,
//! published, and then discarded; the marshal never keeps one. All rectangles
//! are in page space.

use alloc::vec::Vec;

use kurbo::{Insets, Rect, Size, Vec2};

use crate::descriptor::{ContainerDescriptor, ItemDescriptor};

/// Geometry of a draggable item.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemDimension {
    /// Which item was measured.
    pub descriptor: ItemDescriptor,
    /// Border box of the item.
    pub rect: Rect,
    /// Outer margins around [`rect`](Self::rect).
    pub margin: Insets,
    /// Space the item leaves behind in its container while dragged.
    pub placeholder: Size,
}

impl ItemDimension {
    /// Creates an item dimension with no margin; the placeholder matches the
    /// border box.
    #[must_use]
    pub fn new(descriptor: ItemDescriptor, rect: Rect) -> Self {
        Self {
            descriptor,
            rect,
            margin: Insets::ZERO,
            placeholder: rect.size(),
        }
    }

    /// Sets the margin and grows the placeholder to cover it.
    #[must_use]
    pub fn with_margin(mut self, margin: Insets) -> Self {
        self.margin = margin;
        self.placeholder = self.margin_box().size();
        self
    }

    /// Returns the border box expanded by the margins.
    #[must_use]
    pub fn margin_box(&self) -> Rect {
        self.rect + self.margin
    }
}

/// Initial and current internal scroll offsets of a container.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollOffsets {
    /// Offset when the dimension was first captured.
    pub initial: Vec2,
    /// Most recently observed offset.
    pub current: Vec2,
}

impl ScrollOffsets {
    /// Offsets that have not moved since capture.
    #[must_use]
    pub const fn at(offset: Vec2) -> Self {
        Self {
            initial: offset,
            current: offset,
        }
    }

    /// How far the container has scrolled since capture.
    #[must_use]
    pub fn diff(&self) -> Vec2 {
        self.current - self.initial
    }
}

/// Geometry of a container.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerDimension {
    /// Which container was measured.
    pub descriptor: ContainerDescriptor,
    /// Bounds of the container.
    pub rect: Rect,
    /// Visible region of the container after clipping by scroll parents.
    pub frame: Rect,
    /// Internal scroll offsets.
    pub scroll: ScrollOffsets,
}

impl ContainerDimension {
    /// Creates an unclipped, unscrolled container dimension.
    #[must_use]
    pub fn new(descriptor: ContainerDescriptor, rect: Rect) -> Self {
        Self {
            descriptor,
            rect,
            frame: rect,
            scroll: ScrollOffsets::default(),
        }
    }

    /// Sets the visible region.
    #[must_use]
    pub fn with_frame(mut self, frame: Rect) -> Self {
        self.frame = frame;
        self
    }

    /// Sets the scroll offsets.
    #[must_use]
    pub fn with_scroll(mut self, scroll: ScrollOffsets) -> Self {
        self.scroll = scroll;
        self
    }
}

/// A measurement of either kind of entity.
///
/// Frame collection measures containers and items into one buffer; the
/// variant is what splits it back into two publication batches.
#[derive(Clone, Debug, PartialEq)]
pub enum Dimension {
    /// An item measurement.
    Item(ItemDimension),
    /// A container measurement.
    Container(ContainerDimension),
}

/// Splits a mixed buffer into container and item batches, preserving order
/// within each kind.
#[must_use]
pub fn partition(buffer: Vec<Dimension>) -> (Vec<ContainerDimension>, Vec<ItemDimension>) {
    let mut containers = Vec::new();
    let mut items = Vec::new();
    for dimension in buffer {
        match dimension {
            Dimension::Item(d) => items.push(d),
            Dimension::Container(d) => containers.push(d),
        }
    }
    (containers, items)
}
