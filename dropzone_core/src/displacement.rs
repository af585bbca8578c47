// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-item displacement decisions.
//!
//! Every time the drag impact is recomputed, each item that has to move out
//! of the dragged item's way gets a fresh [`Displacement`]. Whether it
//! animates depends on the previous impact:
//!
//! - invisible items never animate, so nothing jumps when they scroll into
//!   view already displaced;
//! - an item displaced for the first time animates;
//! - otherwise the previous decision is kept, so a continuously displaced
//!   item does not restart its animation and an item that started off
//!   invisible keeps not animating.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::Rect;

use crate::dimension::{ContainerDimension, ItemDimension};
use crate::id::{ContainerId, ItemId};
use crate::visibility::is_displaced_item_visible;

/// How one item reacts to the dragged item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Displacement {
    /// The displaced item.
    pub item_id: ItemId,
    /// Whether the item can currently be seen.
    pub is_visible: bool,
    /// Whether moving the item should be animated.
    pub should_animate: bool,
}

/// The externally owned result of one impact recomputation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DragImpact {
    /// Displaced items, in the order they were displaced.
    pub displaced: Vec<Displacement>,
    /// The container currently targeted, if any.
    pub destination: Option<ContainerId>,
}

/// Lookup of the previous impact's displacements by item id.
#[derive(Clone, Debug, Default)]
pub struct DisplacementMap<'a> {
    by_id: BTreeMap<&'a ItemId, &'a Displacement>,
}

impl<'a> DisplacementMap<'a> {
    /// Indexes `displaced`. If an id repeats, the last record wins.
    #[must_use]
    pub fn from_displaced(displaced: &'a [Displacement]) -> Self {
        let by_id = displaced.iter().map(|d| (&d.item_id, d)).collect();
        Self { by_id }
    }

    /// Returns the record for `id`, if it was displaced last time.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&'a Displacement> {
        self.by_id.get(id).copied()
    }

    /// Number of distinct displaced items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether nothing was displaced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Decides the displacement of `item` against a prebuilt map of the previous
/// impact.
#[must_use]
pub fn compute_displacement(
    item: &ItemDimension,
    destination: &ContainerDimension,
    viewport: Rect,
    previous: &DisplacementMap<'_>,
) -> Displacement {
    let item_id = &item.descriptor.id;
    let is_visible = is_displaced_item_visible(item, destination, viewport);

    let should_animate = if is_visible {
        previous.get(item_id).is_none_or(|prev| prev.should_animate)
    } else {
        false
    };

    Displacement {
        item_id: item_id.clone(),
        is_visible,
        should_animate,
    }
}

/// Decides the displacement of `item` given the previous impact.
#[must_use]
pub fn get_displacement(
    item: &ItemDimension,
    destination: &ContainerDimension,
    viewport: Rect,
    previous_impact: &DragImpact,
) -> Displacement {
    let map = DisplacementMap::from_displaced(&previous_impact.displaced);
    compute_displacement(item, destination, viewport, &map)
}

/// Decides the displacement of every item in `items`, indexing the previous
/// impact once.
#[must_use]
pub fn get_displacements<'i>(
    items: impl IntoIterator<Item = &'i ItemDimension>,
    destination: &ContainerDimension,
    viewport: Rect,
    previous_impact: &DragImpact,
) -> Vec<Displacement> {
    let map = DisplacementMap::from_displaced(&previous_impact.displaced);
    items
        .into_iter()
        .map(|item| compute_displacement(item, destination, viewport, &map))
        .collect()
}
