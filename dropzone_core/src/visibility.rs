// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visibility of displaced items.

use kurbo::Rect;

use crate::dimension::{ContainerDimension, ItemDimension};

/// Whether any part of `target` shows through `frame`.
///
/// Requires an intersection with positive area; a rectangle that only
/// touches the frame's edge is not visible.
#[must_use]
pub fn is_partially_visible_through_frame(frame: Rect, target: Rect) -> bool {
    let overlap = frame.intersect(target);
    overlap.width() > 0.0 && overlap.height() > 0.0
}

/// Whether a displaced item can currently be seen inside `destination`.
///
/// The item's margin box is moved by how far the destination has scrolled
/// since it was measured, then must show through both the destination's
/// visible frame and the viewport.
#[must_use]
pub fn is_displaced_item_visible(
    displaced: &ItemDimension,
    destination: &ContainerDimension,
    viewport: Rect,
) -> bool {
    // Content moves opposite to the scroll direction.
    let target = displaced.margin_box() - destination.scroll.diff();

    is_partially_visible_through_frame(destination.frame, target)
        && is_partially_visible_through_frame(viewport, target)
}
