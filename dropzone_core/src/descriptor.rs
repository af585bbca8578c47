// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable identity and classification records for measurable entities.

use crate::id::{ContainerId, GroupType, ItemId};

/// Identity of a draggable item and the container that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ItemDescriptor {
    /// Unique item identifier.
    pub id: ItemId,
    /// The container this item lives in (its "home" while dragging).
    pub container_id: ContainerId,
}

impl ItemDescriptor {
    /// Creates a descriptor for `id` owned by `container_id`.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, container_id: impl Into<ContainerId>) -> Self {
        Self {
            id: id.into(),
            container_id: container_id.into(),
        }
    }
}

/// Identity and grouping of a container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerDescriptor {
    /// Unique container identifier.
    pub id: ContainerId,
    /// Grouping tag. Only containers sharing the home container's group (and
    /// the items inside them) are collected for a drag.
    pub group: GroupType,
}

impl ContainerDescriptor {
    /// Creates a descriptor for `id` in `group`.
    #[must_use]
    pub fn new(id: impl Into<ContainerId>, group: impl Into<GroupType>) -> Self {
        Self {
            id: id.into(),
            group: group.into(),
        }
    }
}

/// Either kind of entity descriptor.
///
/// Used for the candidate list handed to the frame collector, which mixes
/// containers and items.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Descriptor {
    /// A draggable item.
    Item(ItemDescriptor),
    /// A container.
    Container(ContainerDescriptor),
}

impl From<ItemDescriptor> for Descriptor {
    fn from(d: ItemDescriptor) -> Self {
        Self::Item(d)
    }
}

impl From<ContainerDescriptor> for Descriptor {
    fn from(d: ContainerDescriptor) -> Self {
        Self::Container(d)
    }
}
