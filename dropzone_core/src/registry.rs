// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lifecycle registry of measurable items and containers.
//!
//! Entity owners contribute entries; the [`DimensionMarshal`] owns the
//! registry and consults it when collecting. Entries hold measurement
//! capabilities behind `Rc` so they can be cloned out and invoked without
//! keeping the registry borrowed.
//!
//! [`DimensionMarshal`]: crate::marshal::DimensionMarshal

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Vec2;

use crate::descriptor::{ContainerDescriptor, Descriptor, ItemDescriptor};
use crate::dimension::{ContainerDimension, Dimension, ItemDimension};
use crate::error::RegistryError;
use crate::id::{ContainerId, ItemId};

/// Synchronously measures an item.
///
/// Implemented for any `Fn() -> ItemDimension`.
pub trait MeasureItem {
    /// Reads the item's current geometry.
    fn measure(&self) -> ItemDimension;
}

impl<F: Fn() -> ItemDimension> MeasureItem for F {
    fn measure(&self) -> ItemDimension {
        self()
    }
}

/// Receives scroll offsets from a watched container.
pub type ScrollListener = Rc<dyn Fn(&ContainerId, Vec2)>;

/// Capabilities a container contributes on registration.
pub trait ContainerHandle {
    /// Reads the container's current geometry.
    fn measure(&self) -> ContainerDimension;

    /// Starts reporting scroll changes to `listener`.
    fn watch_scroll(&self, listener: ScrollListener);

    /// Stops reporting scroll changes. Must be safe to call when not
    /// watching.
    fn unwatch_scroll(&self);
}

/// A registered item.
#[derive(Clone)]
pub struct ItemEntry {
    /// Identity of the item.
    pub descriptor: ItemDescriptor,
    pub(crate) measure: Rc<dyn MeasureItem>,
}

impl ItemEntry {
    /// Measures the item.
    #[must_use]
    pub fn measure(&self) -> ItemDimension {
        self.measure.measure()
    }
}

impl fmt::Debug for ItemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A registered container.
#[derive(Clone)]
pub struct ContainerEntry {
    /// Identity of the container.
    pub descriptor: ContainerDescriptor,
    pub(crate) handle: Rc<dyn ContainerHandle>,
}

impl ContainerEntry {
    /// Measures the container.
    #[must_use]
    pub fn measure(&self) -> ContainerDimension {
        self.handle.measure()
    }

    /// Returns the container's capabilities.
    #[must_use]
    pub fn handle(&self) -> &Rc<dyn ContainerHandle> {
        &self.handle
    }
}

impl fmt::Debug for ContainerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// An entry of either kind, resolved from a [`Descriptor`].
#[derive(Clone, Debug)]
pub enum Entry {
    /// An item entry.
    Item(ItemEntry),
    /// A container entry.
    Container(ContainerEntry),
}

impl Entry {
    /// Measures the entity, tagging the result with its kind.
    #[must_use]
    pub fn measure(&self) -> Dimension {
        match self {
            Self::Item(e) => Dimension::Item(e.measure()),
            Self::Container(e) => Dimension::Container(e.measure()),
        }
    }
}

/// Items and containers keyed by id, one namespace per kind.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    items: BTreeMap<ItemId, ItemEntry>,
    containers: BTreeMap<ContainerId, ContainerEntry>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item. Fails without touching the existing entry if the id is
    /// taken.
    pub fn insert_item(
        &mut self,
        descriptor: ItemDescriptor,
        measure: Rc<dyn MeasureItem>,
    ) -> Result<ItemEntry, RegistryError> {
        if self.items.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateItem(descriptor.id));
        }
        let entry = ItemEntry {
            descriptor,
            measure,
        };
        self.items
            .insert(entry.descriptor.id.clone(), entry.clone());
        Ok(entry)
    }

    /// Adds a container. Fails without touching the existing entry if the id
    /// is taken.
    pub fn insert_container(
        &mut self,
        descriptor: ContainerDescriptor,
        handle: Rc<dyn ContainerHandle>,
    ) -> Result<ContainerEntry, RegistryError> {
        if self.containers.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateContainer(descriptor.id));
        }
        let entry = ContainerEntry { descriptor, handle };
        self.containers
            .insert(entry.descriptor.id.clone(), entry.clone());
        Ok(entry)
    }

    /// Removes and returns an item.
    pub fn remove_item(&mut self, id: &ItemId) -> Result<ItemEntry, RegistryError> {
        self.items
            .remove(id)
            .ok_or_else(|| RegistryError::UnknownItem(id.clone()))
    }

    /// Removes and returns a container.
    pub fn remove_container(&mut self, id: &ContainerId) -> Result<ContainerEntry, RegistryError> {
        self.containers
            .remove(id)
            .ok_or_else(|| RegistryError::UnknownContainer(id.clone()))
    }

    /// Looks up an item.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&ItemEntry> {
        self.items.get(id)
    }

    /// Looks up a container.
    #[must_use]
    pub fn container(&self, id: &ContainerId) -> Option<&ContainerEntry> {
        self.containers.get(id)
    }

    /// Looks up the entry a descriptor refers to.
    #[must_use]
    pub fn resolve(&self, descriptor: &Descriptor) -> Option<Entry> {
        match descriptor {
            Descriptor::Item(d) => self.item(&d.id).cloned().map(Entry::Item),
            Descriptor::Container(d) => self.container(&d.id).cloned().map(Entry::Container),
        }
    }

    /// Iterates over items in id order.
    pub fn items(&self) -> impl Iterator<Item = &ItemEntry> {
        self.items.values()
    }

    /// Iterates over containers in id order.
    pub fn containers(&self) -> impl Iterator<Item = &ContainerEntry> {
        self.containers.values()
    }

    /// Number of registered items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Number of registered containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    /// Lists everything that should be measured alongside a drag of
    /// `dragged` out of `home`.
    ///
    /// Containers come first, then items. The home container and the dragged
    /// item are excluded, as is anything outside `home`'s group. Items are
    /// grouped by their owning container; items whose container is not
    /// registered are skipped.
    #[must_use]
    pub fn candidates(&self, dragged: &ItemId, home: &ContainerDescriptor) -> Vec<Descriptor> {
        let containers = self
            .containers
            .values()
            .map(|e| &e.descriptor)
            .filter(|d| d.id != home.id && d.group == home.group)
            .cloned()
            .map(Descriptor::Container);

        let items = self
            .items
            .values()
            .map(|e| &e.descriptor)
            .filter(|d| &d.id != dragged)
            .filter(|d| {
                self.containers
                    .get(&d.container_id)
                    .is_some_and(|c| c.descriptor.group == home.group)
            })
            .cloned()
            .map(Descriptor::Item);

        containers.chain(items).collect()
    }
}
