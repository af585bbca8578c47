// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types for registration and collection.
//!
//! None of these are fatal. Each is logged where it happens and returned so
//! the caller can react; [`CollectionError`] additionally means the publisher
//! has already been told to cancel the drag.

use crate::id::{ContainerId, ItemId};

/// A registration or unregistration that was rejected. The registry is left
/// unchanged.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// An item with this id is already registered.
    #[error("cannot register item {0} as one is already registered")]
    DuplicateItem(ItemId),

    /// A container with this id is already registered.
    #[error("cannot register container {0} as one is already registered")]
    DuplicateContainer(ContainerId),

    /// No item with this id is registered.
    #[error("cannot unregister item {0} as it is not registered")]
    UnknownItem(ItemId),

    /// No container with this id is registered.
    #[error("cannot unregister container {0} as it is not registered")]
    UnknownContainer(ContainerId),
}

/// A collection session that could not be started.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum CollectionError {
    /// A session is already active; sessions are never merged.
    #[error("cannot start collecting dimensions while a collection is already active")]
    AlreadyCollecting,

    /// The dragged item is not registered.
    #[error("cannot find item {0} to start collecting dimensions")]
    UnknownItem(ItemId),

    /// The dragged item's container is not registered.
    #[error("cannot find home container {container} for item {item}")]
    UnknownHomeContainer {
        /// The dragged item.
        item: ItemId,
        /// The container it claims to live in.
        container: ContainerId,
    },

    /// The phase asked for collection without naming an item.
    #[error("no item was requested for dimension collection")]
    MissingRequest,
}
