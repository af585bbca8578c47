// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Item, container, and grouping identity types.
//!
//! Identifiers are assigned by the entity owners; core treats them as opaque
//! strings and only compares them. Item and container ids live in separate
//! namespaces, so an item and a container may share the same string.

use alloc::string::String;
use core::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// Identifies a draggable item.
    ItemId
}

string_id! {
    /// Identifies a container that items can be dropped into.
    ContainerId
}

string_id! {
    /// Grouping tag restricting which containers and items are collected
    /// together.
    ///
    /// Entities of different groups are never measured for the same drag.
    GroupType
}

impl GroupType {
    /// The tag used when an owner does not specify one.
    pub const DEFAULT: &'static str = "DEFAULT";
}

impl Default for GroupType {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}
