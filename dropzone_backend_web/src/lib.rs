// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web backend for dropzone.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`BrowserScheduler`]: a [`Scheduler`] whose ticks are zero-delay
//!   `setTimeout` callbacks and whose frames are `requestAnimationFrame`
//!   callbacks.

#![no_std]

extern crate alloc;

mod scheduler;

pub use dropzone_core::schedule::Scheduler;
pub use scheduler::BrowserScheduler;
