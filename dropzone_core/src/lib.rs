// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dimension collection and displacement for drag and drop.
//!
//! `dropzone_core` tracks the items and containers that take part in drag
//! and drop, measures them when a drag starts, and hands the results to an
//! external drag store. It is `no_std` compatible (with `alloc`) and
//! single-threaded: state is shared through `Rc` and interior mutability,
//! and all deferred work goes through a host-provided scheduler.
//!
//! # Architecture
//!
//! ```text
//!   entity owners ──► register / unregister ──► Registry
//!                                                  │
//!   drag state machine ──► on_phase_change ──► DimensionMarshal
//!                                                  │
//!            ┌─────────────────────────────────────┤
//!            ▼                                     ▼
//!   initial publish (sync)              Scheduler: tick ─► frame N ─► frame N+1
//!            │                                     │ measure      │ publish
//!            └──────────────► Publisher ◄──────────┴──────────────┘
//!                                │
//!                                ▼
//!                        drag store ──► get_displacement (per impact)
//! ```
//!
//! **[`registry`]**: Items and containers keyed by id, with the
//! measurement capabilities their owners contribute.
//!
//! **[`marshal`]**: [`DimensionMarshal`](marshal::DimensionMarshal), with the
//! registration API, the phase reactor, and the two-frame collection
//! session.
//!
//! **[`schedule`]**: The [`Scheduler`](schedule::Scheduler) trait and an
//! explicitly driven [`ManualScheduler`](schedule::ManualScheduler).
//!
//! **[`publish`]**: The [`Publisher`](publish::Publisher) trait the drag
//! store implements.
//!
//! **[`displacement`]** and **[`visibility`]**: Pure functions deciding
//! whether displaced items are visible and should animate.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and session event
//! types, with a [`Tracer`](trace::Tracer) wrapper that does nothing when no
//! sink is installed.
//!
//! Geometry uses [`kurbo`] types. Human-readable logs go through
//! [`tracing`]; install a subscriber in the host to see them.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod descriptor;
pub mod dimension;
pub mod displacement;
pub mod error;
pub mod id;
pub mod marshal;
pub mod phase;
pub mod publish;
pub mod registry;
pub mod schedule;
pub mod session;
pub mod trace;
pub mod visibility;
