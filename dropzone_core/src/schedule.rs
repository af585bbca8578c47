// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cancellable "next tick" and "next frame" task primitives.
//!
//! Collection is split across scheduling slots so that layout reads and
//! publication never share one. The [`Scheduler`] trait exposes the two slot
//! kinds the marshal needs:
//!
//! - **Tick**: run soon, after the current call stack unwinds (a zero-delay
//!   timer on the web).
//! - **Frame**: run before the next paint (`requestAnimationFrame` on the
//!   web). A frame task requested from inside a frame task runs on the
//!   *following* frame.
//!
//! Cancelling a handle that already fired, was already cancelled, or was never
//! issued by the scheduler is a no-op.
//!
//! [`ManualScheduler`] is an explicit tick scheduler for hosts without a
//! platform event loop and for tests: nothing runs until the owner calls
//! [`run_ticks`](ManualScheduler::run_ticks) or
//! [`run_frame`](ManualScheduler::run_frame).

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use core::cell::RefCell;
use core::fmt;

/// A single-shot unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Which scheduling slot a task was queued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Runs on the next tick.
    Tick,
    /// Runs on the next paint frame.
    Frame,
}

/// Identifies a scheduled task so it can be cancelled.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    kind: TaskKind,
    id: u64,
}

impl TaskHandle {
    /// Creates a handle. Schedulers choose `id`; it only has to be unique per
    /// scheduler and kind.
    #[inline]
    #[must_use]
    pub const fn new(kind: TaskKind, id: u64) -> Self {
        Self { kind, id }
    }

    /// Returns the slot kind.
    #[inline]
    #[must_use]
    pub const fn kind(self) -> TaskKind {
        self.kind
    }

    /// Returns the scheduler-assigned id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.id
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskHandle({:?}#{})", self.kind, self.id)
    }
}

/// Schedules single-shot tasks on a cooperative, single-threaded event loop.
///
/// Methods take `&self` because tasks commonly schedule follow-up work on the
/// same scheduler while it is running them.
pub trait Scheduler {
    /// Queues `task` for the next tick.
    fn defer(&self, task: Task) -> TaskHandle;

    /// Queues `task` for the next paint frame.
    fn request_frame(&self, task: Task) -> TaskHandle;

    /// Cancels a pending task. Must be a no-op for fired or unknown handles.
    fn cancel(&self, handle: TaskHandle);
}

#[derive(Default)]
struct Queues {
    next_id: u64,
    ticks: VecDeque<(u64, Task)>,
    frames: VecDeque<(u64, Task)>,
    frame_index: u64,
}

impl Queues {
    fn issue(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn queue(&mut self, kind: TaskKind) -> &mut VecDeque<(u64, Task)> {
        match kind {
            TaskKind::Tick => &mut self.ticks,
            TaskKind::Frame => &mut self.frames,
        }
    }
}

/// A [`Scheduler`] driven explicitly by its owner.
///
/// Tasks only run inside [`run_ticks`](Self::run_ticks) and
/// [`run_frame`](Self::run_frame). Each call runs the tasks that were queued
/// *before* the call started; anything queued while running waits for the
/// next call, the same way a browser defers a `requestAnimationFrame`
/// registered from inside a frame callback.
#[derive(Default)]
pub struct ManualScheduler {
    queues: RefCell<Queues>,
}

impl ManualScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs all tick tasks queued before this call. Returns how many ran.
    pub fn run_ticks(&self) -> usize {
        self.run(TaskKind::Tick)
    }

    /// Runs one paint frame: all frame tasks queued before this call. Returns
    /// how many ran.
    pub fn run_frame(&self) -> usize {
        self.queues.borrow_mut().frame_index += 1;
        self.run(TaskKind::Frame)
    }

    /// Number of tick tasks waiting to run.
    #[must_use]
    pub fn pending_ticks(&self) -> usize {
        self.queues.borrow().ticks.len()
    }

    /// Number of frame tasks waiting to run.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.queues.borrow().frames.len()
    }

    /// Number of frames run so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.queues.borrow().frame_index
    }

    fn run(&self, kind: TaskKind) -> usize {
        let cutoff = self.queues.borrow().next_id;
        let mut ran = 0;
        loop {
            // Pop one task at a time and release the borrow before running it,
            // so the task can schedule or cancel freely.
            let next = {
                let mut queues = self.queues.borrow_mut();
                let queue = queues.queue(kind);
                let ready = queue.front().is_some_and(|(id, _)| *id < cutoff);
                if ready { queue.pop_front() } else { None }
            };
            let Some((_, task)) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, task: Task) -> TaskHandle {
        let mut queues = self.queues.borrow_mut();
        let id = queues.issue();
        queues.ticks.push_back((id, task));
        TaskHandle::new(TaskKind::Tick, id)
    }

    fn request_frame(&self, task: Task) -> TaskHandle {
        let mut queues = self.queues.borrow_mut();
        let id = queues.issue();
        queues.frames.push_back((id, task));
        TaskHandle::new(TaskKind::Frame, id)
    }

    fn cancel(&self, handle: TaskHandle) {
        let removed = {
            let mut queues = self.queues.borrow_mut();
            let queue = queues.queue(handle.kind());
            queue
                .iter()
                .position(|(id, _)| *id == handle.id())
                .and_then(|pos| queue.remove(pos))
        };
        // Drop the task outside the borrow; its captures may own schedulers.
        drop(removed);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues = self.queues.borrow();
        f.debug_struct("ManualScheduler")
            .field("pending_ticks", &queues.ticks.len())
            .field("pending_frames", &queues.frames.len())
            .field("frame_index", &queues.frame_index)
            .finish()
    }
}
