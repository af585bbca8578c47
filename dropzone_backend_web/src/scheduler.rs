// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `setTimeout` and `requestAnimationFrame` scheduling.
//!
//! Every scheduled task is wrapped in a JS closure that stays registered in
//! [`BrowserScheduler`] until it fires or is cancelled. A firing closure
//! removes and drops its own entry; `wasm-bindgen` defers freeing a closure
//! that is being invoked until the invocation returns.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use core::cell::{Cell, RefCell};
use core::fmt;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use dropzone_core::schedule::{Scheduler, Task, TaskHandle, TaskKind};

// Direct global bindings instead of `web_sys::Window` methods; avoids
// fetching (and unwrapping) the Window object on every call.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = "setTimeout")]
    fn set_timeout(callback: &JsValue, delay_ms: i32) -> i32;

    #[wasm_bindgen(js_name = "clearTimeout")]
    fn clear_timeout(id: i32);

    #[wasm_bindgen(js_name = "requestAnimationFrame")]
    fn request_animation_frame(callback: &JsValue) -> i32;

    #[wasm_bindgen(js_name = "cancelAnimationFrame")]
    fn cancel_animation_frame(id: i32);
}

type TaskClosure = Closure<dyn FnMut()>;

struct Pending {
    kind: TaskKind,
    /// The id returned by `setTimeout` or `requestAnimationFrame`.
    js_id: i32,
    closure: TaskClosure,
}

impl Pending {
    fn clear(&self) {
        match self.kind {
            TaskKind::Tick => clear_timeout(self.js_id),
            TaskKind::Frame => cancel_animation_frame(self.js_id),
        }
    }
}

#[derive(Default)]
struct SchedulerInner {
    next_id: Cell<u64>,
    pending: RefCell<BTreeMap<u64, Pending>>,
}

/// A [`Scheduler`] backed by the browser event loop.
///
/// Ticks run on a zero-delay `setTimeout`, frames on `requestAnimationFrame`,
/// so a frame requested from inside a frame callback runs on the following
/// frame. Dropping the scheduler cancels everything still pending.
pub struct BrowserScheduler {
    inner: Rc<SchedulerInner>,
}

impl BrowserScheduler {
    /// Creates a scheduler with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner::default()),
        }
    }

    /// Number of tasks waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    fn schedule(&self, kind: TaskKind, task: Task) -> TaskHandle {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);

        let weak: Weak<SchedulerInner> = Rc::downgrade(&self.inner);
        let mut task = Some(task);
        let closure = Closure::wrap(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                let own = inner.pending.borrow_mut().remove(&id);
                drop(own);
            }
            // The borrow of `pending` is released before running the task,
            // so the task may schedule or cancel freely.
            if let Some(task) = task.take() {
                task();
            }
        }) as Box<dyn FnMut()>);

        let callback = closure.as_ref().unchecked_ref();
        let js_id = match kind {
            TaskKind::Tick => set_timeout(callback, 0),
            TaskKind::Frame => request_animation_frame(callback),
        };
        self.inner.pending.borrow_mut().insert(
            id,
            Pending {
                kind,
                js_id,
                closure,
            },
        );
        TaskHandle::new(kind, id)
    }
}

impl Default for BrowserScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for BrowserScheduler {
    fn defer(&self, task: Task) -> TaskHandle {
        self.schedule(TaskKind::Tick, task)
    }

    fn request_frame(&self, task: Task) -> TaskHandle {
        self.schedule(TaskKind::Frame, task)
    }

    fn cancel(&self, handle: TaskHandle) {
        let entry = self.inner.pending.borrow_mut().remove(&handle.id());
        // Fired and unknown handles are not in the map.
        if let Some(entry) = entry {
            entry.clear();
        }
    }
}

impl Drop for BrowserScheduler {
    fn drop(&mut self) {
        let pending = core::mem::take(&mut *self.inner.pending.borrow_mut());
        for entry in pending.values() {
            entry.clear();
        }
    }
}

impl fmt::Debug for BrowserScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserScheduler")
            .field("pending", &self.inner.pending.borrow().len())
            .field("next_id", &self.inner.next_id.get())
            .finish_non_exhaustive()
    }
}
