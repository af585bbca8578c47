// Copyright 2026 the Dropzone Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Registration lifecycle and frame-batched dimension collection.
//!
//! [`DimensionMarshal`] owns the [`Registry`] and runs at most one collection
//! session at a time:
//!
//! ```text
//!   on_phase_change(CollectingInitialDimensions)
//!       │
//!       ▼
//!   initial publish (sync) ──► home container + dragged item
//!       │
//!       ▼  Scheduler::defer
//!   lift ──► Scheduler::request_frame
//!       │
//!       ▼  frame N
//!   measure every candidate into one buffer (reads only)
//!       │
//!       ▼  frame N+1
//!   publish container batch, item batch, watch scroll (writes only)
//! ```
//!
//! The measurement frame requests the publication frame only after every
//! read has completed, so reads and writes of one session never interleave.
//! A stop (explicit, or from a drop/idle phase) cancels whichever task is
//! pending and returns to idle.
//!
//! The marshal never holds an internal borrow while calling out to a
//! measurement callback, container handle, publisher, or trace sink.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use kurbo::Vec2;
use tracing::{debug, debug_span, error, warn};

use crate::descriptor::{ContainerDescriptor, Descriptor, ItemDescriptor};
use crate::dimension::{Dimension, partition};
use crate::error::{CollectionError, RegistryError};
use crate::id::{ContainerId, ItemId};
use crate::phase::{Phase, PhaseReaction, PhaseSnapshot};
use crate::publish::Publisher;
use crate::registry::{
    ContainerEntry, ContainerHandle, ItemEntry, MeasureItem, Registry, ScrollListener,
};
use crate::schedule::Scheduler;
use crate::session::{Session, SessionCell, SessionStage, Timers};
use crate::trace::{
    CollectPhase, PhaseBeginEvent, PhaseEndEvent, PublishEvent, PublishKind, SessionStartEvent,
    SessionStopEvent, SharedSink, Tracer,
};

/// Result of a successful unregistration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unregistered {
    /// The entry was removed.
    Removed,
    /// The entry was removed while a session was active. Dimensions already
    /// published for it are not retracted.
    DuringCollection,
}

/// Result of [`DimensionMarshal::stop_collecting`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    /// The active session was stopped.
    Stopped,
    /// There was no session to stop; nothing changed.
    NotCollecting,
}

/// Coordinates entity registration with frame-batched dimension collection.
///
/// Cloning is cheap and yields another handle to the same marshal.
#[derive(Clone)]
pub struct DimensionMarshal {
    inner: Rc<Inner>,
}

struct Inner {
    registry: RefCell<Registry>,
    session: SessionCell,
    session_counter: Cell<u64>,
    publisher: Rc<dyn Publisher>,
    scheduler: Rc<dyn Scheduler>,
    tracer: RefCell<Tracer>,
}

impl DimensionMarshal {
    /// Creates a marshal publishing to `publisher` and scheduling on
    /// `scheduler`.
    #[must_use]
    pub fn new(publisher: Rc<dyn Publisher>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(Inner {
                registry: RefCell::new(Registry::new()),
                session: SessionCell::default(),
                session_counter: Cell::new(0),
                publisher,
                scheduler,
                tracer: RefCell::new(Tracer::none()),
            }),
        }
    }

    /// Installs a trace sink and returns the marshal.
    #[must_use]
    pub fn with_trace(self, sink: SharedSink) -> Self {
        self.set_trace_sink(sink);
        self
    }

    /// Installs a trace sink, replacing any previous one.
    pub fn set_trace_sink(&self, sink: SharedSink) {
        *self.inner.tracer.borrow_mut() = Tracer::new(sink);
    }

    // -- Registration API --

    /// Registers an item.
    ///
    /// If a session is active the item is measured and published right away.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateItem`] if the id is already registered; the
    /// existing entry is kept.
    pub fn register_item(
        &self,
        descriptor: ItemDescriptor,
        measure: impl MeasureItem + 'static,
    ) -> Result<(), RegistryError> {
        self.inner.register_item(descriptor, Rc::new(measure))
    }

    /// Registers a container.
    ///
    /// If a session is active the container is measured, published, and
    /// starts reporting scroll changes right away.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateContainer`] if the id is already registered;
    /// the existing entry is kept.
    pub fn register_container(
        &self,
        descriptor: ContainerDescriptor,
        handle: impl ContainerHandle + 'static,
    ) -> Result<(), RegistryError> {
        self.inner.register_container(descriptor, Rc::new(handle))
    }

    /// Unregisters an item.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownItem`] if no such item is registered.
    pub fn unregister_item(&self, id: &ItemId) -> Result<Unregistered, RegistryError> {
        self.inner.unregister_item(id)
    }

    /// Unregisters a container.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownContainer`] if no such container is
    /// registered.
    pub fn unregister_container(&self, id: &ContainerId) -> Result<Unregistered, RegistryError> {
        self.inner.unregister_container(id)
    }

    // -- Collection API --

    /// Publishes the dragged item and its home container, then schedules
    /// collection of every compatible entity.
    ///
    /// # Errors
    ///
    /// Fails if a session is already active or the item or its home
    /// container is not registered. The publisher's
    /// [`cancel`](Publisher::cancel) has been called in every error case.
    pub fn start_initial_collection(
        &self,
        descriptor: &ItemDescriptor,
    ) -> Result<(), CollectionError> {
        self.inner.start_initial_collection(descriptor)
    }

    /// Stops the active session: stops scroll watching on every container
    /// and cancels pending scheduled work.
    ///
    /// Returns [`StopOutcome::NotCollecting`] (and only logs) when idle.
    pub fn stop_collecting(&self) -> StopOutcome {
        self.inner.stop_collecting()
    }

    /// Reacts to a phase change of the external drag state machine.
    pub fn on_phase_change(&self, snapshot: &PhaseSnapshot) -> PhaseReaction {
        match snapshot.phase {
            Phase::CollectingInitialDimensions => {
                let Some(request) = &snapshot.request else {
                    let err = CollectionError::MissingRequest;
                    return PhaseReaction::Rejected(self.inner.reject(err));
                };
                match self.inner.start_initial_collection(request) {
                    Ok(()) => PhaseReaction::Started,
                    Err(err) => PhaseReaction::Rejected(err),
                }
            }
            Phase::DropAnimating | Phase::DropComplete | Phase::Idle => {
                if !self.is_collecting() {
                    return PhaseReaction::Ignored;
                }
                match self.inner.stop_collecting() {
                    StopOutcome::Stopped => PhaseReaction::Stopped,
                    StopOutcome::NotCollecting => PhaseReaction::Ignored,
                }
            }
            Phase::Preparing | Phase::Dragging => PhaseReaction::Ignored,
        }
    }

    // -- Queries --

    /// Whether a session is active.
    #[must_use]
    pub fn is_collecting(&self) -> bool {
        self.inner.session.get().collecting
    }

    /// Current session stage.
    #[must_use]
    pub fn stage(&self) -> SessionStage {
        self.inner.session.get().stage
    }

    /// Current session state.
    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.session.get()
    }

    /// Number of registered items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.inner.registry.borrow().item_count()
    }

    /// Number of registered containers.
    #[must_use]
    pub fn container_count(&self) -> usize {
        self.inner.registry.borrow().container_count()
    }

    /// Whether an item with `id` is registered.
    #[must_use]
    pub fn contains_item(&self, id: &ItemId) -> bool {
        self.inner.registry.borrow().item(id).is_some()
    }

    /// Whether a container with `id` is registered.
    #[must_use]
    pub fn contains_container(&self, id: &ContainerId) -> bool {
        self.inner.registry.borrow().container(id).is_some()
    }
}

impl fmt::Debug for DimensionMarshal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.borrow();
        f.debug_struct("DimensionMarshal")
            .field("items", &registry.item_count())
            .field("containers", &registry.container_count())
            .field("session", &self.inner.session.get())
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn tracer(&self) -> Tracer {
        self.tracer.borrow().clone()
    }

    fn scroll_listener(&self) -> ScrollListener {
        let publisher = Rc::clone(&self.publisher);
        Rc::new(move |id: &ContainerId, offset: Vec2| publisher.update_container_scroll(id, offset))
    }

    fn register_item(
        &self,
        descriptor: ItemDescriptor,
        measure: Rc<dyn MeasureItem>,
    ) -> Result<(), RegistryError> {
        let inserted = self.registry.borrow_mut().insert_item(descriptor, measure);
        let entry = inserted.inspect_err(|err| error!("{err}"))?;

        let session = self.session.get();
        if !session.collecting {
            return Ok(());
        }

        debug!(item = %entry.descriptor.id, "publishing item registered mid collection");
        self.publisher.publish_items(vec![entry.measure()]);
        self.tracer().publish(&PublishEvent {
            session: session.id,
            kind: PublishKind::Late,
            containers: 0,
            items: 1,
        });
        Ok(())
    }

    fn register_container(
        &self,
        descriptor: ContainerDescriptor,
        handle: Rc<dyn ContainerHandle>,
    ) -> Result<(), RegistryError> {
        let inserted = self
            .registry
            .borrow_mut()
            .insert_container(descriptor, handle);
        let entry = inserted.inspect_err(|err| error!("{err}"))?;

        let session = self.session.get();
        if !session.collecting {
            return Ok(());
        }

        debug!(container = %entry.descriptor.id, "publishing container registered mid collection");
        self.publisher.publish_containers(vec![entry.measure()]);
        if !self.session.get().is_current(session.id) {
            debug!(container = %entry.descriptor.id, "session stopped while publishing; not watching scroll");
            return Ok(());
        }
        entry.handle.watch_scroll(self.scroll_listener());
        self.tracer().publish(&PublishEvent {
            session: session.id,
            kind: PublishKind::Late,
            containers: 1,
            items: 0,
        });
        Ok(())
    }

    fn unregister_item(&self, id: &ItemId) -> Result<Unregistered, RegistryError> {
        let removed = self.registry.borrow_mut().remove_item(id);
        removed.inspect_err(|err| error!("{err}"))?;

        if !self.session.get().collecting {
            return Ok(Unregistered::Removed);
        }
        warn!(item = %id, "unregistering an item during a drag is not supported; its dimension stays published");
        Ok(Unregistered::DuringCollection)
    }

    fn unregister_container(&self, id: &ContainerId) -> Result<Unregistered, RegistryError> {
        let removed = self.registry.borrow_mut().remove_container(id);
        let entry = removed.inspect_err(|err| error!("{err}"))?;

        if !self.session.get().collecting {
            return Ok(Unregistered::Removed);
        }
        warn!(container = %id, "unregistering a container during a drag is not supported; its dimension stays published");
        // A stop only reaches registered containers, so detach this one now.
        entry.handle.unwatch_scroll();
        Ok(Unregistered::DuringCollection)
    }

    /// Logs, traces, and signals cancellation for a refused session start.
    fn reject(&self, err: CollectionError) -> CollectionError {
        error!("{err}");
        self.tracer().rejected(&err);
        self.publisher.cancel();
        err
    }

    fn lookup_drag(
        &self,
        descriptor: &ItemDescriptor,
    ) -> Result<(ItemEntry, ContainerEntry), CollectionError> {
        let registry = self.registry.borrow();
        let item = registry
            .item(&descriptor.id)
            .cloned()
            .ok_or_else(|| CollectionError::UnknownItem(descriptor.id.clone()))?;
        let home = registry
            .container(&item.descriptor.container_id)
            .cloned()
            .ok_or_else(|| CollectionError::UnknownHomeContainer {
                item: item.descriptor.id.clone(),
                container: item.descriptor.container_id.clone(),
            })?;
        Ok((item, home))
    }

    fn start_initial_collection(
        self: &Rc<Self>,
        descriptor: &ItemDescriptor,
    ) -> Result<(), CollectionError> {
        if self.session.get().collecting {
            return Err(self.reject(CollectionError::AlreadyCollecting));
        }
        let (item, home) = self
            .lookup_drag(descriptor)
            .map_err(|err| self.reject(err))?;

        let id = self.session_counter.get() + 1;
        self.session_counter.set(id);
        let session = Session {
            id,
            collecting: true,
            stage: SessionStage::InitialPublish,
            timers: Timers::NONE,
        };
        self.session.replace(session);

        let span = debug_span!("initial_publish", session = id, item = %item.descriptor.id);
        let candidates = span.in_scope(|| {
            let home_dimension = home.measure();
            let item_dimension = item.measure();
            self.publisher.publish_containers(vec![home_dimension]);
            self.publisher.publish_items(vec![item_dimension]);
            if self.session.get().is_current(id) {
                home.handle.watch_scroll(self.scroll_listener());
            }

            self.registry
                .borrow()
                .candidates(&item.descriptor.id, &home.descriptor)
        });

        let tracer = self.tracer();
        tracer.publish(&PublishEvent {
            session: id,
            kind: PublishKind::Initial,
            containers: 1,
            items: 1,
        });
        tracer.session_start(&SessionStartEvent {
            session: id,
            item: item.descriptor.id.clone(),
            home: home.descriptor.id.clone(),
            candidates: candidates.len(),
        });

        // A publisher may have stopped the session from inside a callback.
        if !self.session.get().is_current(id) {
            debug!(session = id, "session stopped during initial publish");
            return Ok(());
        }

        debug!(
            session = id,
            candidates = candidates.len(),
            "initial dimensions published; scheduling collection"
        );
        let weak = Rc::downgrade(self);
        let lift = self.scheduler.defer(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lift(id, candidates);
            }
        }));
        self.session.replace(session.advance(
            SessionStage::Deferred,
            Timers {
                lift: Some(lift),
                frame: None,
            },
        ));
        Ok(())
    }

    /// Runs on the tick after the initial publish; requests the measurement
    /// frame.
    fn lift(self: &Rc<Self>, id: u64, candidates: Vec<Descriptor>) {
        let session = self.session.get();
        if !session.is_current(id) {
            debug!(session = id, "ignoring lift for a stopped session");
            return;
        }
        let weak = Rc::downgrade(self);
        let frame = self.scheduler.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.measure_frame(id, candidates);
            }
        }));
        self.session.replace(session.advance(
            SessionStage::Measuring,
            Timers {
                lift: None,
                frame: Some(frame),
            },
        ));
    }

    /// Phase 1: read every candidate's geometry, then request phase 2.
    fn measure_frame(self: &Rc<Self>, id: u64, candidates: Vec<Descriptor>) {
        if !self.session.get().is_current(id) {
            debug!(session = id, "ignoring measurement frame for a stopped session");
            return;
        }
        let tracer = self.tracer();
        tracer.phase_begin(&PhaseBeginEvent {
            session: id,
            phase: CollectPhase::Measure,
        });

        let span = debug_span!("collect_dimensions", session = id);
        let buffer: Vec<Dimension> = span.in_scope(|| {
            let entries: Vec<_> = {
                let registry = self.registry.borrow();
                candidates
                    .iter()
                    .filter_map(|d| registry.resolve(d))
                    .collect()
            };
            if entries.len() != candidates.len() {
                debug!(
                    session = id,
                    skipped = candidates.len() - entries.len(),
                    "candidates unregistered before measurement"
                );
            }
            entries.iter().map(|e| e.measure()).collect()
        });

        tracer.phase_end(&PhaseEndEvent {
            session: id,
            phase: CollectPhase::Measure,
            dimensions: buffer.len(),
        });

        // A measurement callback may have stopped the session.
        let session = self.session.get();
        if !session.is_current(id) {
            return;
        }
        let weak = Rc::downgrade(self);
        let frame = self.scheduler.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.publish_frame(id, buffer);
            }
        }));
        self.session.replace(session.advance(
            SessionStage::Publishing,
            Timers {
                lift: None,
                frame: Some(frame),
            },
        ));
    }

    /// Phase 2: publish both batches, then watch scroll on every published
    /// container.
    fn publish_frame(&self, id: u64, buffer: Vec<Dimension>) {
        if !self.session.get().is_current(id) {
            debug!(session = id, "ignoring publication frame for a stopped session");
            return;
        }
        let tracer = self.tracer();
        tracer.phase_begin(&PhaseBeginEvent {
            session: id,
            phase: CollectPhase::Publish,
        });

        let span = debug_span!("publish_dimensions", session = id);
        let published = span.in_scope(|| {
            let total = buffer.len();
            let (containers, items) = partition(buffer);
            let container_ids: Vec<ContainerId> = containers
                .iter()
                .map(|d| d.descriptor.id.clone())
                .collect();
            let counts = (containers.len(), items.len());

            self.publisher.publish_containers(containers);
            self.publisher.publish_items(items);
            debug!(
                session = id,
                containers = counts.0,
                items = counts.1,
                "published collected dimensions"
            );

            // The publisher may have stopped the session; a stop never comes
            // back to detach watchers attached after it.
            if !self.session.get().is_current(id) {
                debug!(session = id, "session stopped while publishing; not watching scroll");
                return total;
            }

            let handles: Vec<Rc<dyn ContainerHandle>> = {
                let registry = self.registry.borrow();
                container_ids
                    .iter()
                    .filter_map(|c| registry.container(c))
                    .map(|e| Rc::clone(&e.handle))
                    .collect()
            };
            for handle in handles {
                handle.watch_scroll(self.scroll_listener());
            }

            tracer.publish(&PublishEvent {
                session: id,
                kind: PublishKind::Batch,
                containers: counts.0,
                items: counts.1,
            });
            total
        });

        tracer.phase_end(&PhaseEndEvent {
            session: id,
            phase: CollectPhase::Publish,
            dimensions: published,
        });

        let session = self.session.get();
        if session.is_current(id) {
            self.session
                .replace(session.advance(SessionStage::Published, Timers::NONE));
        }
    }

    fn stop_collecting(&self) -> StopOutcome {
        let session = self.session.get();
        if !session.collecting {
            warn!("not stopping dimension collection as none is active");
            return StopOutcome::NotCollecting;
        }

        // Go idle first so anything a callback below does sees no session.
        self.session.replace(Session::idle(session.id));

        let handles: Vec<Rc<dyn ContainerHandle>> = self
            .registry
            .borrow()
            .containers()
            .map(|e| Rc::clone(&e.handle))
            .collect();
        for handle in handles {
            handle.unwatch_scroll();
        }

        if let Some(lift) = session.timers.lift {
            self.scheduler.cancel(lift);
        }
        if let Some(frame) = session.timers.frame {
            self.scheduler.cancel(frame);
        }

        debug!(session = session.id, stage = ?session.stage, "stopped dimension collection");
        self.tracer().session_stop(&SessionStopEvent {
            session: session.id,
            cancelled_lift: session.timers.lift.is_some(),
            cancelled_frame: session.timers.frame.is_some(),
        });
        StopOutcome::Stopped
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;

    use kurbo::Rect;

    use super::*;
    use crate::dimension::{ContainerDimension, ItemDimension};
    use crate::schedule::ManualScheduler;

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Items(Vec<String>),
        Containers(Vec<String>),
        Scroll(String, Vec2),
        Cancel,
    }

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<Call>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<Call> {
            core::mem::take(&mut *self.calls.borrow_mut())
        }
    }

    impl Publisher for Recorder {
        fn publish_items(&self, dimensions: Vec<ItemDimension>) {
            let ids = dimensions.iter().map(|d| d.descriptor.id.to_string()).collect();
            self.calls.borrow_mut().push(Call::Items(ids));
        }

        fn publish_containers(&self, dimensions: Vec<ContainerDimension>) {
            let ids = dimensions.iter().map(|d| d.descriptor.id.to_string()).collect();
            self.calls.borrow_mut().push(Call::Containers(ids));
        }

        fn update_container_scroll(&self, id: &ContainerId, offset: Vec2) {
            self.calls
                .borrow_mut()
                .push(Call::Scroll(id.to_string(), offset));
        }

        fn cancel(&self) {
            self.calls.borrow_mut().push(Call::Cancel);
        }
    }

    struct FakeContainer {
        descriptor: ContainerDescriptor,
        listener: Rc<RefCell<Option<ScrollListener>>>,
    }

    impl FakeContainer {
        fn new(descriptor: ContainerDescriptor) -> (Self, Rc<RefCell<Option<ScrollListener>>>) {
            let listener = Rc::new(RefCell::new(None));
            let fake = Self {
                descriptor,
                listener: Rc::clone(&listener),
            };
            (fake, listener)
        }
    }

    impl ContainerHandle for FakeContainer {
        fn measure(&self) -> ContainerDimension {
            ContainerDimension::new(self.descriptor.clone(), Rect::new(0.0, 0.0, 100.0, 400.0))
        }

        fn watch_scroll(&self, listener: ScrollListener) {
            *self.listener.borrow_mut() = Some(listener);
        }

        fn unwatch_scroll(&self) {
            *self.listener.borrow_mut() = None;
        }
    }

    struct Harness {
        publisher: Rc<Recorder>,
        scheduler: Rc<ManualScheduler>,
        marshal: DimensionMarshal,
    }

    impl Harness {
        fn new() -> Self {
            let publisher = Rc::new(Recorder::default());
            let scheduler = Rc::new(ManualScheduler::new());
            let marshal = DimensionMarshal::new(
                Rc::clone(&publisher) as Rc<dyn Publisher>,
                Rc::clone(&scheduler) as Rc<dyn Scheduler>,
            );
            Self {
                publisher,
                scheduler,
                marshal,
            }
        }

        fn item(&self, id: &str, container: &str) {
            let descriptor = ItemDescriptor::new(id, container);
            let measured = descriptor.clone();
            self.marshal
                .register_item(descriptor, move || {
                    ItemDimension::new(measured.clone(), Rect::new(0.0, 0.0, 100.0, 40.0))
                })
                .unwrap();
        }

        fn container(&self, id: &str, group: &str) -> Rc<RefCell<Option<ScrollListener>>> {
            let (fake, listener) = FakeContainer::new(ContainerDescriptor::new(id, group));
            let descriptor = fake.descriptor.clone();
            self.marshal.register_container(descriptor, fake).unwrap();
            listener
        }

        fn run_session(&self) {
            self.scheduler.run_ticks();
            self.scheduler.run_frame();
            self.scheduler.run_frame();
        }
    }

    fn items(ids: &[&str]) -> Call {
        Call::Items(ids.iter().map(|s| String::from(*s)).collect())
    }

    fn containers(ids: &[&str]) -> Call {
        Call::Containers(ids.iter().map(|s| String::from(*s)).collect())
    }

    fn drag(id: &str, container: &str) -> ItemDescriptor {
        ItemDescriptor::new(id, container)
    }

    #[test]
    fn duplicate_registration_keeps_first_entry() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        let err = h
            .marshal
            .register_item(drag("a", "other"), || {
                ItemDimension::new(drag("a", "other"), Rect::ZERO)
            })
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateItem(ItemId::new("a")));
        assert_eq!(h.marshal.item_count(), 1);

        let (fake, _) = FakeContainer::new(ContainerDescriptor::new("list", "other"));
        let err = h
            .marshal
            .register_container(ContainerDescriptor::new("list", "other"), fake)
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateContainer(ContainerId::new("list")));
        assert!(h.publisher.take().is_empty());
    }

    #[test]
    fn unregistering_unknown_entries_fails() {
        let h = Harness::new();
        assert_eq!(
            h.marshal.unregister_item(&ItemId::new("ghost")),
            Err(RegistryError::UnknownItem(ItemId::new("ghost")))
        );
        assert_eq!(
            h.marshal.unregister_container(&ContainerId::new("ghost")),
            Err(RegistryError::UnknownContainer(ContainerId::new("ghost")))
        );
    }

    #[test]
    fn idle_registration_publishes_nothing() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        assert!(h.marshal.contains_item(&ItemId::new("a")));
        assert_eq!(
            h.marshal.unregister_item(&ItemId::new("a")),
            Ok(Unregistered::Removed)
        );
        assert!(h.publisher.take().is_empty());
    }

    #[test]
    fn collection_spans_a_tick_and_two_frames() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.item("b", "list");

        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        assert_eq!(h.publisher.take(), [containers(&["list"]), items(&["a"])]);
        assert_eq!(h.marshal.stage(), SessionStage::Deferred);

        h.scheduler.run_ticks();
        assert_eq!(h.marshal.stage(), SessionStage::Measuring);
        assert!(h.publisher.take().is_empty());

        h.scheduler.run_frame();
        assert_eq!(h.marshal.stage(), SessionStage::Publishing);
        assert!(h.publisher.take().is_empty());

        h.scheduler.run_frame();
        assert_eq!(h.marshal.stage(), SessionStage::Published);
        assert_eq!(h.publisher.take(), [containers(&[]), items(&["b"])]);
        assert!(h.marshal.is_collecting());
        assert_eq!(h.scheduler.pending_frames(), 0);
    }

    #[test]
    fn home_container_reports_scroll_once_watched() {
        let h = Harness::new();
        let listener = h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        h.publisher.take();

        let watch = listener.borrow().clone().unwrap();
        watch(&ContainerId::new("list"), Vec2::new(0.0, 12.0));
        assert_eq!(
            h.publisher.take(),
            [Call::Scroll(String::from("list"), Vec2::new(0.0, 12.0))]
        );

        h.marshal.stop_collecting();
        assert!(listener.borrow().is_none());
    }

    #[test]
    fn stop_cancels_pending_work() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.item("b", "list");

        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        h.scheduler.run_ticks();
        assert_eq!(h.scheduler.pending_frames(), 1);
        h.publisher.take();

        assert_eq!(h.marshal.stop_collecting(), StopOutcome::Stopped);
        assert_eq!(h.scheduler.pending_frames(), 0);
        h.run_session();
        assert!(h.publisher.take().is_empty());
        assert_eq!(h.marshal.stage(), SessionStage::Idle);
    }

    #[test]
    fn stop_before_the_lift_cancels_it() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        assert_eq!(h.scheduler.pending_ticks(), 1);

        h.marshal.stop_collecting();
        assert_eq!(h.scheduler.pending_ticks(), 0);
        assert_eq!(h.scheduler.run_ticks(), 0);
    }

    #[test]
    fn second_stop_is_a_noop() {
        let h = Harness::new();
        let listener = h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        h.scheduler.run_ticks();
        assert_eq!(h.marshal.stop_collecting(), StopOutcome::Stopped);
        h.publisher.take();

        // Reattach by hand: a second stop must not reach the container.
        let sentinel: ScrollListener = Rc::new(|_: &ContainerId, _: Vec2| {});
        *listener.borrow_mut() = Some(sentinel);
        let before = h.marshal.session();

        assert_eq!(h.marshal.stop_collecting(), StopOutcome::NotCollecting);
        assert!(!h.marshal.is_collecting());
        assert_eq!(h.marshal.session(), before);
        assert!(listener.borrow().is_some());
        assert!(h.publisher.take().is_empty());
        assert_eq!(h.scheduler.pending_ticks(), 0);
        assert_eq!(h.scheduler.pending_frames(), 0);
    }

    #[test]
    fn sessions_can_restart_after_stop() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        let first = h.marshal.session().id;
        h.marshal.stop_collecting();
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        assert_eq!(h.marshal.session().id, first + 1);
    }

    #[test]
    fn already_collecting_rejects_and_cancels() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        h.publisher.take();

        let err = h.marshal.start_initial_collection(&drag("a", "list"));
        assert_eq!(err, Err(CollectionError::AlreadyCollecting));
        assert_eq!(h.publisher.take(), [Call::Cancel]);
        assert!(h.marshal.is_collecting());
    }

    #[test]
    fn unknown_item_or_home_rejects() {
        let h = Harness::new();
        h.item("orphan", "missing");

        let err = h.marshal.start_initial_collection(&drag("ghost", "list"));
        assert_eq!(err, Err(CollectionError::UnknownItem(ItemId::new("ghost"))));

        let err = h.marshal.start_initial_collection(&drag("orphan", "missing"));
        assert_eq!(
            err,
            Err(CollectionError::UnknownHomeContainer {
                item: ItemId::new("orphan"),
                container: ContainerId::new("missing"),
            })
        );
        assert_eq!(h.publisher.take(), [Call::Cancel, Call::Cancel]);
        assert!(!h.marshal.is_collecting());
        assert_eq!(h.scheduler.pending_ticks(), 0);
    }

    #[test]
    fn phase_changes_drive_the_session() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");

        assert_eq!(
            h.marshal.on_phase_change(&PhaseSnapshot::new(Phase::Preparing)),
            PhaseReaction::Ignored
        );
        assert_eq!(
            h.marshal
                .on_phase_change(&PhaseSnapshot::collecting(drag("a", "list"))),
            PhaseReaction::Started
        );
        assert_eq!(
            h.marshal.on_phase_change(&PhaseSnapshot::new(Phase::Dragging)),
            PhaseReaction::Ignored
        );
        assert!(h.marshal.is_collecting());
        assert_eq!(
            h.marshal
                .on_phase_change(&PhaseSnapshot::new(Phase::DropAnimating)),
            PhaseReaction::Stopped
        );
        assert_eq!(
            h.marshal
                .on_phase_change(&PhaseSnapshot::new(Phase::DropComplete)),
            PhaseReaction::Ignored
        );
    }

    #[test]
    fn idle_phase_stops_a_cancelled_drag() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal
            .on_phase_change(&PhaseSnapshot::collecting(drag("a", "list")));
        assert_eq!(
            h.marshal.on_phase_change(&PhaseSnapshot::new(Phase::Idle)),
            PhaseReaction::Stopped
        );
        assert!(!h.marshal.is_collecting());
    }

    #[test]
    fn collecting_phase_without_request_cancels() {
        let h = Harness::new();
        let snapshot = PhaseSnapshot::new(Phase::CollectingInitialDimensions);
        assert_eq!(
            h.marshal.on_phase_change(&snapshot),
            PhaseReaction::Rejected(CollectionError::MissingRequest)
        );
        assert_eq!(h.publisher.take(), [Call::Cancel]);
    }

    #[test]
    fn late_registration_is_published_immediately() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        h.run_session();
        h.publisher.take();

        let listener = h.container("late", "DEFAULT");
        h.item("c", "late");
        assert_eq!(h.publisher.take(), [containers(&["late"]), items(&["c"])]);
        assert!(listener.borrow().is_some());
    }

    #[test]
    fn unregistered_candidates_are_skipped() {
        let h = Harness::new();
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.item("b", "list");
        h.item("c", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        h.publisher.take();

        assert_eq!(
            h.marshal.unregister_item(&ItemId::new("b")),
            Ok(Unregistered::DuringCollection)
        );
        h.run_session();
        assert_eq!(h.publisher.take(), [containers(&[]), items(&["c"])]);
    }

    #[test]
    fn unregistering_a_container_mid_session_unwatches_it() {
        let h = Harness::new();
        let listener = h.container("list", "DEFAULT");
        h.item("a", "list");
        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        assert!(listener.borrow().is_some());

        assert_eq!(
            h.marshal.unregister_container(&ContainerId::new("list")),
            Ok(Unregistered::DuringCollection)
        );
        assert!(listener.borrow().is_none());
    }

    #[test]
    fn publisher_may_stop_from_inside_a_callback() {
        struct Stopper {
            marshal: RefCell<Option<DimensionMarshal>>,
            published: Cell<usize>,
        }

        impl Publisher for Stopper {
            fn publish_items(&self, _: Vec<ItemDimension>) {
                self.published.set(self.published.get() + 1);
                if let Some(marshal) = self.marshal.borrow().as_ref() {
                    marshal.stop_collecting();
                }
            }
            fn publish_containers(&self, _: Vec<ContainerDimension>) {}
            fn update_container_scroll(&self, _: &ContainerId, _: Vec2) {}
            fn cancel(&self) {}
        }

        let publisher = Rc::new(Stopper {
            marshal: RefCell::new(None),
            published: Cell::new(0),
        });
        let scheduler = Rc::new(ManualScheduler::new());
        let marshal = DimensionMarshal::new(
            Rc::clone(&publisher) as Rc<dyn Publisher>,
            Rc::clone(&scheduler) as Rc<dyn Scheduler>,
        );
        let (fake, _) = FakeContainer::new(ContainerDescriptor::new("list", "DEFAULT"));
        marshal
            .register_container(ContainerDescriptor::new("list", "DEFAULT"), fake)
            .unwrap();
        marshal
            .register_item(drag("a", "list"), || {
                ItemDimension::new(drag("a", "list"), Rect::ZERO)
            })
            .unwrap();
        *publisher.marshal.borrow_mut() = Some(marshal.clone());

        marshal.start_initial_collection(&drag("a", "list")).unwrap();
        assert!(!marshal.is_collecting());
        assert_eq!(scheduler.pending_ticks(), 0);
        assert_eq!(publisher.published.get(), 1);

        // Break the cycle between the publisher and the marshal.
        publisher.marshal.borrow_mut().take();
    }

    /// Stops the marshal from inside its `n`th container batch.
    struct StopOnContainerBatch {
        marshal: RefCell<Option<DimensionMarshal>>,
        stop_at: usize,
        batches: Cell<usize>,
    }

    impl Publisher for StopOnContainerBatch {
        fn publish_items(&self, _: Vec<ItemDimension>) {}
        fn publish_containers(&self, _: Vec<ContainerDimension>) {
            let n = self.batches.get() + 1;
            self.batches.set(n);
            if n == self.stop_at
                && let Some(marshal) = self.marshal.borrow().as_ref()
            {
                marshal.stop_collecting();
            }
        }
        fn update_container_scroll(&self, _: &ContainerId, _: Vec2) {}
        fn cancel(&self) {}
    }

    fn stopping_marshal(
        stop_at: usize,
    ) -> (Rc<StopOnContainerBatch>, Rc<ManualScheduler>, DimensionMarshal) {
        let publisher = Rc::new(StopOnContainerBatch {
            marshal: RefCell::new(None),
            stop_at,
            batches: Cell::new(0),
        });
        let scheduler = Rc::new(ManualScheduler::new());
        let marshal = DimensionMarshal::new(
            Rc::clone(&publisher) as Rc<dyn Publisher>,
            Rc::clone(&scheduler) as Rc<dyn Scheduler>,
        );
        *publisher.marshal.borrow_mut() = Some(marshal.clone());
        (publisher, scheduler, marshal)
    }

    fn add_container(
        marshal: &DimensionMarshal,
        id: &str,
    ) -> Rc<RefCell<Option<ScrollListener>>> {
        let descriptor = ContainerDescriptor::new(id, "DEFAULT");
        let (fake, listener) = FakeContainer::new(descriptor.clone());
        marshal.register_container(descriptor, fake).unwrap();
        listener
    }

    #[test]
    fn stop_during_batch_publish_leaves_nothing_watched() {
        let (publisher, scheduler, marshal) = stopping_marshal(2);
        let home = add_container(&marshal, "list");
        let other = add_container(&marshal, "other");
        marshal
            .register_item(drag("a", "list"), || {
                ItemDimension::new(drag("a", "list"), Rect::ZERO)
            })
            .unwrap();

        marshal.start_initial_collection(&drag("a", "list")).unwrap();
        assert!(home.borrow().is_some());
        scheduler.run_ticks();
        scheduler.run_frame();
        scheduler.run_frame();

        assert_eq!(publisher.batches.get(), 2);
        assert!(!marshal.is_collecting());
        assert_eq!(marshal.stage(), SessionStage::Idle);
        assert!(home.borrow().is_none());
        assert!(other.borrow().is_none());

        publisher.marshal.borrow_mut().take();
    }

    #[test]
    fn stop_during_late_publish_leaves_container_unwatched() {
        let (publisher, _scheduler, marshal) = stopping_marshal(2);
        add_container(&marshal, "list");
        marshal
            .register_item(drag("a", "list"), || {
                ItemDimension::new(drag("a", "list"), Rect::ZERO)
            })
            .unwrap();
        marshal.start_initial_collection(&drag("a", "list")).unwrap();

        let late = add_container(&marshal, "late");
        assert!(!marshal.is_collecting());
        assert!(late.borrow().is_none());

        publisher.marshal.borrow_mut().take();
    }

    #[test]
    fn trace_sink_sees_the_session() {
        #[derive(Default)]
        struct Counts {
            starts: usize,
            phases: Vec<(CollectPhase, usize)>,
            publishes: Vec<PublishKind>,
            stops: usize,
        }

        impl crate::trace::TraceSink for Counts {
            fn on_session_start(&mut self, _: &SessionStartEvent) {
                self.starts += 1;
            }
            fn on_phase_end(&mut self, e: &PhaseEndEvent) {
                self.phases.push((e.phase, e.dimensions));
            }
            fn on_publish(&mut self, e: &PublishEvent) {
                self.publishes.push(e.kind);
            }
            fn on_session_stop(&mut self, _: &SessionStopEvent) {
                self.stops += 1;
            }
        }

        let h = Harness::new();
        let sink = Rc::new(RefCell::new(Counts::default()));
        h.marshal.set_trace_sink(Rc::clone(&sink) as SharedSink);
        h.container("list", "DEFAULT");
        h.item("a", "list");
        h.item("b", "list");

        h.marshal.start_initial_collection(&drag("a", "list")).unwrap();
        h.run_session();
        h.marshal.stop_collecting();

        let sink = sink.borrow();
        assert_eq!(sink.starts, 1);
        assert_eq!(
            sink.phases,
            [(CollectPhase::Measure, 1), (CollectPhase::Publish, 1)]
        );
        assert_eq!(sink.publishes, [PublishKind::Initial, PublishKind::Batch]);
        assert_eq!(sink.stops, 1);
    }
}
