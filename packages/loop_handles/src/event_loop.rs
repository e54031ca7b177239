//! The loop object every resource is bound to.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::engine::{Engine, EngineCallback, RawHandle};
use crate::handle::{HandleCore, LoopHandle, RawDispatch};
use crate::idle::IdleHandle;
use crate::registry::Registry;
use crate::signal::SignalHandle;
use crate::timer::TimerHandle;
use crate::wake::WakeHandle;

/// One event-loop instance: the exclusive creator of handles and the inbound
/// boundary for the engine's raw callbacks.
///
/// Handles can only be obtained from the loop's factory methods and hold a
/// strong reference back to it, so the loop outlives every resource it
/// created even if the caller drops its own reference first.
///
/// The loop is single-threaded: all callbacks for its handles are delivered
/// serially on one dispatch thread, and the type is neither [`Send`] nor
/// [`Sync`]. If the surrounding engine is driven from multiple threads,
/// synchronizing entry into the loop is the embedder's job.
pub struct EventLoop {
    engine: RefCell<Box<dyn Engine>>,
    registry: Registry,

    _single_threaded: PhantomData<*const ()>,
}

impl EventLoop {
    /// Creates a loop driving the given engine.
    #[must_use]
    pub fn new(engine: Box<dyn Engine>) -> Rc<Self> {
        Rc::new(Self {
            engine: RefCell::new(engine),
            registry: Registry::new(),
            _single_threaded: PhantomData,
        })
    }

    /// Creates a signal handle bound to this loop.
    #[must_use]
    pub fn signal(self: &Rc<Self>) -> Rc<SignalHandle> {
        self.make(SignalHandle::new)
    }

    /// Creates an idle handle bound to this loop.
    #[must_use]
    pub fn idle(self: &Rc<Self>) -> Rc<IdleHandle> {
        self.make(IdleHandle::new)
    }

    /// Creates a wake handle bound to this loop.
    #[must_use]
    pub fn wake(self: &Rc<Self>) -> Rc<WakeHandle> {
        self.make(WakeHandle::new)
    }

    /// Creates a timer handle bound to this loop.
    #[must_use]
    pub fn timer(self: &Rc<Self>) -> Rc<TimerHandle> {
        self.make(TimerHandle::new)
    }

    /// Hands one raw engine callback to the handle it is addressed to.
    ///
    /// This is the engine → core boundary: the embedder calls it from the
    /// loop's dispatch thread whenever the engine invokes a native callback.
    /// Deliveries addressed to unknown, stale, or already-released handles
    /// are dropped silently; everything else reaches the owning adapter's
    /// trampoline, which publishes the corresponding typed event.
    pub fn deliver(&self, raw: RawHandle, callback: EngineCallback) {
        let Some(handle) = self.registry.resolve(raw) else {
            return;
        };

        // The local strong reference keeps the wrapper alive through the
        // trampoline even if it vacates its own registry slot (close).
        handle.raw_callback(callback);
    }

    /// Visits every live handle of this loop, heterogeneously.
    pub fn walk(&self, mut f: impl FnMut(&dyn LoopHandle)) {
        for handle in self.registry.live() {
            let handle: &dyn LoopHandle = &*handle;
            f(handle);
        }
    }

    /// Requests teardown of every live handle. Each publishes its
    /// [`CloseEvent`][crate::CloseEvent] once the engine confirms.
    pub fn close_all(&self) {
        self.walk(|handle| handle.close());
    }

    /// Runs one outbound engine call. Borrows the engine for the duration of
    /// the call only, so engine calls may occur inside delivered callbacks.
    pub(crate) fn with_engine<R>(&self, f: impl FnOnce(&mut dyn Engine) -> R) -> R {
        let mut engine = self.engine.borrow_mut();
        f(engine.as_mut())
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    fn make<H: RawDispatch + 'static>(
        self: &Rc<Self>,
        build: impl FnOnce(HandleCore) -> H,
    ) -> Rc<H> {
        let raw = self.registry.reserve();
        let handle = Rc::new(build(HandleCore::new(Rc::clone(self), raw)));

        let dispatch: Rc<dyn RawDispatch> = Rc::<H>::clone(&handle);
        let tracked: Weak<dyn RawDispatch> = Rc::downgrade(&dispatch);
        self.registry.attach(raw, tracked);

        handle
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use event_mux::EventSource;
    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::engine::MockEngine;
    use crate::handle::HandleState;
    use crate::idle::IdleEvent;

    assert_not_impl_any!(EventLoop: Send, Sync);

    fn new_loop(engine: MockEngine) -> Rc<EventLoop> {
        EventLoop::new(Box::new(engine))
    }

    #[test]
    fn delivery_to_unknown_raw_is_ignored() {
        let mut engine = MockEngine::new();
        engine.expect_idle_init().returning(|_| 0);

        let lp = new_loop(engine);
        let idle = lp.idle();
        idle.init().unwrap();

        let bogus = RawHandle::new(99, 0);
        lp.deliver(bogus, EngineCallback::Idle);
    }

    #[test]
    fn loop_keeps_initialized_handle_alive_after_caller_drops_it() {
        let mut engine = MockEngine::new();
        engine.expect_idle_init().returning(|_| 0);
        engine.expect_idle_start().returning(|_| 0);

        let lp = new_loop(engine);
        let idle = lp.idle();
        idle.init().unwrap();
        idle.start();

        let raw = idle.raw();
        let fired = Rc::new(Cell::new(0_u32));
        let fired_clone = Rc::clone(&fired);
        idle.on::<IdleEvent>(move |_, _| fired_clone.set(fired_clone.get() + 1));

        drop(idle);

        lp.deliver(raw, EngineCallback::Idle);

        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn dropping_uninitialized_handle_frees_its_slot() {
        let engine = MockEngine::new();
        let lp = new_loop(engine);

        let idle = lp.idle();
        let raw = idle.raw();
        drop(idle);

        // The slot is vacated; a delivery addressed to it is stale.
        lp.deliver(raw, EngineCallback::Idle);

        let mut visited = 0_u32;
        lp.walk(|_| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn recycled_slot_rejects_stale_generation() {
        let mut engine = MockEngine::new();
        engine.expect_idle_init().returning(|_| 0);

        let lp = new_loop(engine);

        let first = lp.idle();
        let stale = first.raw();
        drop(first);

        // Recycles the same slot index under a new generation.
        let second = lp.idle();
        second.init().unwrap();
        assert_eq!(second.raw().index(), stale.index());

        let fired = Rc::new(Cell::new(0_u32));
        let fired_clone = Rc::clone(&fired);
        second.on::<IdleEvent>(move |_, _| fired_clone.set(fired_clone.get() + 1));

        lp.deliver(stale, EngineCallback::Idle);
        assert_eq!(fired.get(), 0);

        lp.deliver(second.raw(), EngineCallback::Idle);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn walk_visits_every_live_handle() {
        let mut engine = MockEngine::new();
        engine.expect_idle_init().returning(|_| 0);
        engine.expect_signal_init().returning(|_| 0);

        let lp = new_loop(engine);
        let idle = lp.idle();
        idle.init().unwrap();
        let signal = lp.signal();
        signal.init().unwrap();

        let mut visited = 0_u32;
        lp.walk(|handle| {
            assert_eq!(handle.state(), HandleState::Initialized);
            visited += 1;
        });

        assert_eq!(visited, 2);
    }

    #[test]
    fn close_all_requests_teardown_of_every_live_handle() {
        let mut engine = MockEngine::new();
        engine.expect_idle_init().returning(|_| 0);
        engine.expect_signal_init().returning(|_| 0);
        engine.expect_close().times(2).return_const(());

        let lp = new_loop(engine);
        let idle = lp.idle();
        idle.init().unwrap();
        let signal = lp.signal();
        signal.init().unwrap();

        lp.close_all();

        assert!(idle.closing());
        assert!(signal.closing());

        // Idempotent: the engine sees no second close request per handle.
        lp.close_all();
    }

    #[test]
    fn handle_keeps_loop_alive() {
        let mut engine = MockEngine::new();
        engine.expect_idle_init().returning(|_| 0);

        let lp = new_loop(engine);
        let idle = lp.idle();
        idle.init().unwrap();

        drop(lp);

        // The handle's back-reference still works.
        assert_eq!(idle.parent().registry().live().len(), 1);
    }
}
