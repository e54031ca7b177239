//! The shared lifecycle machinery every handle kind builds on.
//!
//! A handle is a loop-owned resource with an explicit lifecycle:
//!
//! ```text
//! Initialized ⇄ Active
//!      │          │
//!      └────┬─────┘
//!         Closing ── (engine confirms) ──► Closed
//! ```
//!
//! Teardown is asynchronous and engine-driven: [`close`][LoopHandle::close]
//! only requests it, and the wrapper stays alive until the engine confirms
//! with a close-complete callback, at which point exactly one [`CloseEvent`]
//! is published. The engine, not the wrapper, ends native lifetime.

use std::cell::Cell;
use std::rc::Rc;

use event_mux::{Emits, EventSource};

use crate::engine::{Engine, EngineCallback, EngineStatus, RawHandle};
use crate::error::{ErrorEvent, code};
use crate::event_loop::EventLoop;

/// Published exactly once per handle, after the engine confirms teardown.
///
/// A listener for this event is the only reliable place to release external
/// resources tied to the handle's lifetime: it is the last event the handle
/// ever publishes.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CloseEvent;

/// Lifecycle state of a handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandleState {
    /// Constructed, and possibly registered with the engine, but not started.
    Initialized,

    /// The engine is delivering the handle's primary event.
    Active,

    /// Teardown was requested; the engine has not confirmed it yet.
    Closing,

    /// The engine confirmed teardown; the handle publishes nothing further.
    Closed,
}

/// The uniform surface of every handle kind, object-safe so generic loop
/// machinery can observe and tear down heterogeneous handles without knowing
/// their concrete types.
pub trait LoopHandle {
    /// The loop that created this handle. Valid for the handle's entire
    /// lifetime; the handle keeps the loop alive.
    fn parent(&self) -> &Rc<EventLoop>;

    /// The engine-side identity of this handle.
    ///
    /// Intended for the adapter layer and diagnostics; going through the raw
    /// identity bypasses the lifetime coordination this crate exists for.
    fn raw(&self) -> RawHandle;

    /// Current lifecycle state.
    fn state(&self) -> HandleState;

    /// Requests asynchronous teardown. Idempotent: a handle that is already
    /// closing or closed ignores further requests.
    ///
    /// A [`CloseEvent`] is published once the engine confirms; no primary
    /// event follows it.
    fn close(&self);

    /// Whether the engine is currently delivering the primary event.
    fn active(&self) -> bool {
        matches!(self.state(), HandleState::Active)
    }

    /// Whether teardown has been requested or completed.
    fn closing(&self) -> bool {
        matches!(self.state(), HandleState::Closing | HandleState::Closed)
    }
}

/// Crate-internal face of a handle as the loop's registry sees it: the
/// trampoline that turns raw engine callbacks into typed publishes.
pub(crate) trait RawDispatch: LoopHandle {
    fn raw_callback(&self, callback: EngineCallback);
}

/// Loop binding plus lifecycle state, embedded in every concrete handle.
///
/// Constructible only inside this crate, which is what restricts handle
/// creation to the owning loop's factory methods.
#[derive(Debug)]
pub(crate) struct HandleCore {
    owner: Rc<EventLoop>,
    raw: RawHandle,
    state: Cell<HandleState>,
}

impl HandleCore {
    pub(crate) fn new(owner: Rc<EventLoop>, raw: RawHandle) -> Self {
        Self {
            owner,
            raw,
            state: Cell::new(HandleState::Initialized),
        }
    }

    pub(crate) fn owner(&self) -> &Rc<EventLoop> {
        &self.owner
    }

    pub(crate) fn raw(&self) -> RawHandle {
        self.raw
    }

    pub(crate) fn state(&self) -> HandleState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: HandleState) {
        self.state.set(state);
    }

    /// Runs one outbound engine call for this handle.
    pub(crate) fn engine<R>(&self, f: impl FnOnce(&mut dyn Engine, RawHandle) -> R) -> R {
        let raw = self.raw;
        self.owner.with_engine(move |engine| f(engine, raw))
    }

    /// Runs the adapter's engine init call and, on success, hands the loop a
    /// strong reference to the wrapper: once the engine knows the handle, the
    /// wrapper must outlive every callback the engine may still schedule.
    ///
    /// On failure the handle stays `Initialized` and unregistered; retrying
    /// or dropping are the only useful follow-ups.
    pub(crate) fn init_with(
        &self,
        init: impl FnOnce(&mut dyn Engine, RawHandle) -> EngineStatus,
    ) -> Result<(), ErrorEvent> {
        if self.closing_or_closed() {
            return Err(ErrorEvent::new(code::EINVAL));
        }

        let status = self.engine(init);
        if status != 0 {
            return Err(ErrorEvent::new(status));
        }

        self.owner.registry().hold(self.raw);
        Ok(())
    }

    /// Idempotent close request; see [`LoopHandle::close`].
    pub(crate) fn request_close(&self) {
        if self.closing_or_closed() {
            return;
        }

        self.state.set(HandleState::Closing);
        self.engine(|engine, raw| engine.close(raw));
    }

    /// Called from the trampoline when the engine confirms teardown. Vacates
    /// the registry slot, so no further delivery can reach this handle; the
    /// caller publishes the [`CloseEvent`] afterwards, while the delivery
    /// path still holds the wrapper alive.
    pub(crate) fn finish_close(&self) {
        self.state.set(HandleState::Closed);
        self.owner.registry().release(self.raw);
    }

    fn closing_or_closed(&self) -> bool {
        matches!(
            self.state.get(),
            HandleState::Closing | HandleState::Closed
        )
    }
}

impl Drop for HandleCore {
    fn drop(&mut self) {
        // Reachable only while the registry slot is not held strongly (an
        // uninitialized wrapper dropped by its creator, or a slot already
        // vacated by close): for a vacated slot the generation check makes
        // this a no-op.
        self.owner.registry().forget(self.raw);
    }
}

/// Forwards a nonzero engine status to the handle's own error channel.
///
/// Returns whether the call succeeded. This is the single error path for
/// every start/stop/send style operation: callers that only observe events
/// get full failure coverage.
pub(crate) fn engine_ok<H>(handle: &H, status: EngineStatus) -> bool
where
    H: EventSource + Emits<ErrorEvent>,
{
    if status == 0 {
        true
    } else {
        handle.publish(ErrorEvent::new(status));
        false
    }
}
