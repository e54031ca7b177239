//! Signal handles: typed delivery of OS signal occurrences.

use std::cell::Cell;
use std::rc::Rc;

use event_mux::{Emits, Emitter, EventSource};

use crate::engine::{EngineCallback, RawHandle};
use crate::error::ErrorEvent;
use crate::event_loop::EventLoop;
use crate::handle::{CloseEvent, HandleCore, HandleState, LoopHandle, RawDispatch, engine_ok};

/// One delivery of a watched signal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignalEvent {
    /// The signal number that was delivered.
    pub signum: i32,
}

/// A handle that publishes [`SignalEvent`]s for one watched signal number.
///
/// Created via [`EventLoop::signal`]. Failures of `start`/`stop` surface as
/// [`ErrorEvent`]s on this handle's own emitter; `init` failures are returned
/// directly because no engine registration exists yet to report through.
#[derive(Debug)]
pub struct SignalHandle {
    core: HandleCore,
    events: Emitter<SignalHandle>,

    /// Signal number of the most recent start request.
    signum: Cell<i32>,

    /// Whether the current start was one-shot; the engine stops such a
    /// handle after the first delivery, and the state tracks that.
    oneshot: Cell<bool>,
}

impl SignalHandle {
    pub(crate) fn new(core: HandleCore) -> Self {
        Self {
            core,
            events: Emitter::new(),
            signum: Cell::new(0),
            oneshot: Cell::new(false),
        }
    }

    /// Registers the handle with the engine.
    ///
    /// On failure the handle stays [`HandleState::Initialized`]; retrying or
    /// dropping are the only useful follow-ups, and no event is published.
    pub fn init(&self) -> Result<(), ErrorEvent> {
        self.core.init_with(|engine, raw| engine.signal_init(raw))
    }

    /// Requests delivery of `signum` occurrences.
    pub fn start(&self, signum: i32) {
        let status = self
            .core
            .engine(|engine, raw| engine.signal_start(raw, signum));

        if engine_ok(self, status) {
            self.signum.set(signum);
            self.oneshot.set(false);
            self.core.set_state(HandleState::Active);
        }
    }

    /// Requests a single delivery of `signum`; the engine stops the handle
    /// after it.
    pub fn start_oneshot(&self, signum: i32) {
        let status = self
            .core
            .engine(|engine, raw| engine.signal_start_oneshot(raw, signum));

        if engine_ok(self, status) {
            self.signum.set(signum);
            self.oneshot.set(true);
            self.core.set_state(HandleState::Active);
        }
    }

    /// Ceases signal delivery.
    pub fn stop(&self) {
        let status = self.core.engine(|engine, raw| engine.signal_stop(raw));

        if engine_ok(self, status) {
            self.core.set_state(HandleState::Initialized);
        }
    }

    /// The signal number of the most recent start request.
    #[must_use]
    pub fn signum(&self) -> i32 {
        self.signum.get()
    }
}

impl EventSource for SignalHandle {
    fn emitter(&self) -> &Emitter<Self> {
        &self.events
    }
}

impl Emits<SignalEvent> for SignalHandle {}
impl Emits<ErrorEvent> for SignalHandle {}
impl Emits<CloseEvent> for SignalHandle {}

impl LoopHandle for SignalHandle {
    fn parent(&self) -> &Rc<EventLoop> {
        self.core.owner()
    }

    fn raw(&self) -> RawHandle {
        self.core.raw()
    }

    fn state(&self) -> HandleState {
        self.core.state()
    }

    fn close(&self) {
        self.core.request_close();
    }
}

impl RawDispatch for SignalHandle {
    fn raw_callback(&self, callback: EngineCallback) {
        match callback {
            EngineCallback::Signal { signum } => {
                if self.oneshot.get() {
                    // The engine already stopped a one-shot handle.
                    self.core.set_state(HandleState::Initialized);
                }
                self.publish(SignalEvent { signum });
            }
            EngineCallback::Error { status } => self.publish(ErrorEvent::new(status)),
            EngineCallback::CloseComplete => {
                self.core.finish_close();
                self.publish(CloseEvent);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::engine::MockEngine;
    use crate::error::code;

    assert_not_impl_any!(SignalHandle: Send, Sync);

    fn new_loop(engine: MockEngine) -> Rc<EventLoop> {
        EventLoop::new(Box::new(engine))
    }

    #[test]
    fn full_lifecycle_delivers_then_closes_exactly_once() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().times(1).returning(|_| 0);
        engine.expect_signal_start().times(1).returning(|_, _| 0);
        engine.expect_close().times(1).return_const(());

        let lp = new_loop(engine);
        let signal = lp.signal();

        signal.init().unwrap();
        signal.start(2);
        assert!(signal.active());
        assert_eq!(signal.signum(), 2);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        signal.on::<SignalEvent>(move |event, _| seen_clone.borrow_mut().push(event.signum));

        let raw = signal.raw();
        lp.deliver(raw, EngineCallback::Signal { signum: 2 });
        assert_eq!(*seen.borrow(), vec![2]);

        let closed = Rc::new(Cell::new(0_u32));
        let closed_clone = Rc::clone(&closed);
        signal.on::<CloseEvent>(move |_, owner| {
            assert_eq!(owner.state(), HandleState::Closed);
            closed_clone.set(closed_clone.get() + 1);
        });

        signal.close();
        assert!(signal.closing());
        assert_eq!(closed.get(), 0);

        // Idempotent while the engine has not confirmed yet.
        signal.close();

        lp.deliver(raw, EngineCallback::CloseComplete);
        assert_eq!(closed.get(), 1);

        // No primary event can reach the handle after close completed.
        lp.deliver(raw, EngineCallback::Signal { signum: 2 });
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn listeners_fire_in_registration_order() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().returning(|_| 0);
        engine.expect_signal_start().returning(|_, _| 0);

        let lp = new_loop(engine);
        let signal = lp.signal();
        signal.init().unwrap();
        signal.start(15);

        let order = Rc::new(RefCell::new(Vec::new()));
        for label in 1..=3_u32 {
            let order_clone = Rc::clone(&order);
            signal.on::<SignalEvent>(move |_, _| order_clone.borrow_mut().push(label));
        }

        lp.deliver(signal.raw(), EngineCallback::Signal { signum: 15 });

        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn failed_init_publishes_nothing_and_stays_initialized() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().returning(|_| code::EINVAL);

        let lp = new_loop(engine);
        let signal = lp.signal();

        let errored = Rc::new(Cell::new(false));
        let errored_clone = Rc::clone(&errored);
        signal.on::<ErrorEvent>(move |_, _| errored_clone.set(true));

        let err = signal.init().unwrap_err();

        assert_eq!(err.code(), code::EINVAL);
        assert!(!errored.get());
        assert_eq!(signal.state(), HandleState::Initialized);
    }

    #[test]
    fn failed_start_surfaces_as_error_event() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().returning(|_| 0);
        engine.expect_signal_start().returning(|_, _| code::EBUSY);

        let lp = new_loop(engine);
        let signal = lp.signal();
        signal.init().unwrap();

        let reported = Rc::new(Cell::new(0));
        let reported_clone = Rc::clone(&reported);
        signal.on::<ErrorEvent>(move |event, _| reported_clone.set(event.code()));

        signal.start(2);

        assert_eq!(reported.get(), code::EBUSY);
        assert!(!signal.active());
    }

    #[test]
    fn oneshot_start_deactivates_after_first_delivery() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().returning(|_| 0);
        engine.expect_signal_start_oneshot().returning(|_, _| 0);

        let lp = new_loop(engine);
        let signal = lp.signal();
        signal.init().unwrap();
        signal.start_oneshot(1);
        assert!(signal.active());

        let fired = Rc::new(Cell::new(0_u32));
        let fired_clone = Rc::clone(&fired);
        signal.on::<SignalEvent>(move |_, owner| {
            assert!(!owner.active());
            fired_clone.set(fired_clone.get() + 1);
        });

        lp.deliver(signal.raw(), EngineCallback::Signal { signum: 1 });

        assert_eq!(fired.get(), 1);
        assert!(!signal.active());
    }

    #[test]
    fn stop_returns_handle_to_initialized() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().returning(|_| 0);
        engine.expect_signal_start().returning(|_, _| 0);
        engine.expect_signal_stop().returning(|_| 0);

        let lp = new_loop(engine);
        let signal = lp.signal();
        signal.init().unwrap();

        signal.start(2);
        assert!(signal.active());

        signal.stop();
        assert!(!signal.active());
        assert_eq!(signal.state(), HandleState::Initialized);
    }

    #[test]
    fn wrong_kind_callback_is_ignored() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().returning(|_| 0);

        let lp = new_loop(engine);
        let signal = lp.signal();
        signal.init().unwrap();

        let fired = Rc::new(Cell::new(false));
        let fired_clone = Rc::clone(&fired);
        signal.on::<SignalEvent>(move |_, _| fired_clone.set(true));

        lp.deliver(signal.raw(), EngineCallback::Idle);
        lp.deliver(signal.raw(), EngineCallback::Timer);

        assert!(!fired.get());
    }

    #[test]
    fn engine_reported_async_error_reaches_error_listeners() {
        let mut engine = MockEngine::new();
        engine.expect_signal_init().returning(|_| 0);
        engine.expect_signal_start().returning(|_, _| 0);

        let lp = new_loop(engine);
        let signal = lp.signal();
        signal.init().unwrap();
        signal.start(2);

        let reported = Rc::new(Cell::new(0));
        let reported_clone = Rc::clone(&reported);
        signal.on::<ErrorEvent>(move |event, _| reported_clone.set(event.code()));

        lp.deliver(
            signal.raw(),
            EngineCallback::Error {
                status: code::ECANCELED,
            },
        );

        assert_eq!(reported.get(), code::ECANCELED);
    }
}
