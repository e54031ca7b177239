//! Timer handles: one-shot and repeating due-time delivery.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use event_mux::{Emits, Emitter, EventSource};

use crate::engine::{EngineCallback, RawHandle};
use crate::error::ErrorEvent;
use crate::event_loop::EventLoop;
use crate::handle::{CloseEvent, HandleCore, HandleState, LoopHandle, RawDispatch, engine_ok};

/// One elapsed due time of a timer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TimerEvent;

/// A handle that publishes a [`TimerEvent`] when its due time elapses.
///
/// Created via [`EventLoop::timer`]. A zero repeat interval makes the timer
/// one-shot: the engine stops it after the first delivery.
#[derive(Debug)]
pub struct TimerHandle {
    core: HandleCore,
    events: Emitter<TimerHandle>,

    /// Repeat interval of the most recent start request; zero means
    /// one-shot.
    repeat: Cell<Duration>,
}

impl TimerHandle {
    pub(crate) fn new(core: HandleCore) -> Self {
        Self {
            core,
            events: Emitter::new(),
            repeat: Cell::new(Duration::ZERO),
        }
    }

    /// Registers the handle with the engine.
    pub fn init(&self) -> Result<(), ErrorEvent> {
        self.core.init_with(|engine, raw| engine.timer_init(raw))
    }

    /// Schedules the timer to fire after `timeout`, then every `repeat`
    /// thereafter; a zero `repeat` means one-shot.
    pub fn start(&self, timeout: Duration, repeat: Duration) {
        let status = self
            .core
            .engine(|engine, raw| engine.timer_start(raw, timeout, repeat));

        if engine_ok(self, status) {
            self.repeat.set(repeat);
            self.core.set_state(HandleState::Active);
        }
    }

    /// Cancels pending deliveries.
    pub fn stop(&self) {
        let status = self.core.engine(|engine, raw| engine.timer_stop(raw));

        if engine_ok(self, status) {
            self.core.set_state(HandleState::Initialized);
        }
    }

    /// Restarts the timer using its repeat interval. The engine rejects this
    /// for a timer that was never started with a repeat interval.
    pub fn again(&self) {
        let status = self.core.engine(|engine, raw| engine.timer_again(raw));

        if engine_ok(self, status) {
            self.core.set_state(HandleState::Active);
        }
    }

    /// The repeat interval of the most recent start request.
    #[must_use]
    pub fn repeat(&self) -> Duration {
        self.repeat.get()
    }
}

impl EventSource for TimerHandle {
    fn emitter(&self) -> &Emitter<Self> {
        &self.events
    }
}

impl Emits<TimerEvent> for TimerHandle {}
impl Emits<ErrorEvent> for TimerHandle {}
impl Emits<CloseEvent> for TimerHandle {}

impl LoopHandle for TimerHandle {
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

impl RawDispatch for TimerHandle {
    fn raw_callback(&self, callback: EngineCallback) {
        match callback {
            EngineCallback::Timer => {
                if self.repeat.get().is_zero() {
                    // The engine stops a one-shot timer after it fires.
                    self.core.set_state(HandleState::Initialized);
                }
                self.publish(TimerEvent);
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
    use super::*;
    use crate::engine::MockEngine;
    use crate::error::code;

    fn new_loop(engine: MockEngine) -> Rc<EventLoop> {
        EventLoop::new(Box::new(engine))
    }

    #[test]
    fn one_shot_timer_deactivates_after_firing() {
        let mut engine = MockEngine::new();
        engine.expect_timer_init().returning(|_| 0);
        engine.expect_timer_start().returning(|_, _, _| 0);

        let lp = new_loop(engine);
        let timer = lp.timer();
        timer.init().unwrap();

        timer.start(Duration::from_millis(10), Duration::ZERO);
        assert!(timer.active());
        assert_eq!(timer.repeat(), Duration::ZERO);

        lp.deliver(timer.raw(), EngineCallback::Timer);

        assert!(!timer.active());
    }

    #[test]
    fn repeating_timer_stays_active_across_deliveries() {
        let mut engine = MockEngine::new();
        engine.expect_timer_init().returning(|_| 0);
        engine.expect_timer_start().returning(|_, _, _| 0);

        let lp = new_loop(engine);
        let timer = lp.timer();
        timer.init().unwrap();

        let repeat = Duration::from_millis(50);
        timer.start(Duration::from_millis(10), repeat);
        assert_eq!(timer.repeat(), repeat);

        lp.deliver(timer.raw(), EngineCallback::Timer);
        lp.deliver(timer.raw(), EngineCallback::Timer);

        assert!(timer.active());
    }

    #[test]
    fn engine_receives_requested_durations() {
        let timeout = Duration::from_secs(1);
        let repeat = Duration::from_millis(250);

        let mut engine = MockEngine::new();
        engine.expect_timer_init().returning(|_| 0);
        engine
            .expect_timer_start()
            .withf(move |_, t, r| *t == timeout && *r == repeat)
            .times(1)
            .returning(|_, _, _| 0);

        let lp = new_loop(engine);
        let timer = lp.timer();
        timer.init().unwrap();

        timer.start(timeout, repeat);
        assert!(timer.active());
    }

    #[test]
    fn again_on_never_started_timer_surfaces_engine_error() {
        let mut engine = MockEngine::new();
        engine.expect_timer_init().returning(|_| 0);
        engine.expect_timer_again().returning(|_| code::EINVAL);

        let lp = new_loop(engine);
        let timer = lp.timer();
        timer.init().unwrap();

        let reported = Rc::new(Cell::new(0));
        let reported_clone = Rc::clone(&reported);
        timer.on::<ErrorEvent>(move |event, _| reported_clone.set(event.code()));

        timer.again();

        assert_eq!(reported.get(), code::EINVAL);
        assert!(!timer.active());
    }
}
