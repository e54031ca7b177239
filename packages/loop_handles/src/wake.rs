//! Wake handles: engine-mediated wakeups of the loop's dispatch thread.

use std::rc::Rc;

use event_mux::{Emits, Emitter, EventSource};

use crate::engine::{EngineCallback, RawHandle};
use crate::error::ErrorEvent;
use crate::event_loop::EventLoop;
use crate::handle::{CloseEvent, HandleCore, HandleState, LoopHandle, RawDispatch, engine_ok};

/// One wakeup previously requested via [`WakeHandle::send`].
///
/// The engine may coalesce several sends into a single delivery.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WakeEvent;

/// A handle that publishes a [`WakeEvent`] when the engine delivers a
/// requested wakeup.
///
/// Created via [`EventLoop::wake`]. There is no start call: the handle is
/// live as soon as [`init`][Self::init] succeeds. The thread-safe entry point
/// for requesting a wakeup from outside the dispatch thread belongs to the
/// engine; [`send`][Self::send] is the loop-side rendition.
#[derive(Debug)]
pub struct WakeHandle {
    core: HandleCore,
    events: Emitter<WakeHandle>,
}

impl WakeHandle {
    pub(crate) fn new(core: HandleCore) -> Self {
        Self {
            core,
            events: Emitter::new(),
        }
    }

    /// Registers the handle with the engine. A wake handle is active
    /// immediately on success.
    pub fn init(&self) -> Result<(), ErrorEvent> {
        self.core.init_with(|engine, raw| engine.wake_init(raw))?;
        self.core.set_state(HandleState::Active);
        Ok(())
    }

    /// Requests a wakeup delivery.
    pub fn send(&self) {
        let status = self.core.engine(|engine, raw| engine.wake_send(raw));
        engine_ok(self, status);
    }
}

impl EventSource for WakeHandle {
    fn emitter(&self) -> &Emitter<Self> {
        &self.events
    }
}

impl Emits<WakeEvent> for WakeHandle {}
impl Emits<ErrorEvent> for WakeHandle {}
impl Emits<CloseEvent> for WakeHandle {}

impl LoopHandle for WakeHandle {
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

impl RawDispatch for WakeHandle {
    fn raw_callback(&self, callback: EngineCallback) {
        match callback {
            EngineCallback::Wake => self.publish(WakeEvent),
            EngineCallback::Error { status } => self.publish(ErrorEvent::new(status)),
            EngineCallback::CloseComplete => {
                self.core.finish_close();
                self.publish(CloseEvent);
            }
            _ => {}
        }
    }
}
