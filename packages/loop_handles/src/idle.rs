//! Idle handles: one event per idle turn of the loop.

use std::rc::Rc;

use event_mux::{Emits, Emitter, EventSource};

use crate::engine::{EngineCallback, RawHandle};
use crate::error::ErrorEvent;
use crate::event_loop::EventLoop;
use crate::handle::{CloseEvent, HandleCore, HandleState, LoopHandle, RawDispatch, engine_ok};

/// One idle turn of the owning loop.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IdleEvent;

/// A handle that publishes an [`IdleEvent`] on every idle turn of its loop
/// while started.
///
/// Created via [`EventLoop::idle`].
#[derive(Debug)]
pub struct IdleHandle {
    core: HandleCore,
    events: Emitter<IdleHandle>,
}

impl IdleHandle {
    pub(crate) fn new(core: HandleCore) -> Self {
        Self {
            core,
            events: Emitter::new(),
        }
    }

    /// Registers the handle with the engine.
    pub fn init(&self) -> Result<(), ErrorEvent> {
        self.core.init_with(|engine, raw| engine.idle_init(raw))
    }

    /// Requests idle-turn delivery.
    pub fn start(&self) {
        let status = self.core.engine(|engine, raw| engine.idle_start(raw));

        if engine_ok(self, status) {
            self.core.set_state(HandleState::Active);
        }
    }

    /// Ceases idle-turn delivery.
    pub fn stop(&self) {
        let status = self.core.engine(|engine, raw| engine.idle_stop(raw));

        if engine_ok(self, status) {
            self.core.set_state(HandleState::Initialized);
        }
    }
}

impl EventSource for IdleHandle {
    fn emitter(&self) -> &Emitter<Self> {
        &self.events
    }
}

impl Emits<IdleEvent> for IdleHandle {}
impl Emits<ErrorEvent> for IdleHandle {}
impl Emits<CloseEvent> for IdleHandle {}

impl LoopHandle for IdleHandle {
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

impl RawDispatch for IdleHandle {
    fn raw_callback(&self, callback: EngineCallback) {
        match callback {
            EngineCallback::Idle => self.publish(IdleEvent),
            EngineCallback::Error { status } => self.publish(ErrorEvent::new(status)),
            EngineCallback::CloseComplete => {
                self.core.finish_close();
                self.publish(CloseEvent);
            }
            _ => {}
        }
    }
}
