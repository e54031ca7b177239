//! Loop-bound resource wrappers over a native event-loop engine.
//!
//! The engine behind this crate is a callback-driven scheduler: handles are
//! registered with it, it waits on OS-level readiness, and it invokes raw
//! callbacks addressed by handle identity. This crate wraps that model in
//! owned Rust types with typed events:
//!
//! * [`EventLoop`] owns the engine and is the only way to create handles.
//! * Every handle kind ([`SignalHandle`], [`IdleHandle`], [`WakeHandle`],
//!   [`TimerHandle`]) embeds the same lifecycle core and publishes its
//!   events through an [`Emitter`] from the `event_mux` crate.
//! * Teardown is asynchronous: [`LoopHandle::close`] requests it, the engine
//!   confirms it later, and only then is the final [`CloseEvent`] published
//!   and the wrapper released.
//!
//! The loop keeps every engine-registered handle alive until its close
//! completes, even if the caller drops its own reference first. Deliveries
//! addressed to handles that no longer exist are dropped silently.
//!
//! All types are single-threaded; the embedder calls
//! [`EventLoop::deliver`] from the one thread that drives the engine.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! use loop_handles::{
//!     Engine, EngineCallback, EngineStatus, EventLoop, EventSource, LoopHandle, RawHandle,
//!     SignalEvent,
//! };
//!
//! /// An engine that accepts every request and never schedules anything.
//! struct NullEngine;
//!
//! impl Engine for NullEngine {
//!     fn signal_init(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn signal_start(&mut self, _raw: RawHandle, _signum: i32) -> EngineStatus {
//!         0
//!     }
//!     fn signal_start_oneshot(&mut self, _raw: RawHandle, _signum: i32) -> EngineStatus {
//!         0
//!     }
//!     fn signal_stop(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn idle_init(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn idle_start(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn idle_stop(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn wake_init(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn wake_send(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn timer_init(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn timer_start(
//!         &mut self,
//!         _raw: RawHandle,
//!         _timeout: Duration,
//!         _repeat: Duration,
//!     ) -> EngineStatus {
//!         0
//!     }
//!     fn timer_stop(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn timer_again(&mut self, _raw: RawHandle) -> EngineStatus {
//!         0
//!     }
//!     fn close(&mut self, _raw: RawHandle) {}
//! }
//!
//! let lp = EventLoop::new(Box::new(NullEngine));
//!
//! let signal = lp.signal();
//! signal.init()?;
//! signal.start(2);
//!
//! let seen = Rc::new(Cell::new(0));
//! let seen_clone = Rc::clone(&seen);
//! signal.on::<SignalEvent>(move |event, _| seen_clone.set(event.signum));
//!
//! // In production the engine hands this to the loop; here we stand in
//! // for it.
//! lp.deliver(signal.raw(), EngineCallback::Signal { signum: 2 });
//! assert_eq!(seen.get(), 2);
//!
//! signal.close();
//! lp.deliver(signal.raw(), EngineCallback::CloseComplete);
//! # Ok::<(), loop_handles::ErrorEvent>(())
//! ```

mod engine;
mod error;
mod event_loop;
mod handle;
mod idle;
mod registry;
mod signal;
mod timer;
mod wake;

pub use engine::{Engine, EngineCallback, EngineStatus, RawHandle};
pub use error::{ErrorEvent, code};
pub use event_loop::EventLoop;
pub use handle::{CloseEvent, HandleState, LoopHandle};
pub use idle::{IdleEvent, IdleHandle};
pub use signal::{SignalEvent, SignalHandle};
pub use timer::{TimerEvent, TimerHandle};
pub use wake::{WakeEvent, WakeHandle};

pub use event_mux::{Emits, Emitter, EventSource, ListenerId};
