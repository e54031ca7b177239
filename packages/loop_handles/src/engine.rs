//! The boundary with the native event-loop engine.
//!
//! The engine is the external scheduler that waits on OS-level readiness and
//! invokes callbacks; this crate only drives it. Outbound, the core makes one
//! init call per handle kind plus kind-specific control calls, each returning
//! an [`EngineStatus`]. Inbound, the engine (or whatever embeds it) hands raw
//! callbacks to [`EventLoop::deliver`][crate::EventLoop::deliver], addressed
//! by the [`RawHandle`] the loop allocated for the handle.

use std::time::Duration;

/// Engine status code: zero is success, negative values are the engine's
/// error codes (see [`code`][crate::code] for the known catalogue).
pub type EngineStatus = i32;

/// Identity of one engine-side handle slot.
///
/// This is the stable address the engine stores its callback-recovery data
/// against: a slot index in the owning loop's registry plus a generation
/// counter so that deliveries addressed to a torn-down handle are recognized
/// as stale and dropped rather than reaching a recycled slot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RawHandle {
    index: u32,
    generation: u32,
}

impl RawHandle {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the owning loop's registry.
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

/// One raw callback as the engine delivers it: the kind-specific primitive
/// arguments of a single native callback invocation.
///
/// Which variants a handle understands is fixed by its kind; a variant
/// delivered to a handle of the wrong kind is ignored. `Error` and
/// `CloseComplete` are understood by every kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EngineCallback {
    /// A watched signal fired.
    Signal {
        /// The signal number that was delivered.
        signum: i32,
    },

    /// An idle turn of the loop.
    Idle,

    /// A wakeup previously requested via the async-send primitive.
    Wake,

    /// A timer due time elapsed.
    Timer,

    /// The engine reports an asynchronous failure for an active handle.
    Error {
        /// The engine's error code.
        status: EngineStatus,
    },

    /// The engine confirms that teardown of the handle finished and the
    /// slot may be released.
    CloseComplete,
}

/// Outbound calls into the native engine.
///
/// Exactly one init call exists per handle kind; the remaining calls are the
/// kind-specific controls. Every call takes the [`RawHandle`] the loop
/// allocated for the handle and returns an [`EngineStatus`], except
/// [`close`][Self::close]: teardown is asynchronous and always accepted, and
/// the engine confirms completion later with
/// [`EngineCallback::CloseComplete`].
///
/// Implementations are driven strictly from the loop's dispatch thread.
#[cfg_attr(test, mockall::automock)]
pub trait Engine {
    /// Registers a signal handle with the engine.
    fn signal_init(&mut self, raw: RawHandle) -> EngineStatus;

    /// Begins delivery of `signum` occurrences to the handle.
    fn signal_start(&mut self, raw: RawHandle, signum: i32) -> EngineStatus;

    /// Like [`signal_start`][Self::signal_start], but the engine stops the
    /// handle after the first delivery.
    fn signal_start_oneshot(&mut self, raw: RawHandle, signum: i32) -> EngineStatus;

    /// Ceases signal delivery to the handle.
    fn signal_stop(&mut self, raw: RawHandle) -> EngineStatus;

    /// Registers an idle handle with the engine.
    fn idle_init(&mut self, raw: RawHandle) -> EngineStatus;

    /// Begins idle-turn delivery to the handle.
    fn idle_start(&mut self, raw: RawHandle) -> EngineStatus;

    /// Ceases idle-turn delivery to the handle.
    fn idle_stop(&mut self, raw: RawHandle) -> EngineStatus;

    /// Registers a wake handle with the engine. Wake handles are live
    /// immediately; there is no separate start call.
    fn wake_init(&mut self, raw: RawHandle) -> EngineStatus;

    /// Requests a wakeup delivery for the handle.
    fn wake_send(&mut self, raw: RawHandle) -> EngineStatus;

    /// Registers a timer handle with the engine.
    fn timer_init(&mut self, raw: RawHandle) -> EngineStatus;

    /// Schedules the timer to fire after `timeout`, then every `repeat`
    /// thereafter (a zero `repeat` means one-shot).
    fn timer_start(&mut self, raw: RawHandle, timeout: Duration, repeat: Duration) -> EngineStatus;

    /// Cancels pending timer deliveries.
    fn timer_stop(&mut self, raw: RawHandle) -> EngineStatus;

    /// Restarts a repeating timer using its repeat interval.
    fn timer_again(&mut self, raw: RawHandle) -> EngineStatus;

    /// Requests asynchronous teardown of the handle. After the engine
    /// delivers `CloseComplete` it never schedules another callback for
    /// this handle.
    fn close(&mut self, raw: RawHandle);
}
