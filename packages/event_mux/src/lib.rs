//! Typed multi-kind event dispatch for single-threaded callback machinery.
//!
//! This crate provides the publish/subscribe core used by objects that emit
//! several independent kinds of events: each event kind is an ordinary Rust
//! type, each kind has its own ordered listener sequence, and dispatch passes
//! both the payload and a reference to the emitting object to every listener.
//!
//! The machinery is written once, generically, and is safe to mutate from
//! inside a dispatch in progress: listeners may subscribe, unsubscribe
//! (including themselves), clear everything, or publish again while a pass is
//! running. Removed registrations are tombstoned and compacted after the
//! outermost pass, so tokens stay valid and survivors keep their order.
//!
//! Everything here is single-threaded by design. The types are neither
//! [`Send`] nor [`Sync`]; the intended home is the dispatch thread of a
//! callback-driven event loop.
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//!
//! use event_mux::{Emits, Emitter, EventSource};
//!
//! struct Tick {
//!     count: u64,
//! }
//!
//! struct Clock {
//!     events: Emitter<Clock>,
//!     seen: Cell<u64>,
//! }
//!
//! impl EventSource for Clock {
//!     fn emitter(&self) -> &Emitter<Self> {
//!         &self.events
//!     }
//! }
//!
//! impl Emits<Tick> for Clock {}
//!
//! let clock = Clock {
//!     events: Emitter::new(),
//!     seen: Cell::new(0),
//! };
//!
//! clock.on::<Tick>(|tick, owner| owner.seen.set(tick.count));
//! clock.publish(Tick { count: 42 });
//!
//! assert_eq!(clock.seen.get(), 42);
//! ```

mod emitter;
mod source;

pub use emitter::{Emitter, ListenerId};
pub use source::{Emits, EventSource};
