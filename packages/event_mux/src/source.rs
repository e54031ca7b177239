//! Traits that attach an [`Emitter`] to an owning object.
//!
//! An emitting object declares its closed set of event kinds by implementing
//! [`Emits<E>`] once per kind. The subscription surface is then available
//! directly on the object through [`EventSource`], with the kind parameter
//! checked at compile time against the declared set.

use crate::{Emitter, ListenerId};

/// Marks an [`EventSource`] as able to publish events of kind `E`.
///
/// The set of `Emits` implementations on a type is its complete, closed event
/// vocabulary: subscribing to or publishing an undeclared kind does not
/// compile. There is no runtime registry of kinds.
pub trait Emits<E>: EventSource {}

/// An object that owns an [`Emitter`] and exposes it as its own subscription
/// surface.
///
/// Only [`emitter`][Self::emitter] is required; every other method forwards to
/// the emitter, passing `self` as the owner reference that listeners receive
/// alongside the payload.
///
/// # Example
///
/// ```rust
/// use event_mux::{Emits, Emitter, EventSource};
///
/// struct Ring {
///     volume: u8,
/// }
///
/// struct Doorbell {
///     events: Emitter<Doorbell>,
/// }
///
/// impl EventSource for Doorbell {
///     fn emitter(&self) -> &Emitter<Self> {
///         &self.events
///     }
/// }
///
/// impl Emits<Ring> for Doorbell {}
///
/// let doorbell = Doorbell {
///     events: Emitter::new(),
/// };
///
/// doorbell.on::<Ring>(|ring, _doorbell| {
///     assert_eq!(ring.volume, 11);
/// });
///
/// doorbell.publish(Ring { volume: 11 });
/// ```
pub trait EventSource: Sized + 'static {
    /// The emitter backing this object's subscription surface.
    fn emitter(&self) -> &Emitter<Self>;

    /// Registers a persistent listener for events of kind `E`.
    ///
    /// See [`Emitter::on`].
    fn on<E: 'static>(&self, listener: impl Fn(&E, &Self) + 'static) -> ListenerId
    where
        Self: Emits<E>,
    {
        self.emitter().on(listener)
    }

    /// Registers a listener for events of kind `E` that is removed after its
    /// first invocation.
    ///
    /// See [`Emitter::once`].
    fn once<E: 'static>(&self, listener: impl Fn(&E, &Self) + 'static) -> ListenerId
    where
        Self: Emits<E>,
    {
        self.emitter().once(listener)
    }

    /// Removes the registration identified by `id`, if still present.
    ///
    /// See [`Emitter::erase`].
    fn erase(&self, id: ListenerId) {
        self.emitter().erase(id);
    }

    /// Removes every listener for events of kind `E`.
    ///
    /// See [`Emitter::clear`].
    fn clear<E: 'static>(&self)
    where
        Self: Emits<E>,
    {
        self.emitter().clear::<E>();
    }

    /// Removes every listener for every event kind.
    ///
    /// See [`Emitter::clear_all`].
    fn clear_all(&self) {
        self.emitter().clear_all();
    }

    /// Whether no active listener remains for events of kind `E`.
    ///
    /// See [`Emitter::is_empty_of`].
    #[must_use]
    fn is_empty_of<E: 'static>(&self) -> bool
    where
        Self: Emits<E>,
    {
        self.emitter().is_empty_of::<E>()
    }

    /// Whether no active listener remains for any event kind.
    ///
    /// See [`Emitter::is_empty`].
    #[must_use]
    fn is_empty(&self) -> bool {
        self.emitter().is_empty()
    }

    /// Publishes one occurrence of `event` to every active listener for `E`,
    /// in registration order, with `self` as the owner reference.
    ///
    /// See [`Emitter::publish`] for the dispatch contract.
    fn publish<E: 'static>(&self, event: E)
    where
        Self: Emits<E>,
    {
        self.emitter().publish(event, self);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Ring {
        volume: u8,
    }

    struct Muffle;

    struct Doorbell {
        events: Emitter<Doorbell>,
        rings: Cell<u32>,
    }

    impl Doorbell {
        fn new() -> Self {
            Self {
                events: Emitter::new(),
                rings: Cell::new(0),
            }
        }
    }

    impl EventSource for Doorbell {
        fn emitter(&self) -> &Emitter<Self> {
            &self.events
        }
    }

    impl Emits<Ring> for Doorbell {}
    impl Emits<Muffle> for Doorbell {}

    #[test]
    fn listener_receives_payload_and_owner() {
        let doorbell = Doorbell::new();

        doorbell.on::<Ring>(|ring, owner| {
            assert_eq!(ring.volume, 3);
            owner.rings.set(owner.rings.get() + 1);
        });

        doorbell.publish(Ring { volume: 3 });
        doorbell.publish(Ring { volume: 3 });

        assert_eq!(doorbell.rings.get(), 2);
    }

    #[test]
    fn forwarded_surface_matches_emitter_semantics() {
        let doorbell = Doorbell::new();

        assert!(doorbell.is_empty());

        let id = doorbell.once::<Muffle>(|_, _| {});

        assert!(!doorbell.is_empty());
        assert!(doorbell.is_empty_of::<Ring>());
        assert!(!doorbell.is_empty_of::<Muffle>());

        doorbell.erase(id);

        assert!(doorbell.is_empty());

        doorbell.on::<Ring>(|_, _| {});
        doorbell.clear::<Ring>();

        assert!(doorbell.is_empty_of::<Ring>());

        doorbell.on::<Ring>(|_, _| {});
        doorbell.on::<Muffle>(|_, _| {});
        doorbell.clear_all();

        assert!(doorbell.is_empty());
    }

    #[test]
    fn listener_mutates_owner_through_cell_state() {
        let doorbell = Doorbell::new();

        doorbell.on::<Ring>(|ring, owner| {
            owner.rings.set(owner.rings.get() + u32::from(ring.volume));
        });

        doorbell.publish(Ring { volume: 2 });
        doorbell.publish(Ring { volume: 5 });

        assert_eq!(doorbell.rings.get(), 7);
    }
}
