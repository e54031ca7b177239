//! The dispatch core: one ordered listener sequence per event kind.
//!
//! The emitter never iterates and mutates the same live sequence at once.
//! Listeners removed while a publish pass is on the stack are tombstoned and
//! compacted only after the outermost pass returns, so registration tokens
//! stay valid and survivors keep their relative order.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU64;
use std::rc::Rc;

use foldhash::HashMap;
use scopeguard::defer;

/// An opaque, order-stable token identifying one listener registration.
///
/// Equality is identity-based: two registrations of the same closure are two
/// distinct tokens. A token remains valid (as a no-op) after the registration
/// it names has been erased or has fired as a one-shot.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ListenerId {
    kind: TypeId,
    token: NonZeroU64,
}

/// Typed multi-kind publish/subscribe core for a single owner object.
///
/// An `Emitter<T>` holds, for every event kind `E` ever subscribed to, an
/// ordered sequence of listeners `Fn(&E, &T)`. Publishing an event invokes the
/// active listeners for that kind in registration order, passing the payload
/// and a reference to the owning object.
///
/// All methods take `&self`; listeners may subscribe, erase (including
/// themselves), clear, or publish again from inside a dispatch in progress.
/// The exact reentrancy rules are documented on [`publish`][Self::publish].
///
/// This type is single-threaded and neither [`Send`] nor [`Sync`].
///
/// # Example
///
/// ```rust
/// use event_mux::Emitter;
///
/// struct Tick {
///     count: u64,
/// }
///
/// struct Clock;
///
/// let emitter = Emitter::<Clock>::new();
/// let clock = Clock;
///
/// emitter.on::<Tick>(|tick, _clock| {
///     assert_eq!(tick.count, 1);
/// });
///
/// emitter.publish(Tick { count: 1 }, &clock);
/// ```
pub struct Emitter<T> {
    /// One queue per event kind, keyed by the kind's type identity. Entries
    /// are created on first subscription and persist (possibly empty) for the
    /// emitter's lifetime.
    kinds: RefCell<HashMap<TypeId, Rc<dyn Kind>>>,

    /// Source of registration tokens; tokens are unique per emitter.
    tokens: Cell<u64>,

    // Dispatch is single-threaded by contract, even if T is thread-mobile.
    _single_threaded: PhantomData<*const ()>,

    _owner: PhantomData<T>,
}

impl<T> Emitter<T> {
    /// Creates an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            kinds: RefCell::new(HashMap::default()),
            tokens: Cell::new(0),
            _single_threaded: PhantomData,
            _owner: PhantomData,
        }
    }
}

impl<T: 'static> Emitter<T> {
    /// Registers a persistent listener for events of kind `E`.
    ///
    /// Listeners for the same kind fire in registration order. The returned
    /// token can be passed to [`erase`][Self::erase] to remove exactly this
    /// registration.
    pub fn on<E: 'static>(&self, listener: impl Fn(&E, &T) + 'static) -> ListenerId {
        self.register::<E>(Rc::new(listener), false)
    }

    /// Registers a listener for events of kind `E` that is removed after its
    /// first invocation.
    ///
    /// Removal happens strictly after the callback returns: a one-shot
    /// listener that inspects [`is_empty_of`][Self::is_empty_of] during its
    /// own invocation still sees itself counted.
    pub fn once<E: 'static>(&self, listener: impl Fn(&E, &T) + 'static) -> ListenerId {
        self.register::<E>(Rc::new(listener), true)
    }

    /// Removes the registration identified by `id`, if still present.
    ///
    /// Erasing a token twice, or erasing a one-shot that has already fired,
    /// is a no-op rather than an error. Safe to call from inside a listener,
    /// including for registrations the in-progress pass has not reached yet;
    /// those are suppressed.
    pub fn erase(&self, id: ListenerId) {
        let queue = {
            let kinds = self.kinds.borrow();
            kinds.get(&id.kind).map(Rc::clone)
        };

        if let Some(queue) = queue {
            queue.erase(id.token);
        }
    }

    /// Removes every listener for events of kind `E`.
    ///
    /// Safe to call from inside a dispatch of the same kind: listeners the
    /// current pass has not reached yet are suppressed; listeners already
    /// invoked are unaffected.
    pub fn clear<E: 'static>(&self) {
        let queue = {
            let kinds = self.kinds.borrow();
            kinds.get(&TypeId::of::<E>()).map(Rc::clone)
        };

        if let Some(queue) = queue {
            queue.clear();
        }
    }

    /// Removes every listener for every event kind.
    ///
    /// Same reentrancy rules as [`clear`][Self::clear], applied per kind.
    pub fn clear_all(&self) {
        let queues = {
            let kinds = self.kinds.borrow();
            kinds.values().map(Rc::clone).collect::<Vec<_>>()
        };

        for queue in queues {
            queue.clear();
        }
    }

    /// Whether no active listener remains for events of kind `E`.
    ///
    /// Tombstoned (erased but not yet compacted) listeners do not count.
    #[must_use]
    pub fn is_empty_of<E: 'static>(&self) -> bool {
        let kinds = self.kinds.borrow();
        kinds
            .get(&TypeId::of::<E>())
            .is_none_or(|queue| !queue.has_active())
    }

    /// Whether no active listener remains for any event kind.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let kinds = self.kinds.borrow();
        kinds.values().all(|queue| !queue.has_active())
    }

    /// Publishes one occurrence of `event` to every active listener for `E`,
    /// in registration order, passing `(&event, owner)` to each.
    ///
    /// Publishing with no listeners registered is a no-op.
    ///
    /// The iteration is defensive: each step consults the live sequence, not a
    /// snapshot taken at the start of the pass. Consequences, pinned by tests:
    ///
    /// * a listener erased or cleared by an earlier listener of the same pass
    ///   is not invoked;
    /// * a listener registered during the pass lands at the tail, ahead of the
    ///   cursor, and is invoked in the same pass;
    /// * a listener runs to completion once started; erasure cancels future
    ///   deliveries only;
    /// * reentrant `publish` of the same kind from inside a listener is
    ///   permitted and completes before the outer pass resumes.
    ///
    /// A panic inside a listener aborts the remaining pass and propagates to
    /// the caller; the emitter itself stays coherent and usable.
    pub fn publish<E: 'static>(&self, event: E, owner: &T) {
        let Some(queue) = self.typed_queue::<E>() else {
            return;
        };

        queue.dispatch(&event, owner);
    }

    fn register<E: 'static>(&self, callback: Rc<dyn Fn(&E, &T)>, once: bool) -> ListenerId {
        let token = self.next_token();

        self.typed_queue_or_insert::<E>().push(Entry {
            token,
            once,
            dead: Cell::new(false),
            callback,
        });

        ListenerId {
            kind: TypeId::of::<E>(),
            token,
        }
    }

    fn next_token(&self) -> NonZeroU64 {
        let next = self
            .tokens
            .get()
            .checked_add(1)
            .expect("listener token space is effectively inexhaustible");
        self.tokens.set(next);
        NonZeroU64::new(next).expect("tokens start counting from one")
    }

    fn typed_queue<E: 'static>(&self) -> Option<Rc<KindQueue<E, T>>> {
        let queue = {
            let kinds = self.kinds.borrow();
            kinds.get(&TypeId::of::<E>()).map(Rc::clone)?
        };

        Some(
            queue
                .as_any()
                .downcast::<KindQueue<E, T>>()
                .expect("queue is keyed by exactly this event kind"),
        )
    }

    fn typed_queue_or_insert<E: 'static>(&self) -> Rc<KindQueue<E, T>> {
        let queue = {
            let mut kinds = self.kinds.borrow_mut();
            let queue = kinds
                .entry(TypeId::of::<E>())
                .or_insert_with(|| Rc::new(KindQueue::<E, T>::new()) as Rc<dyn Kind>);
            Rc::clone(queue)
        };

        queue
            .as_any()
            .downcast::<KindQueue<E, T>>()
            .expect("queue is keyed by exactly this event kind")
    }
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("event_kinds", &self.kinds.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Type-erased view of a single kind's listener queue, for the operations
/// that do not need to know the payload type (erase, clear, emptiness).
trait Kind {
    fn erase(&self, token: NonZeroU64);
    fn clear(&self);
    fn has_active(&self) -> bool;
    fn as_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// One listener registration. `dead` is the tombstone flag; a dead entry is
/// never invoked and is removed by compaction once no pass is on the stack.
struct Entry<E, T> {
    token: NonZeroU64,
    once: bool,
    dead: Cell<bool>,
    callback: Rc<dyn Fn(&E, &T)>,
}

/// The ordered listener sequence for one event kind.
struct KindQueue<E, T> {
    entries: RefCell<Vec<Entry<E, T>>>,

    /// Number of publish passes for this kind currently on the call stack.
    /// Compaction only runs when this returns to zero, which is what keeps
    /// cursor positions and tokens stable during reentrant mutation.
    depth: Cell<usize>,
}

impl<E, T> KindQueue<E, T> {
    fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            depth: Cell::new(0),
        }
    }

    fn push(&self, entry: Entry<E, T>) {
        self.entries.borrow_mut().push(entry);
    }

    fn compact(&self) {
        self.entries.borrow_mut().retain(|entry| !entry.dead.get());
    }

    fn dispatch(&self, event: &E, owner: &T) {
        let depth = self
            .depth
            .get()
            .checked_add(1)
            .expect("dispatch nesting is bounded by the call stack");
        self.depth.set(depth);

        // Runs on unwind as well: a panicking listener must not leave the
        // queue in a state where compaction never happens again.
        defer! {
            let depth = self
                .depth
                .get()
                .checked_sub(1)
                .expect("every dispatch exit pairs with one entry");
            self.depth.set(depth);

            if depth == 0 {
                self.compact();
            }
        }

        let mut cursor = 0_usize;
        loop {
            // The borrow must not outlive this step: the callback below may
            // reenter and take its own borrows.
            let step = {
                let entries = self.entries.borrow();
                let Some(entry) = entries.get(cursor) else {
                    break;
                };

                if entry.dead.get() {
                    None
                } else {
                    Some((Rc::clone(&entry.callback), entry.once, entry.token))
                }
            };

            if let Some((callback, once, token)) = step {
                callback(event, owner);

                if once {
                    // Entry positions are stable while any pass is on the
                    // stack, so the cursor still addresses the same entry
                    // unless the whole queue was cleared and rebuilt; the
                    // token check covers that.
                    let entries = self.entries.borrow();
                    if let Some(entry) = entries.get(cursor) {
                        if entry.token == token {
                            entry.dead.set(true);
                        }
                    }
                }
            }

            cursor = cursor
                .checked_add(1)
                .expect("cursor is bounded by the entry count");
        }
    }
}

impl<E: 'static, T: 'static> Kind for KindQueue<E, T> {
    fn erase(&self, token: NonZeroU64) {
        {
            let entries = self.entries.borrow();
            let Some(entry) = entries.iter().find(|entry| entry.token == token) else {
                return;
            };
            entry.dead.set(true);
        }

        if self.depth.get() == 0 {
            self.compact();
        }
    }

    fn clear(&self) {
        if self.depth.get() == 0 {
            self.entries.borrow_mut().clear();
        } else {
            let entries = self.entries.borrow();
            for entry in entries.iter() {
                entry.dead.set(true);
            }
        }
    }

    fn has_active(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| !entry.dead.get())
    }

    fn as_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
