//! Slot arena binding engine-side handle identities to their wrappers.
//!
//! Each slot is the "user-data" the engine addresses callbacks with: a stable
//! index plus a generation counter, so a recycled slot never receives a
//! delivery meant for its previous occupant. Before a handle's engine init
//! succeeds the slot tracks the wrapper weakly; afterwards the slot holds it
//! strongly, because the engine may schedule callbacks for it and the wrapper
//! must not be freed until the engine confirms close.

use std::cell::RefCell;
use std::mem;
use std::rc::{Rc, Weak};

use crate::engine::RawHandle;
use crate::handle::RawDispatch;

pub(crate) struct Registry {
    slots: RefCell<Vec<Slot>>,
    free: RefCell<Vec<u32>>,
}

struct Slot {
    generation: u32,
    occupant: Occupant,
}

enum Occupant {
    Vacant,

    /// Reserved for a wrapper that is not engine-initialized yet; dropping
    /// the wrapper frees the slot.
    Tracked(Weak<dyn RawDispatch>),

    /// Engine-initialized; the loop keeps the wrapper alive until the engine
    /// confirms close.
    Held(Rc<dyn RawDispatch>),
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
        }
    }

    /// Allocates a slot and returns the identity the engine will address
    /// callbacks with.
    pub(crate) fn reserve(&self) -> RawHandle {
        let mut slots = self.slots.borrow_mut();

        if let Some(index) = self.free.borrow_mut().pop() {
            let slot = slots
                .get(index as usize)
                .expect("free list only holds indices of existing slots");
            return RawHandle::new(index, slot.generation);
        }

        let index = u32::try_from(slots.len()).expect("registry slot count fits in u32");
        slots.push(Slot {
            generation: 0,
            occupant: Occupant::Vacant,
        });
        RawHandle::new(index, 0)
    }

    /// Populates a reserved slot with its wrapper. The reference is weak
    /// until [`hold`][Self::hold]: an uninitialized wrapper is owned by its
    /// creator alone.
    pub(crate) fn attach(&self, raw: RawHandle, wrapper: Weak<dyn RawDispatch>) {
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.get_mut(raw.index() as usize) else {
            return;
        };

        if slot.generation != raw.generation() {
            return;
        }

        slot.occupant = Occupant::Tracked(wrapper);
    }

    /// Upgrades the slot to a strong reference after a successful engine
    /// init. Idempotent.
    pub(crate) fn hold(&self, raw: RawHandle) {
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.get_mut(raw.index() as usize) else {
            return;
        };

        if slot.generation != raw.generation() {
            return;
        }

        if let Occupant::Tracked(wrapper) = &slot.occupant {
            let wrapper = wrapper
                .upgrade()
                .expect("hold is called from a method of the wrapper itself");
            slot.occupant = Occupant::Held(wrapper);
        }
    }

    /// Recovers the wrapper a delivery is addressed to. `None` for vacated
    /// slots, stale generations, and wrappers already dropped.
    pub(crate) fn resolve(&self, raw: RawHandle) -> Option<Rc<dyn RawDispatch>> {
        let slots = self.slots.borrow();
        let slot = slots.get(raw.index() as usize)?;

        if slot.generation != raw.generation() {
            return None;
        }

        match &slot.occupant {
            Occupant::Vacant => None,
            Occupant::Tracked(wrapper) => wrapper.upgrade(),
            Occupant::Held(wrapper) => Some(Rc::clone(wrapper)),
        }
    }

    /// Snapshot of every live wrapper, for walk-style iteration that must
    /// tolerate structural changes while visiting.
    pub(crate) fn live(&self) -> Vec<Rc<dyn RawDispatch>> {
        let slots = self.slots.borrow();
        slots
            .iter()
            .filter_map(|slot| match &slot.occupant {
                Occupant::Vacant => None,
                Occupant::Tracked(wrapper) => wrapper.upgrade(),
                Occupant::Held(wrapper) => Some(Rc::clone(wrapper)),
            })
            .collect()
    }

    /// Vacates a slot after the engine confirmed close. The stored strong
    /// reference is dropped outside the borrow: this may be the wrapper's
    /// last reference, and its drop re-enters [`forget`][Self::forget].
    pub(crate) fn release(&self, raw: RawHandle) {
        let removed = {
            let mut slots = self.slots.borrow_mut();
            let Some(slot) = slots.get_mut(raw.index() as usize) else {
                return;
            };

            if slot.generation != raw.generation() {
                return;
            }

            slot.generation = slot.generation.wrapping_add(1);
            self.free.borrow_mut().push(raw.index());
            mem::replace(&mut slot.occupant, Occupant::Vacant)
        };

        drop(removed);
    }

    /// Frees the slot of a wrapper being dropped before engine init. A slot
    /// that was already vacated by close fails the generation check; a held
    /// slot is unreachable here because holding implies the wrapper cannot
    /// drop.
    pub(crate) fn forget(&self, raw: RawHandle) {
        let mut slots = self.slots.borrow_mut();
        let Some(slot) = slots.get_mut(raw.index() as usize) else {
            return;
        };

        if slot.generation != raw.generation() {
            return;
        }

        if matches!(slot.occupant, Occupant::Held(_)) {
            return;
        }

        slot.generation = slot.generation.wrapping_add(1);
        slot.occupant = Occupant::Vacant;
        self.free.borrow_mut().push(raw.index());
    }
}
