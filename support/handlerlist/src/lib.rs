//! Provides a list of registered handlers. Inserting an element hands the
//! caller a ticket that can later be used to detach (i.e., unregister) that
//! element, even after the list itself is gone.
//!
//! Dispatch safety: [`HandlerList::snapshot`] returns the current elements as
//! a `Vec` of shared references, so callers can iterate without keeping the
//! list borrowed. Handlers called during such an iteration are free to insert
//! into or detach from the same list.
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

/// A list of registered handlers.
pub struct HandlerList<T> {
    inner: Rc<RefCell<Slots<T>>>,
}

struct Slots<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    len: usize,
}

struct Slot<T> {
    /// Incremented every time the slot is vacated. A ticket whose generation
    /// does not match refers to an element that is already gone.
    generation: u64,
    value: Option<Rc<T>>,
}

/// A token referring to an element in a [`HandlerList`].
///
/// Dropping a ticket does *not* detach the element; call [`Ticket::detach`].
pub struct Ticket {
    slots: Weak<dyn Detach>,
    index: usize,
    generation: u64,
}

trait Detach {
    fn detach(&self, index: usize, generation: u64) -> bool;
}

impl<T> Detach for RefCell<Slots<T>> {
    fn detach(&self, index: usize, generation: u64) -> bool {
        let mut slots = self.borrow_mut();
        match slots.slots.get_mut(index) {
            Some(slot) if slot.generation == generation && slot.value.is_some() => {
                slot.value = None;
                slot.generation += 1;
                slots.free.push(index);
                slots.len -= 1;
                true
            }
            _ => false,
        }
    }
}

impl<T> Default for HandlerList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandlerList<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Slots {
                slots: Vec::new(),
                free: Vec::new(),
                len: 0,
            })),
        }
    }

    /// Insert an element, returning a ticket that detaches it.
    pub fn insert(&self, value: T) -> Ticket
    where
        T: 'static,
    {
        let mut slots = self.inner.borrow_mut();
        let value = Rc::new(value);
        let (index, generation) = if let Some(index) = slots.free.pop() {
            let slot = &mut slots.slots[index];
            slot.value = Some(value);
            (index, slot.generation)
        } else {
            slots.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            (slots.slots.len() - 1, 0)
        };
        slots.len += 1;

        let weak: Weak<RefCell<Slots<T>>> = Rc::downgrade(&self.inner);
        Ticket {
            slots: weak,
            index,
            generation,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the current elements in insertion-slot order.
    pub fn snapshot(&self) -> Vec<Rc<T>> {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter_map(|slot| slot.value.clone())
            .collect()
    }
}

impl Ticket {
    /// Remove the element that `self` refers to.
    ///
    /// Returns `false` if the element was already detached or the list has
    /// been dropped.
    pub fn detach(self) -> bool {
        if let Some(slots) = self.slots.upgrade() {
            slots.detach(self.index, self.generation)
        } else {
            false
        }
    }
}

impl<T> fmt::Debug for HandlerList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerList")
            .field("len", &self.len())
            .finish()
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_snapshot() {
        let list = HandlerList::new();
        list.insert(1);
        list.insert(2);
        list.insert(3);
        let values: Vec<i32> = list.snapshot().iter().map(|x| **x).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn detach() {
        let list = HandlerList::new();
        let t1 = list.insert(1);
        let _t2 = list.insert(2);
        assert!(t1.detach());
        let values: Vec<i32> = list.snapshot().iter().map(|x| **x).collect();
        assert_eq!(values, vec![2]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn detach_twice_is_harmless() {
        let list = HandlerList::new();
        let t1 = list.insert(1);
        let t1b = Ticket {
            slots: t1.slots.clone(),
            index: t1.index,
            generation: t1.generation,
        };
        assert!(t1.detach());
        assert!(!t1b.detach());
        assert!(list.is_empty());
    }

    #[test]
    fn slot_reuse_invalidates_old_tickets() {
        let list = HandlerList::new();
        let t1 = list.insert(1);
        let stale = Ticket {
            slots: t1.slots.clone(),
            index: t1.index,
            generation: t1.generation,
        };
        assert!(t1.detach());
        // The freed slot is reused for the next insertion.
        let t2 = list.insert(2);
        assert!(!stale.detach());
        assert_eq!(list.len(), 1);
        assert!(t2.detach());
        assert!(list.is_empty());
    }

    #[test]
    fn detach_after_list_dropped() {
        let list = HandlerList::new();
        let t1 = list.insert(1);
        drop(list);
        assert!(!t1.detach());
    }

    #[test]
    fn handlers_may_mutate_during_dispatch() {
        use std::cell::Cell;

        let list: Rc<HandlerList<Box<dyn Fn()>>> = Rc::new(HandlerList::new());
        let fired = Rc::new(Cell::new(0));

        let list2 = Rc::clone(&list);
        let fired2 = Rc::clone(&fired);
        list.insert(Box::new(move || {
            fired2.set(fired2.get() + 1);
            // Inserting while a dispatch snapshot is alive must not panic.
            let fired3 = Rc::clone(&fired2);
            list2.insert(Box::new(move || {
                fired3.set(fired3.get() + 1);
            }));
        }));

        for handler in list.snapshot() {
            handler();
        }
        assert_eq!(fired.get(), 1);
        assert_eq!(list.len(), 2);
    }
}
