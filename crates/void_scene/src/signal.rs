//! Single-threaded signals for node notifications
//!
//! Listeners may connect, disconnect, or call back into the emitting node
//! while an emission is in progress; emission iterates over a snapshot.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

type Listener<T> = Rc<dyn Fn(&T)>;

struct Slot<T> {
    id: SubscriberId,
    once: bool,
    listener: Listener<T>,
}

/// A list of listeners notified with a value of type `T`
pub struct Signal<T> {
    slots: RefCell<Vec<Slot<T>>>,
    next_id: Cell<u64>,
}

impl<T: 'static> Signal<T> {
    /// Create a signal with no listeners
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    /// Subscribe for every emission
    pub fn connect<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(&T) + 'static,
    {
        self.add_slot(Rc::new(listener), false)
    }

    /// Subscribe for the next emission only
    pub fn connect_once<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(&T) + 'static,
    {
        self.add_slot(Rc::new(listener), true)
    }

    /// Remove a listener; returns false if it was not connected
    pub fn disconnect(&self, id: SubscriberId) -> bool {
        let mut slots = self.slots.borrow_mut();
        let before = slots.len();
        slots.retain(|s| s.id != id);
        slots.len() != before
    }

    /// Notify every listener connected at the time of the call
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, value: &T) -> usize {
        let snapshot: Vec<(SubscriberId, bool, Listener<T>)> = self
            .slots
            .borrow()
            .iter()
            .map(|s| (s.id, s.once, Rc::clone(&s.listener)))
            .collect();

        self.slots
            .borrow_mut()
            .retain(|s| !(s.once && snapshot.iter().any(|(id, _, _)| *id == s.id)));

        for (_, _, listener) in &snapshot {
            listener(value);
        }
        snapshot.len()
    }

    /// Number of connected listeners
    pub fn listener_count(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Remove every listener
    pub fn clear(&self) {
        self.slots.borrow_mut().clear();
    }

    fn add_slot(&self, listener: Listener<T>, once: bool) -> SubscriberId {
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.slots.borrow_mut().push(Slot { id, once, listener });
        id
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.slots.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_emit() {
        let signal = Signal::<u32>::new();
        let total = Rc::new(Cell::new(0));

        let t = Rc::clone(&total);
        signal.connect(move |v| t.set(t.get() + v));

        assert_eq!(signal.emit(&2), 1);
        assert_eq!(signal.emit(&3), 1);
        assert_eq!(total.get(), 5);
    }

    #[test]
    fn test_connect_once() {
        let signal = Signal::<()>::new();
        let calls = Rc::new(Cell::new(0));

        let c = Rc::clone(&calls);
        signal.connect_once(move |_| c.set(c.get() + 1));

        signal.emit(&());
        signal.emit(&());
        assert_eq!(calls.get(), 1);
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::<()>::new();
        let id = signal.connect(|_| {});

        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        assert_eq!(signal.emit(&()), 0);
    }

    #[test]
    fn test_reentrant_connect_during_emit() {
        let signal = Rc::new(Signal::<()>::new());
        let calls = Rc::new(Cell::new(0));

        let s = Rc::clone(&signal);
        let c = Rc::clone(&calls);
        signal.connect_once(move |_| {
            let c = Rc::clone(&c);
            s.connect_once(move |_| c.set(c.get() + 1));
        });

        // The listener added mid-emission survives until the next emit
        signal.emit(&());
        assert_eq!(calls.get(), 0);
        assert_eq!(signal.listener_count(), 1);

        signal.emit(&());
        assert_eq!(calls.get(), 1);
    }
}
