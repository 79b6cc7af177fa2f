// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal typed publish/subscribe.
//!
//! An [`EventHub`] stores listeners keyed by a small event enum. Emitting an
//! event does not call anything itself: [`EventHub::emit`] returns a snapshot
//! of the listeners registered for that event at the moment of the emit,
//! and the caller dispatches them. This keeps the hub free of borrow
//! entanglement with whatever the listeners point at, and makes the
//! delivered set immune to registrations made while dispatching.
//!
//! One-shot listeners registered with [`EventHub::once`] are removed as part
//! of the emit that delivers them.

use alloc::vec::Vec;

/// Handle to a listener registered in an [`EventHub`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

#[derive(Clone, Debug)]
struct Entry<E, L> {
    id: ListenerId,
    event: E,
    listener: L,
    once: bool,
}

/// A listener registry keyed by event kind `E`.
///
/// `L` is whatever the owner needs to dispatch: a node handle, an
/// `Rc<dyn Fn(..)>`, an index.
#[derive(Clone, Debug)]
pub struct EventHub<E, L> {
    entries: Vec<Entry<E, L>>,
    next_id: u64,
}

impl<E, L> Default for EventHub<E, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, L> EventHub<E, L> {
    /// Creates a hub with no listeners.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Removes every listener for every event.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the total number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no listeners are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unregisters a listener.
    ///
    /// Returns `false` if the handle is unknown (already removed, or a
    /// one-shot listener that already fired).
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    fn insert(&mut self, event: E, listener: L, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            event,
            listener,
            once,
        });
        id
    }
}

impl<E: Copy + PartialEq, L> EventHub<E, L> {
    /// Registers `listener` for `event`.
    pub fn on(&mut self, event: E, listener: L) -> ListenerId {
        self.insert(event, listener, false)
    }

    /// Registers `listener` for the next emit of `event` only.
    pub fn once(&mut self, event: E, listener: L) -> ListenerId {
        self.insert(event, listener, true)
    }

    /// Iterates the listeners registered for `event`, in registration order.
    pub fn listeners(&self, event: E) -> impl Iterator<Item = &L> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.event == event)
            .map(|entry| &entry.listener)
    }

    /// Returns the number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: E) -> usize {
        self.listeners(event).count()
    }
}

impl<E: Copy + PartialEq, L: Clone> EventHub<E, L> {
    /// Snapshots the listeners for `event`, in registration order, and
    /// retires one-shot listeners that are part of the snapshot.
    ///
    /// The caller is responsible for dispatching the returned listeners.
    #[must_use = "emit only snapshots listeners; the caller dispatches them"]
    pub fn emit(&mut self, event: E) -> Vec<L> {
        let snapshot: Vec<L> = self.listeners(event).cloned().collect();
        self.entries
            .retain(|entry| !(entry.once && entry.event == event));
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::Cell;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Ev {
        Up,
        Down,
    }

    #[test]
    fn emit_snapshots_matching_listeners_in_order() {
        let mut hub = EventHub::new();
        hub.on(Ev::Up, 1);
        hub.on(Ev::Down, 2);
        hub.on(Ev::Up, 3);

        assert_eq!(hub.emit(Ev::Up), vec![1, 3]);
        assert_eq!(hub.emit(Ev::Down), vec![2]);
        assert_eq!(hub.listener_count(Ev::Up), 2, "persistent listeners stay");
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let mut hub = EventHub::new();
        hub.once(Ev::Up, 'a');
        hub.on(Ev::Up, 'b');

        assert_eq!(hub.emit(Ev::Up), vec!['a', 'b']);
        assert_eq!(hub.emit(Ev::Up), vec!['b']);
        // Emitting a different event must not retire it early.
        hub.once(Ev::Down, 'c');
        let _ = hub.emit(Ev::Up);
        assert_eq!(hub.listener_count(Ev::Down), 1);
    }

    #[test]
    fn off_removes_and_reports() {
        let mut hub = EventHub::new();
        let a = hub.on(Ev::Up, 1);
        let once = hub.once(Ev::Up, 2);

        assert!(hub.off(a));
        assert!(!hub.off(a), "unknown handle is a no-op");
        assert!(hub.off(once), "once listeners can be cancelled before firing");
        assert!(hub.emit(Ev::Up).is_empty());
    }

    #[test]
    fn clear_drops_everything() {
        let mut hub = EventHub::new();
        hub.on(Ev::Up, 1);
        hub.on(Ev::Down, 2);
        hub.clear();
        assert!(hub.is_empty());
        assert!(hub.emit(Ev::Up).is_empty());
    }

    #[test]
    fn closure_listeners_dispatch_from_snapshot() {
        let hits = Rc::new(Cell::new(0));
        let mut hub: EventHub<Ev, Rc<dyn Fn(u32)>> = EventHub::new();
        let h = Rc::clone(&hits);
        hub.on(Ev::Up, Rc::new(move |n| h.set(h.get() + n)));

        for listener in hub.emit(Ev::Up) {
            listener(5);
        }
        assert_eq!(hits.get(), 5);
    }
}
