// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mark node storage and count propagation.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::clock::TickId;
use crate::events::{EventHub, ListenerId};
use crate::jobs::{JobId, Jobs};

use super::error::SubscribeError;
use super::id::{Lifetime, MarkEvent, MarkId, MarkKey, Subscription};

/// Listener handles wiring a subscriber into a source's hub.
#[derive(Clone, Copy, Debug)]
struct Wiring {
    marked: ListenerId,
    unmarked: ListenerId,
}

/// Struct-of-arrays storage for mark nodes, keyed by `K`.
pub struct MarkGraph<K = MarkKey> {
    self_marks: Vec<BTreeMap<K, Lifetime>>,
    subscription_count: Vec<u32>,
    last_tick: Vec<Option<TickId>>,
    /// Per source: subscribers to notify.
    hub: Vec<EventHub<MarkEvent, MarkId>>,
    /// Per subscriber: the sources it listens to.
    subscriptions: Vec<BTreeMap<MarkId, Wiring>>,
    on_destroy: Vec<Jobs>,

    generation: Vec<u32>,
    free_list: Vec<u32>,
    len: u32,
}

impl<K> fmt::Debug for MarkGraph<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkGraph")
            .field("nodes", &self.node_count())
            .field("free", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<K: Ord> Default for MarkGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> MarkGraph<K> {
    /// Returns the number of live nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Returns whether the handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: MarkId) -> bool {
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    fn id_at(&self, idx: u32) -> MarkId {
        MarkId {
            idx,
            generation: self.generation[idx as usize],
        }
    }
}

impl<K: Ord> MarkGraph<K> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            self_marks: Vec::new(),
            subscription_count: Vec::new(),
            last_tick: Vec::new(),
            hub: Vec::new(),
            subscriptions: Vec::new(),
            on_destroy: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Creates a node with no marks and no subscriptions.
    pub fn create(&mut self) -> MarkId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.subscription_count[i] = 0;
            self.last_tick[i] = None;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.self_marks.push(BTreeMap::new());
            self.subscription_count.push(0);
            self.last_tick.push(None);
            self.hub.push(EventHub::new());
            self.subscriptions.push(BTreeMap::new());
            self.on_destroy.push(Jobs::new());
            self.generation.push(0);
            idx
        };
        self.id_at(idx)
    }

    // -- Marks --

    /// Adds a self mark and notifies subscribers of one more mark.
    ///
    /// Returns `false` (and changes nothing, including the lifetime) if the
    /// key is already marked or the node is destroyed.
    pub fn mark(&mut self, id: MarkId, key: K, lifetime: Lifetime) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let marks = &mut self.self_marks[id.idx as usize];
        if marks.contains_key(&key) {
            return false;
        }
        marks.insert(key, lifetime);
        self.propagate(id.idx, MarkEvent::Marked, 1);
        true
    }

    /// Removes a self mark and notifies subscribers of one fewer mark.
    ///
    /// Returns `false` if the key was not marked.
    pub fn unmark(&mut self, id: MarkId, key: &K) -> bool {
        if !self.is_alive(id) || self.self_marks[id.idx as usize].remove(key).is_none() {
            return false;
        }
        self.propagate(id.idx, MarkEvent::Unmarked, 1);
        true
    }

    /// Removes every self mark with a single notification, returning how many
    /// were removed.
    pub fn clear_marks(&mut self, id: MarkId) -> u32 {
        if !self.is_alive(id) {
            return 0;
        }
        let removed = count(self.self_marks[id.idx as usize].len());
        self.self_marks[id.idx as usize].clear();
        self.propagate(id.idx, MarkEvent::Unmarked, removed);
        removed
    }

    /// Returns `true` if `key` is currently marked on the node.
    #[must_use]
    pub fn has_mark(&self, id: MarkId, key: &K) -> bool {
        self.is_alive(id) && self.self_marks[id.idx as usize].contains_key(key)
    }

    /// Returns the remaining lifetime of a self mark.
    #[must_use]
    pub fn lifetime(&self, id: MarkId, key: &K) -> Option<Lifetime> {
        if !self.is_alive(id) {
            return None;
        }
        self.self_marks[id.idx as usize].get(key).copied()
    }

    /// Returns the number of self marks.
    #[must_use]
    pub fn self_mark_count(&self, id: MarkId) -> u32 {
        if !self.is_alive(id) {
            return 0;
        }
        count(self.self_marks[id.idx as usize].len())
    }

    /// Returns the number of marks contributed by subscribed sources.
    #[must_use]
    pub fn subscription_count(&self, id: MarkId) -> u32 {
        if !self.is_alive(id) {
            return 0;
        }
        self.subscription_count[id.idx as usize]
    }

    /// Returns self marks plus subscription count: what this node contributes
    /// to its own subscribers.
    #[must_use]
    pub fn total(&self, id: MarkId) -> u32 {
        if !self.is_alive(id) {
            return 0;
        }
        self.total_at(id.idx)
    }

    fn total_at(&self, idx: u32) -> u32 {
        let i = idx as usize;
        count(self.self_marks[i].len()) + self.subscription_count[i]
    }

    // -- Subscriptions --

    /// Makes `subscriber` receive `source`'s mark notifications.
    ///
    /// `source`'s current total is added to `subscriber` (and forwarded to
    /// its own subscribers). Subscribing an existing pair again returns the
    /// existing edge unchanged.
    pub fn subscribe(
        &mut self,
        subscriber: MarkId,
        source: MarkId,
    ) -> Result<Subscription, SubscribeError> {
        for id in [subscriber, source] {
            if !self.is_alive(id) {
                return Err(SubscribeError::Destroyed(id));
            }
        }
        if subscriber == source {
            return Err(SubscribeError::SelfSubscription(subscriber));
        }
        let edge = Subscription { subscriber, source };
        if self.subscriptions[subscriber.idx as usize].contains_key(&source) {
            return Ok(edge);
        }
        if self.reaches(subscriber, source) {
            return Err(SubscribeError::Cycle { subscriber, source });
        }

        let hub = &mut self.hub[source.idx as usize];
        let wiring = Wiring {
            marked: hub.on(MarkEvent::Marked, subscriber),
            unmarked: hub.on(MarkEvent::Unmarked, subscriber),
        };
        self.subscriptions[subscriber.idx as usize].insert(source, wiring);

        let total = self.total_at(source.idx);
        if total > 0 {
            self.subscription_count[subscriber.idx as usize] += total;
            self.propagate(subscriber.idx, MarkEvent::Marked, total);
        }
        Ok(edge)
    }

    /// Removes the `subscriber` ← `source` edge, subtracting `source`'s
    /// current total from `subscriber`.
    ///
    /// Returns `false` if the edge does not exist.
    pub fn unsubscribe(&mut self, subscriber: MarkId, source: MarkId) -> bool {
        if !self.is_alive(subscriber) || !self.is_alive(source) {
            return false;
        }
        let Some(wiring) = self.subscriptions[subscriber.idx as usize].remove(&source) else {
            return false;
        };
        let hub = &mut self.hub[source.idx as usize];
        hub.off(wiring.marked);
        hub.off(wiring.unmarked);

        let total = self.total_at(source.idx);
        if total > 0 {
            decrement(&mut self.subscription_count[subscriber.idx as usize], total);
            self.propagate(subscriber.idx, MarkEvent::Unmarked, total);
        }
        true
    }

    /// Removes a subscription edge. See [`unsubscribe`](Self::unsubscribe).
    pub fn cancel(&mut self, subscription: Subscription) -> bool {
        self.unsubscribe(subscription.subscriber, subscription.source)
    }

    /// Iterates the nodes `id` subscribes to.
    pub fn sources(&self, id: MarkId) -> impl Iterator<Item = MarkId> + '_ {
        let map = self
            .is_alive(id)
            .then(|| &self.subscriptions[id.idx as usize]);
        map.into_iter().flat_map(|m| m.keys().copied())
    }

    /// Iterates the nodes subscribed to `id`, in subscription order.
    pub fn subscribers(&self, id: MarkId) -> impl Iterator<Item = MarkId> + '_ {
        let hub = self.is_alive(id).then(|| &self.hub[id.idx as usize]);
        hub.into_iter()
            .flat_map(|h| h.listeners(MarkEvent::Marked).copied())
    }

    /// Returns `true` if `target` is `from` or receives notifications from
    /// it, directly or transitively.
    fn reaches(&self, from: MarkId, target: MarkId) -> bool {
        let mut seen = vec![false; self.len as usize];
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if core::mem::replace(&mut seen[id.idx as usize], true) {
                continue;
            }
            stack.extend(
                self.hub[id.idx as usize]
                    .listeners(MarkEvent::Marked)
                    .copied()
                    .filter(|s| self.is_alive(*s)),
            );
        }
        false
    }

    /// Forwards a change of `n` marks from `idx` through every downstream
    /// subscriber.
    fn propagate(&mut self, idx: u32, event: MarkEvent, n: u32) {
        if n == 0 {
            return;
        }
        let mut work = vec![idx];
        while let Some(idx) = work.pop() {
            for subscriber in self.hub[idx as usize].emit(event) {
                if !self.is_alive(subscriber) {
                    continue;
                }
                let slot = &mut self.subscription_count[subscriber.idx as usize];
                match event {
                    MarkEvent::Marked => *slot += n,
                    MarkEvent::Unmarked => decrement(slot, n),
                }
                work.push(subscriber.idx);
            }
        }
    }

    // -- Per-tick bookkeeping --

    /// Returns `true` if the node has marks (own or subscribed) and has not
    /// yet been processed for `tick`.
    #[must_use]
    pub fn should_redraw(&self, id: MarkId, tick: TickId) -> bool {
        self.is_alive(id)
            && self.last_tick[id.idx as usize] != Some(tick)
            && self.total_at(id.idx) > 0
    }

    /// Ages frame-limited marks, removes expired ones with one aggregated
    /// notification, and records `tick` as processed.
    ///
    /// A second call for the same tick does nothing, so marks age at most
    /// once per trigger; pass a new [`TickId`] to age again. Returns the
    /// number of expired marks.
    pub fn tick(&mut self, id: MarkId, tick: TickId) -> u32 {
        if !self.is_alive(id) || self.last_tick[id.idx as usize] == Some(tick) {
            return 0;
        }
        let i = id.idx as usize;
        self.last_tick[i] = Some(tick);
        let before = self.self_marks[i].len();
        self.self_marks[i].retain(|_, lifetime| match lifetime {
            Lifetime::Forever => true,
            Lifetime::Frames(n) => {
                *n = n.saturating_sub(1);
                *n > 0
            }
        });
        let expired = count(before - self.self_marks[i].len());
        self.propagate(id.idx, MarkEvent::Unmarked, expired);
        expired
    }

    /// Runs `render` and the tick bookkeeping if
    /// [`should_redraw`](Self::should_redraw) holds. Returns whether it ran.
    pub fn redraw_if_needed(&mut self, id: MarkId, tick: TickId, render: impl FnOnce()) -> bool {
        if !self.should_redraw(id, tick) {
            return false;
        }
        render();
        self.tick(id, tick);
        true
    }

    /// Returns the last tick the node processed.
    #[must_use]
    pub fn last_tick(&self, id: MarkId) -> Option<TickId> {
        if !self.is_alive(id) {
            return None;
        }
        self.last_tick[id.idx as usize]
    }

    // -- Teardown --

    /// Registers a job run when the node is destroyed.
    pub fn on_destroy(&mut self, id: MarkId, job: impl FnOnce() + 'static) -> Option<JobId> {
        if !self.is_alive(id) {
            return None;
        }
        Some(self.on_destroy[id.idx as usize].add(job))
    }

    /// Destroys a node.
    ///
    /// Subscribers are first notified of the removal of everything the node
    /// contributed (self marks plus subscription count), then every edge in
    /// both directions is removed, the slot is freed, and the node's destroy
    /// jobs run. No-op for a stale handle.
    ///
    /// Counts forwarded from the node's own sources are withdrawn too, not
    /// just its self marks. Afterwards every former subscriber's count equals
    /// the sum over its remaining sources.
    pub fn destroy(&mut self, id: MarkId) {
        if !self.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        let total = self.total_at(id.idx);
        self.propagate(id.idx, MarkEvent::Unmarked, total);
        self.self_marks[i].clear();
        self.subscription_count[i] = 0;

        let subscribers: Vec<MarkId> = self.subscribers(id).collect();
        for subscriber in subscribers {
            if self.is_alive(subscriber) {
                self.subscriptions[subscriber.idx as usize].remove(&id);
            }
        }
        self.hub[i].clear();
        for (source, wiring) in core::mem::take(&mut self.subscriptions[i]) {
            if self.is_alive(source) {
                let hub = &mut self.hub[source.idx as usize];
                hub.off(wiring.marked);
                hub.off(wiring.unmarked);
            }
        }

        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(id.idx);
        let mut jobs = core::mem::take(&mut self.on_destroy[i]);
        jobs.run();
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

fn decrement(slot: &mut u32, n: u32) {
    debug_assert!(*slot >= n, "subscription count underflow: {} - {n}", *slot);
    *slot = slot.wrapping_sub(n);
}
