// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

/// A handle to a node in a [`MarkGraph`](super::MarkGraph).
///
/// Generational, like [`StreamId`](crate::stream::StreamId): a handle to a
/// destroyed node stays invalid after its slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl MarkId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }
}

impl fmt::Debug for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkId({}@gen{})", self.idx, self.generation)
    }
}

/// Opaque default mark key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MarkKey(pub u64);

impl MarkKey {
    /// The key used when a caller has only one reason to redraw.
    pub const DEFAULT: Self = Self(0);
}

/// How long a self mark lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Until explicitly unmarked.
    Forever,
    /// Expires after this many ticks. `Frames(0)` behaves like `Frames(1)`.
    Frames(u32),
}

/// Notification kinds sent from a node to its subscribers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkEvent {
    /// The sender's total mark count grew.
    Marked,
    /// The sender's total mark count shrank.
    Unmarked,
}

/// A subscription edge returned by
/// [`MarkGraph::subscribe`](super::MarkGraph::subscribe).
///
/// Pass it to [`MarkGraph::cancel`](super::MarkGraph::cancel) to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    /// The node receiving notifications.
    pub subscriber: MarkId,
    /// The node sending them.
    pub source: MarkId,
}
