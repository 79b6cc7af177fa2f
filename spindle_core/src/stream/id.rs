// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stream identity.

use core::fmt;

/// Sentinel for "no stream" in index fields.
pub(crate) const INVALID: u32 = u32::MAX;

/// A handle to a stream in a [`Scheduler`](super::Scheduler).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a stream is released and its slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl StreamId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({}@gen{})", self.idx, self.generation)
    }
}
