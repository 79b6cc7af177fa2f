// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use super::StreamId;

/// Errors from [`Scheduler::attach`](super::Scheduler::attach).
///
/// Every variant is an invariant violation on the caller's side; the tree is
/// left untouched when one is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachError {
    /// The handle refers to a stream that has been released.
    Stale(StreamId),
    /// The stream, or an ancestor of the target parent, is pending release.
    Deleted(StreamId),
    /// The child already has a parent (possibly via an attach still queued
    /// for the end of the current pass).
    AlreadyAttached(StreamId),
    /// The child is the parent itself or one of its ancestors.
    Cycle(StreamId),
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale(id) => write!(f, "{id:?} has been released"),
            Self::Deleted(id) => write!(f, "{id:?} is pending release"),
            Self::AlreadyAttached(id) => write!(f, "{id:?} already has a parent"),
            Self::Cycle(id) => write!(f, "attaching {id:?} would create a cycle"),
        }
    }
}

impl core::error::Error for AttachError {}
