// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use core::slice;

use super::id::StreamId;
use super::scheduler::Scheduler;

/// An iterator over the direct children of a stream, in pass order.
///
/// Created by [`Scheduler::children`]. Children whose attach is still queued
/// for the end of the current pass are not included.
#[derive(Debug)]
pub struct Children<'a> {
    scheduler: &'a Scheduler,
    inner: slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(scheduler: &'a Scheduler, children: &'a [u32]) -> Self {
        Self {
            scheduler,
            inner: children.iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = StreamId;

    fn next(&mut self) -> Option<StreamId> {
        let idx = *self.inner.next()?;
        Some(self.scheduler.id_at(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}
