// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays stream storage, the pass walk, and deferred edits.

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::jobs::{JobId, Jobs};

use super::error::AttachError;
use super::id::{INVALID, StreamId};
use super::traverse::Children;

/// Signature of a stream callback.
///
/// Receives the scheduler (so it may edit the tree or run other streams), its
/// own handle, and the step size `dt` in milliseconds.
pub type StreamFn = dyn FnMut(&mut Scheduler, StreamId, f64);

type Callback = Rc<RefCell<StreamFn>>;

/// Construction options for [`Scheduler::create`].
///
/// ```
/// use spindle_core::stream::{Scheduler, StreamOptions};
///
/// let mut scheduler = Scheduler::new();
/// let id = scheduler.create(
///     StreamOptions::new()
///         .name("physics")
///         .stopped()
///         .callback(|_, _, _dt| {}),
/// );
/// assert!(!scheduler.is_active(id));
/// assert_eq!(scheduler.name(id), Some("physics"));
/// ```
#[must_use]
pub struct StreamOptions {
    name: Option<String>,
    active: bool,
    callback: Option<Callback>,
}

impl StreamOptions {
    /// Active, unnamed, with no callback.
    pub fn new() -> Self {
        Self {
            name: None,
            active: true,
            callback: None,
        }
    }

    /// Sets a diagnostic name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Creates the stream inactive; it is skipped until
    /// [`Scheduler::start`] is called.
    pub fn stopped(mut self) -> Self {
        self.active = false;
        self
    }

    /// Sets the per-pass callback.
    pub fn callback(mut self, f: impl FnMut(&mut Scheduler, StreamId, f64) + 'static) -> Self {
        self.callback = Some(Rc::new(RefCell::new(f)));
        self
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StreamOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamOptions")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct StreamFlags {
    active: bool,
    deleted: bool,
    executing: bool,
}

/// A structural edit captured during a pass.
#[derive(Debug)]
enum Edit {
    Attach {
        parent: StreamId,
        children: Vec<StreamId>,
    },
    Release(StreamId),
}

/// Counts of deferred edits applied by one flush.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Children appended to a parent's child list.
    pub attached: u32,
    /// Streams freed, counting every node of each released subtree.
    pub released: u32,
}

/// Result of one [`Scheduler::pass`] or [`Scheduler::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Callbacks invoked by the walk, including nested runs.
    pub nodes_run: u32,
    /// Deferred edits applied after the walk. Always empty for a nested run.
    pub flush: FlushStats,
}

/// The scheduling tree.
///
/// Streams are addressed by [`StreamId`] handles and occupy slots in
/// parallel arrays. Released streams are recycled via a free list, and
/// generation counters make every operation on a stale handle a no-op.
pub struct Scheduler {
    // -- Topology --
    parent: Vec<u32>,
    children: Vec<Vec<u32>>,

    // -- Per-stream state --
    callback: Vec<Option<Callback>>,
    flags: Vec<StreamFlags>,
    name: Vec<Option<String>>,
    teardown: Vec<Jobs>,

    // -- Allocation --
    generation: Vec<u32>,
    free_list: Vec<u32>,
    len: u32,

    // -- Pass state --
    processing_depth: u32,
    deferred: VecDeque<Edit>,
    nodes_run: u32,
    next_tick: Jobs,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("streams", &self.stream_count())
            .field("processing_depth", &self.processing_depth)
            .field("deferred", &self.deferred)
            .field("next_tick", &self.next_tick)
            .finish_non_exhaustive()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            children: Vec::new(),
            callback: Vec::new(),
            flags: Vec::new(),
            name: Vec::new(),
            teardown: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            processing_depth: 0,
            deferred: VecDeque::new(),
            nodes_run: 0,
            next_tick: Jobs::new(),
        }
    }

    // -- Allocation API --

    /// Creates a detached stream and returns its handle.
    pub fn create(&mut self, options: StreamOptions) -> StreamId {
        let flags = StreamFlags {
            active: options.active,
            ..StreamFlags::default()
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.children[i].clear();
            self.callback[i] = options.callback;
            self.flags[i] = flags;
            self.name[i] = options.name;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.children.push(Vec::new());
            self.callback.push(options.callback);
            self.flags.push(flags);
            self.name.push(options.name);
            self.teardown.push(Jobs::new());
            self.generation.push(0);
            idx
        };
        self.id_at(idx)
    }

    /// Creates a stream and attaches it under `parent`.
    ///
    /// On error the new stream is released again.
    pub fn spawn(
        &mut self,
        parent: StreamId,
        options: StreamOptions,
    ) -> Result<StreamId, AttachError> {
        let id = self.create(options);
        match self.attach(parent, &[id]) {
            Ok(_) => Ok(id),
            Err(err) => {
                self.free_subtree(id.idx);
                Err(err)
            }
        }
    }

    /// Returns whether the given handle refers to a live stream.
    ///
    /// A stream pending release (see [`is_deleted`](Self::is_deleted)) is
    /// still alive until the release is applied.
    #[must_use]
    pub fn is_alive(&self, id: StreamId) -> bool {
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    /// Returns the number of live streams.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    pub(crate) fn id_at(&self, idx: u32) -> StreamId {
        StreamId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Topology API --

    /// Attaches `children`, in order, as the last children of `parent`.
    ///
    /// Parent pointers are set immediately. The child-list edit is applied
    /// immediately when no pass is running, otherwise queued until the
    /// outermost pass returns. Returns the attached handles.
    ///
    /// Validation happens before any change: if one child is rejected,
    /// nothing is attached.
    pub fn attach(
        &mut self,
        parent: StreamId,
        children: &[StreamId],
    ) -> Result<Vec<StreamId>, AttachError> {
        self.check_attachable_parent(parent)?;
        for (n, &child) in children.iter().enumerate() {
            if !self.is_alive(child) {
                return Err(AttachError::Stale(child));
            }
            if self.flags[child.idx as usize].deleted {
                return Err(AttachError::Deleted(child));
            }
            if self.parent[child.idx as usize] != INVALID || children[..n].contains(&child) {
                return Err(AttachError::AlreadyAttached(child));
            }
            if self.is_ancestor_or_self(child.idx, parent.idx) {
                return Err(AttachError::Cycle(child));
            }
        }

        for child in children {
            self.parent[child.idx as usize] = parent.idx;
        }
        let children = children.to_vec();
        if self.processing_depth > 0 {
            self.deferred.push_back(Edit::Attach {
                parent,
                children: children.clone(),
            });
        } else {
            self.apply_attach(parent, &children);
        }
        Ok(children)
    }

    /// Detaches a stream from its parent and releases its subtree.
    ///
    /// The stream is flagged deleted at once, so it and its subtree are
    /// skipped by the rest of the current pass; removal is queued when a pass
    /// is running. No-op for a stale handle, a root, or a stream already
    /// pending release.
    pub fn detach(&mut self, id: StreamId) {
        if !self.is_alive(id) || self.parent[id.idx as usize] == INVALID {
            return;
        }
        self.request_release(id);
    }

    /// Releases a stream and its subtree, whether or not it has a parent.
    ///
    /// Same deferral rules as [`detach`](Self::detach).
    pub fn destroy(&mut self, id: StreamId) {
        if !self.is_alive(id) {
            return;
        }
        self.request_release(id);
    }

    /// Returns the parent of `id`, or `None` for a root or stale handle.
    ///
    /// Reflects queued attaches: the parent is known as soon as
    /// [`attach`](Self::attach) returns.
    #[must_use]
    pub fn parent(&self, id: StreamId) -> Option<StreamId> {
        if !self.is_alive(id) {
            return None;
        }
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Iterates the children of `id` in pass order.
    ///
    /// Empty for a stale handle.
    pub fn children(&self, id: StreamId) -> Children<'_> {
        let slice: &[u32] = if self.is_alive(id) {
            &self.children[id.idx as usize]
        } else {
            &[]
        };
        Children::new(self, slice)
    }

    // -- Flags and properties --

    /// Makes a stream participate in passes again.
    pub fn start(&mut self, id: StreamId) {
        if self.is_alive(id) {
            self.flags[id.idx as usize].active = true;
        }
    }

    /// Skips a stream and its subtree in subsequent passes.
    ///
    /// Stopping a stream from its own callback skips its children for the
    /// rest of the current pass.
    pub fn stop(&mut self, id: StreamId) {
        if self.is_alive(id) {
            self.flags[id.idx as usize].active = false;
        }
    }

    /// Returns `true` if the stream is live and active.
    #[must_use]
    pub fn is_active(&self, id: StreamId) -> bool {
        self.is_alive(id) && self.flags[id.idx as usize].active
    }

    /// Returns `true` if the stream is live but pending release.
    #[must_use]
    pub fn is_deleted(&self, id: StreamId) -> bool {
        self.is_alive(id) && self.flags[id.idx as usize].deleted
    }

    /// Returns `true` while the stream's callback, or a descendant's, runs.
    #[must_use]
    pub fn is_executing(&self, id: StreamId) -> bool {
        self.is_alive(id) && self.flags[id.idx as usize].executing
    }

    /// Returns the diagnostic name, if any.
    #[must_use]
    pub fn name(&self, id: StreamId) -> Option<&str> {
        if !self.is_alive(id) {
            return None;
        }
        self.name[id.idx as usize].as_deref()
    }

    /// Replaces the per-pass callback.
    ///
    /// A callback replacing itself takes effect from the next pass.
    pub fn set_callback(
        &mut self,
        id: StreamId,
        f: impl FnMut(&mut Self, StreamId, f64) + 'static,
    ) {
        if self.is_alive(id) {
            self.callback[id.idx as usize] = Some(Rc::new(RefCell::new(f)));
        }
    }

    /// Removes the per-pass callback; children still run.
    pub fn clear_callback(&mut self, id: StreamId) {
        if self.is_alive(id) {
            self.callback[id.idx as usize] = None;
        }
    }

    // -- Jobs --

    /// Registers a job run when the stream is released.
    ///
    /// Returns `None` for a stale handle.
    pub fn on_teardown(&mut self, id: StreamId, job: impl FnOnce() + 'static) -> Option<JobId> {
        if !self.is_alive(id) {
            return None;
        }
        Some(self.teardown[id.idx as usize].add(job))
    }

    /// Queues a job for the start of the next pass driven by
    /// [`Runtime`](crate::runtime::Runtime), or the next
    /// [`run_next_tick_jobs`](Self::run_next_tick_jobs) call.
    pub fn next_tick(&mut self, job: impl FnOnce() + 'static) -> JobId {
        self.next_tick.add(job)
    }

    /// Withdraws a queued next-tick job.
    pub fn cancel_next_tick(&mut self, id: JobId) -> bool {
        self.next_tick.remove(id)
    }

    /// Runs and clears the queued next-tick jobs, returning how many ran.
    ///
    /// Jobs queued while these run wait for the following call.
    pub fn run_next_tick_jobs(&mut self) -> usize {
        self.next_tick.run()
    }

    // -- Passes --

    /// Returns how many callbacks are currently on the stack.
    #[must_use]
    pub fn processing_depth(&self) -> u32 {
        self.processing_depth
    }

    /// Returns `true` while any pass is running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing_depth > 0
    }

    /// Returns the number of edits queued for the end of the current pass.
    #[must_use]
    pub fn pending_edits(&self) -> usize {
        self.deferred.len()
    }

    /// Runs one pass over the subtree rooted at `id`.
    ///
    /// Equivalent to [`pass`](Self::pass) with an empty hook.
    pub fn run(&mut self, id: StreamId, dt: f64) -> PassReport {
        self.pass_with(id, dt, None::<fn(&mut Self)>)
    }

    /// Runs one pass over the subtree rooted at `id`, then `after_walk`,
    /// then flushes deferred edits.
    ///
    /// The walk is depth-first pre-order. Inactive or deleted streams are
    /// skipped with their subtrees, and so is a stream whose callback is
    /// already on the stack. A callback that stops or releases its own
    /// stream skips its children for this pass.
    ///
    /// Called from inside a callback, only the walk happens: `after_walk` is
    /// dropped and queued edits wait for the outermost pass to finish. Use
    /// [`run`](Self::run) for nested passes.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if called from inside a callback.
    ///
    /// Propagates panics from callbacks. The processing depth and
    /// `executing` flags are restored during unwinding; edits queued before
    /// the panic are applied by the next completed outermost pass.
    pub fn pass(
        &mut self,
        id: StreamId,
        dt: f64,
        after_walk: impl FnOnce(&mut Self),
    ) -> PassReport {
        debug_assert!(
            self.processing_depth == 0,
            "pass hook would be dropped inside a callback; use `run`"
        );
        self.pass_with(id, dt, Some(after_walk))
    }

    fn pass_with(
        &mut self,
        id: StreamId,
        dt: f64,
        after_walk: Option<impl FnOnce(&mut Self)>,
    ) -> PassReport {
        let outermost = self.processing_depth == 0;
        let start = self.nodes_run;
        self.walk(id, dt);
        if !outermost {
            return PassReport {
                nodes_run: self.nodes_run.wrapping_sub(start),
                flush: FlushStats::default(),
            };
        }
        if let Some(after_walk) = after_walk {
            after_walk(self);
        }
        let flush = self.flush();
        PassReport {
            nodes_run: self.nodes_run.wrapping_sub(start),
            flush,
        }
    }

    /// Applies queued edits in request order.
    ///
    /// Does nothing while a pass is running.
    pub fn flush(&mut self) -> FlushStats {
        let mut stats = FlushStats::default();
        if self.processing_depth > 0 {
            return stats;
        }
        while let Some(edit) = self.deferred.pop_front() {
            match edit {
                Edit::Attach { parent, children } => {
                    stats.attached += self.apply_attach(parent, &children);
                }
                Edit::Release(id) => stats.released += self.apply_release(id),
            }
        }
        stats
    }

    fn walk(&mut self, id: StreamId, dt: f64) {
        if !self.is_alive(id) {
            return;
        }
        let i = id.idx as usize;
        let flags = self.flags[i];
        if !flags.active || flags.deleted || flags.executing {
            return;
        }

        let callback = self.callback[i].clone();
        let mut guard = PassGuard::enter(self, id.idx);
        if let Some(callback) = callback {
            let mut f = callback.borrow_mut();
            (&mut *f)(&mut *guard, id, dt);
        }

        let flags = guard.flags[i];
        if !flags.active || flags.deleted {
            return;
        }
        // Indexed loop: callbacks may change flags but never this list.
        let mut n = 0;
        while let Some(&child) = guard.children[i].get(n) {
            let child = guard.id_at(child);
            guard.walk(child, dt);
            n += 1;
        }
    }

    // -- Edit application --

    fn request_release(&mut self, id: StreamId) {
        let i = id.idx as usize;
        if self.flags[i].deleted {
            return;
        }
        self.flags[i].deleted = true;
        if self.processing_depth > 0 {
            self.deferred.push_back(Edit::Release(id));
        } else {
            self.apply_release(id);
        }
    }

    fn apply_attach(&mut self, parent: StreamId, children: &[StreamId]) -> u32 {
        let mut attached = 0;
        for &child in children {
            if !self.is_alive(child) || self.parent[child.idx as usize] != parent.idx {
                continue;
            }
            if !self.is_alive(parent) {
                // Parent released while the attach was queued.
                self.parent[child.idx as usize] = INVALID;
                continue;
            }
            self.children[parent.idx as usize].push(child.idx);
            attached += 1;
        }
        attached
    }

    fn apply_release(&mut self, id: StreamId) -> u32 {
        if !self.is_alive(id) {
            return 0;
        }
        let p = self.parent[id.idx as usize];
        if p != INVALID {
            self.children[p as usize].retain(|&c| c != id.idx);
        }
        self.free_subtree(id.idx)
    }

    /// Frees `idx` and its descendants, children first, running each
    /// stream's teardown jobs. Returns the number of streams freed.
    fn free_subtree(&mut self, idx: u32) -> u32 {
        let i = idx as usize;
        let mut freed = 0;
        for child in core::mem::take(&mut self.children[i]) {
            freed += self.free_subtree(child);
        }
        let mut teardown = core::mem::take(&mut self.teardown[i]);
        self.parent[i] = INVALID;
        self.callback[i] = None;
        self.name[i] = None;
        self.flags[i] = StreamFlags::default();
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(idx);
        teardown.run();
        freed + 1
    }

    // -- Validation --

    fn check_attachable_parent(&self, parent: StreamId) -> Result<(), AttachError> {
        if !self.is_alive(parent) {
            return Err(AttachError::Stale(parent));
        }
        let mut cursor = parent.idx;
        while cursor != INVALID {
            if self.flags[cursor as usize].deleted {
                return Err(AttachError::Deleted(self.id_at(cursor)));
            }
            cursor = self.parent[cursor as usize];
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: u32, mut idx: u32) -> bool {
        while idx != INVALID {
            if idx == candidate {
                return true;
            }
            idx = self.parent[idx as usize];
        }
        false
    }
}

/// Scope guard for one callback invocation.
///
/// Holds the processing depth and the stream's `executing` flag for as long
/// as the callback and its subtree run, and restores both on drop, including
/// during unwinding.
struct PassGuard<'a> {
    scheduler: &'a mut Scheduler,
    idx: u32,
}

impl<'a> PassGuard<'a> {
    fn enter(scheduler: &'a mut Scheduler, idx: u32) -> Self {
        scheduler.processing_depth += 1;
        scheduler.flags[idx as usize].executing = true;
        scheduler.nodes_run = scheduler.nodes_run.wrapping_add(1);
        Self { scheduler, idx }
    }
}

impl Deref for PassGuard<'_> {
    type Target = Scheduler;

    fn deref(&self) -> &Scheduler {
        self.scheduler
    }
}

impl DerefMut for PassGuard<'_> {
    fn deref_mut(&mut self) -> &mut Scheduler {
        self.scheduler
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.processing_depth -= 1;
        // The slot cannot be freed while its callback runs: releases are
        // deferred while the depth is non-zero.
        self.scheduler.flags[self.idx as usize].executing = false;
    }
}
