// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ordered registry of deferred zero-argument jobs.
//!
//! [`Jobs`] backs the once-per-tick queue on the
//! [`Scheduler`](crate::stream::Scheduler) and the teardown hooks attached to
//! stream and mark nodes. Jobs run in insertion order and are consumed by
//! [`Jobs::run`]; individual jobs can be withdrawn with the [`JobId`] returned
//! when they were added.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// Handle to a job registered in a [`Jobs`] list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

/// A boxed job.
pub type Job = Box<dyn FnOnce()>;

/// An ordered list of pending jobs.
pub struct Jobs {
    jobs: Vec<(JobId, Job)>,
    next_id: u64,
}

impl fmt::Debug for Jobs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jobs")
            .field("len", &self.jobs.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl Default for Jobs {
    fn default() -> Self {
        Self::new()
    }
}

impl Jobs {
    /// Creates an empty job list.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 0,
        }
    }

    /// Appends a job and returns its handle.
    pub fn add(&mut self, job: impl FnOnce() + 'static) -> JobId {
        let id = JobId(self.next_id);
        self.next_id += 1;
        self.jobs.push((id, Box::new(job)));
        id
    }

    /// Appends every job from `jobs`, in order, returning their handles.
    pub fn add_all(&mut self, jobs: impl IntoIterator<Item = Job>) -> Vec<JobId> {
        jobs.into_iter().map(|job| self.add(job)).collect()
    }

    /// Withdraws a pending job without running it.
    ///
    /// Returns `false` if the job already ran or was never registered here.
    pub fn remove(&mut self, id: JobId) -> bool {
        let before = self.jobs.len();
        self.jobs.retain(|(job_id, _)| *job_id != id);
        self.jobs.len() != before
    }

    /// Runs every pending job in insertion order and empties the list.
    ///
    /// Returns the number of jobs that ran.
    pub fn run(&mut self) -> usize {
        let jobs = core::mem::take(&mut self.jobs);
        let count = jobs.len();
        for (_, job) in jobs {
            job();
        }
        count
    }

    /// Drops every pending job without running it.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }

    /// Returns the number of pending jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` if no jobs are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;

    fn log() -> Rc<RefCell<Vec<u32>>> {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn run_is_ordered_and_clears() {
        let seen = log();
        let mut jobs = Jobs::new();
        for n in 0..3 {
            let seen = Rc::clone(&seen);
            jobs.add(move || seen.borrow_mut().push(n));
        }

        assert_eq!(jobs.run(), 3);
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
        assert!(jobs.is_empty(), "run consumes the queue");
        assert_eq!(jobs.run(), 0, "second run has nothing to do");
    }

    #[test]
    fn removed_job_does_not_run() {
        let seen = log();
        let mut jobs = Jobs::new();
        let s1 = Rc::clone(&seen);
        let first = jobs.add(move || s1.borrow_mut().push(1));
        let s2 = Rc::clone(&seen);
        jobs.add(move || s2.borrow_mut().push(2));

        assert!(jobs.remove(first));
        assert!(!jobs.remove(first), "second removal is a no-op");
        jobs.run();
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn add_all_returns_one_handle_per_job() {
        let seen = log();
        let mut jobs = Jobs::new();
        let batch: Vec<Job> = (10..13)
            .map(|n| {
                let seen = Rc::clone(&seen);
                Box::new(move || seen.borrow_mut().push(n)) as Job
            })
            .collect();

        let ids = jobs.add_all(batch);
        assert_eq!(ids.len(), 3);
        jobs.remove(ids[1]);
        jobs.run();
        assert_eq!(*seen.borrow(), vec![10, 12]);
    }

    #[test]
    fn clear_drops_without_running() {
        let seen = log();
        let mut jobs = Jobs::new();
        let s = Rc::clone(&seen);
        jobs.add(move || s.borrow_mut().push(1));
        jobs.clear();
        assert_eq!(jobs.run(), 0);
        assert!(seen.borrow().is_empty());
    }
}
