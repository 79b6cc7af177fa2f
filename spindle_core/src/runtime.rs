// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame loop: clock, scheduler, and tick identity wired together.
//!
//! [`Runtime`] owns a [`Clock`], a [`Scheduler`] with a single root stream,
//! and the current [`TickId`]. Each external trigger calls
//! [`Runtime::frame`] (elapsed milliseconds) or [`Runtime::frame_at`] (a
//! monotonic timestamp). For every step the clock produces, one pass runs:
//!
//! 1. next-tick jobs queued with [`Scheduler::next_tick`];
//! 2. the walk of the root stream's subtree;
//! 3. the application `update` hook;
//! 4. the flush of structural edits queued during the pass.
//!
//! The tick id advances once per trigger, before any pass, even when the
//! trigger carries no elapsed time.

use crate::clock::{Clock, ClockConfig, Steps, TickId};
use crate::jobs::JobId;
use crate::stream::{AttachError, Scheduler, StreamId, StreamOptions};
use crate::time::{HostTime, Timebase};
use crate::trace::{
    FlushEvent, FrameEvent, FrameSummary, FrameSummaryBuilder, PassBeginEvent, PassEndEvent,
    Tracer,
};

/// What one trigger did. Identical to the [`FrameSummary`] delivered to the
/// trace sink.
pub type FrameReport = FrameSummary;

/// Owns the clock, the scheduling tree, and the tick counter.
#[derive(Debug)]
pub struct Runtime {
    clock: Clock,
    scheduler: Scheduler,
    root: StreamId,
    tick: TickId,
}

impl Runtime {
    /// Creates a runtime whose [`frame_at`](Self::frame_at) timestamps are
    /// nanosecond ticks.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid (see [`Clock::new`]).
    #[must_use]
    pub fn new(config: ClockConfig) -> Self {
        Self::with_timebase(config, Timebase::NANOS)
    }

    /// Creates a runtime that interprets [`frame_at`](Self::frame_at)
    /// timestamps with the given timebase.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid (see [`Clock::new`]).
    #[must_use]
    pub fn with_timebase(config: ClockConfig, timebase: Timebase) -> Self {
        let mut scheduler = Scheduler::new();
        let root = scheduler.create(StreamOptions::new().name("root"));
        Self {
            clock: Clock::with_timebase(config, timebase),
            scheduler,
            root,
            tick: TickId::default(),
        }
    }

    /// Returns the root stream every pass walks.
    #[must_use]
    pub fn root(&self) -> StreamId {
        self.root
    }

    /// Returns the id of the most recent trigger.
    #[must_use]
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Returns the clock.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns the clock mutably, e.g. to [`reset`](Clock::reset) it after a
    /// pause.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Returns the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Returns the scheduler mutably.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Creates a stream under the root.
    pub fn spawn(&mut self, options: StreamOptions) -> Result<StreamId, AttachError> {
        self.scheduler.spawn(self.root, options)
    }

    /// Queues a job for the start of the next pass.
    pub fn next_tick(&mut self, job: impl FnOnce() + 'static) -> JobId {
        self.scheduler.next_tick(job)
    }

    /// Handles one trigger that reports `elapsed_ms` since the previous one.
    pub fn frame(
        &mut self,
        elapsed_ms: f64,
        tracer: &mut Tracer<'_>,
        update: impl FnMut(&mut Scheduler, TickId, f64),
    ) -> FrameReport {
        self.tick = self.tick.next();
        let steps = self.clock.next_steps(elapsed_ms);
        self.run_steps(steps, tracer, update)
    }

    /// Handles one trigger stamped with a monotonic host timestamp.
    ///
    /// The first call has no reference point and counts as zero elapsed time.
    pub fn frame_at(
        &mut self,
        now: HostTime,
        tracer: &mut Tracer<'_>,
        update: impl FnMut(&mut Scheduler, TickId, f64),
    ) -> FrameReport {
        self.tick = self.tick.next();
        let steps = self.clock.advance(now);
        self.run_steps(steps, tracer, update)
    }

    fn run_steps(
        &mut self,
        steps: Steps,
        tracer: &mut Tracer<'_>,
        mut update: impl FnMut(&mut Scheduler, TickId, f64),
    ) -> FrameReport {
        let tick = self.tick;
        let frame = FrameEvent {
            tick,
            elapsed_ms: self.clock.backlog() + self.clock.dropped(),
            steps: steps.remaining_steps(),
            backlog_ms: self.clock.backlog(),
            dropped_ms: self.clock.dropped(),
        };
        tracer.frame(&frame);
        let mut summary = FrameSummaryBuilder::new(&frame);

        for (step, dt) in (0..).zip(steps) {
            tracer.pass_begin(&PassBeginEvent { tick, step, dt });
            let jobs_run = u32::try_from(self.scheduler.run_next_tick_jobs()).unwrap_or(u32::MAX);
            let report = self
                .scheduler
                .pass(self.root, dt, |scheduler| update(scheduler, tick, dt));

            let flush = FlushEvent {
                tick,
                step,
                attached: report.flush.attached,
                released: report.flush.released,
            };
            tracer.flush(&flush);
            summary.record_flush(&flush);

            let end = PassEndEvent {
                tick,
                step,
                dt,
                nodes_run: report.nodes_run,
                jobs_run,
            };
            tracer.pass_end(&end);
            summary.record_pass(&end);
        }

        let summary = summary.finish();
        tracer.frame_summary(&summary);
        summary
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(ClockConfig::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use super::*;
    use crate::marks::{Lifetime, MarkGraph, MarkKey};

    fn no_update(_: &mut Scheduler, _: TickId, _: f64) {}

    #[test]
    fn zero_elapsed_trigger_still_advances_tick() {
        let mut rt = Runtime::default();
        let report = rt.frame(0.0, &mut Tracer::none(), no_update);
        assert_eq!(rt.tick(), TickId(1));
        assert_eq!(report.steps, 1, "one zero-length pass");
        assert_eq!(report.simulated_ms, 0.0);
        rt.frame(0.0, &mut Tracer::none(), no_update);
        assert_eq!(rt.tick(), TickId(2));
    }

    #[test]
    fn each_step_walks_then_updates() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut rt = Runtime::new(ClockConfig::catch_up(60.0, 4));
        let o = Rc::clone(&order);
        rt.spawn(StreamOptions::new().callback(move |_, _, dt| o.borrow_mut().push(("walk", dt))))
            .unwrap();

        rt.frame(190.0, &mut Tracer::none(), no_update);
        order.borrow_mut().clear();

        let o = Rc::clone(&order);
        let report = rt.frame(16.0, &mut Tracer::none(), |_, _, dt| {
            o.borrow_mut().push(("update", dt));
        });
        assert_eq!(report.steps, 4);
        assert_eq!(report.simulated_ms, 190.0);
        assert_eq!(
            *order.borrow(),
            vec![
                ("walk", 60.0),
                ("update", 60.0),
                ("walk", 60.0),
                ("update", 60.0),
                ("walk", 60.0),
                ("update", 60.0),
                ("walk", 10.0),
                ("update", 10.0),
            ]
        );
    }

    #[test]
    fn detach_mid_pass_is_reported_by_frame() {
        let mut rt = Runtime::default();
        let runs = Rc::new(Cell::new(0));
        let r = Rc::clone(&runs);
        rt.spawn(StreamOptions::new().callback(move |s, me, _| {
            r.set(r.get() + 1);
            s.detach(me);
        }))
        .unwrap();

        let report = rt.frame(16.0, &mut Tracer::none(), no_update);
        assert_eq!(report.released, 1);
        assert_eq!(report.nodes_run, 2, "root plus the detaching stream");
        rt.frame(16.0, &mut Tracer::none(), no_update);
        assert_eq!(runs.get(), 1);
        assert_eq!(rt.scheduler().children(rt.root()).count(), 0);
    }

    #[test]
    fn update_hook_runs_are_counted_in_the_report() {
        let mut rt = Runtime::default();
        rt.spawn(StreamOptions::new()).unwrap();
        let overlay = rt.scheduler_mut().create(StreamOptions::new().name("overlay"));

        let report = rt.frame(16.0, &mut Tracer::none(), |scheduler, _, dt| {
            scheduler.run(overlay, dt);
        });
        assert_eq!(report.nodes_run, 3, "root, its child, and the overlay");
    }

    #[test]
    fn next_tick_jobs_run_before_the_walk() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut rt = Runtime::default();
        let o = Rc::clone(&order);
        rt.spawn(StreamOptions::new().callback(move |_, _, _| o.borrow_mut().push("walk")))
            .unwrap();
        let o = Rc::clone(&order);
        rt.next_tick(move || o.borrow_mut().push("job"));

        let report = rt.frame(16.0, &mut Tracer::none(), no_update);
        assert_eq!(report.jobs_run, 1);
        assert_eq!(*order.borrow(), vec!["job", "walk"]);
    }

    #[test]
    fn frame_at_measures_host_time() {
        let mut rt = Runtime::with_timebase(ClockConfig::catch_up(16.0, 8), Timebase::MICROS);
        rt.frame_at(HostTime(0), &mut Tracer::none(), no_update);
        rt.frame_at(HostTime(40_000), &mut Tracer::none(), no_update);
        let report = rt.frame_at(HostTime(56_000), &mut Tracer::none(), no_update);
        assert_eq!(report.steps, 3, "40 ms backlog → 16 + 16 + 8");
        assert_eq!(report.simulated_ms, 40.0);
        assert_eq!(rt.clock().backlog(), 16.0);
    }

    #[test]
    fn marks_redraw_once_per_trigger() {
        let graph = Rc::new(RefCell::new(MarkGraph::new()));
        let node = graph.borrow_mut().create();
        graph
            .borrow_mut()
            .mark(node, MarkKey::DEFAULT, Lifetime::Frames(2));
        let draws = Rc::new(Cell::new(0));

        let mut rt = Runtime::new(ClockConfig::catch_up(10.0, 4));
        rt.frame(40.0, &mut Tracer::none(), no_update);
        for _ in 0..3 {
            let g = Rc::clone(&graph);
            let d = Rc::clone(&draws);
            rt.frame(40.0, &mut Tracer::none(), move |_, tick, _| {
                let d = Rc::clone(&d);
                g.borrow_mut()
                    .redraw_if_needed(node, tick, move || d.set(d.get() + 1));
            });
        }
        assert_eq!(draws.get(), 2, "four passes per trigger, one draw each");
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_sees_frame_passes_and_summary() {
        use crate::trace::TraceSink;

        #[derive(Default)]
        struct Recording {
            events: Vec<&'static str>,
            summary: Option<FrameSummary>,
        }
        impl TraceSink for Recording {
            fn on_frame(&mut self, _: &FrameEvent) {
                self.events.push("frame");
            }
            fn on_pass_begin(&mut self, _: &PassBeginEvent) {
                self.events.push("begin");
            }
            fn on_flush(&mut self, _: &FlushEvent) {
                self.events.push("flush");
            }
            fn on_pass_end(&mut self, _: &PassEndEvent) {
                self.events.push("end");
            }
            fn on_frame_summary(&mut self, s: &FrameSummary) {
                self.events.push("summary");
                self.summary = Some(*s);
            }
        }

        let mut rt = Runtime::new(ClockConfig::catch_up(60.0, 2));
        rt.frame(100.0, &mut Tracer::none(), no_update);
        let mut sink = Recording::default();
        let report = rt.frame(16.0, &mut Tracer::new(&mut sink), no_update);
        assert_eq!(
            sink.events,
            vec!["frame", "begin", "flush", "end", "begin", "flush", "end", "summary"]
        );
        assert_eq!(sink.summary, Some(report));
        assert_eq!(report.tick, TickId(2));
    }
}
