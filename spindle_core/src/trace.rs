// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`Runtime::frame`](crate::runtime::Runtime::frame) calls at each stage.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] accumulates per-pass counters during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! Event order for one frame:
//!
//! ```text
//! frame
//!   pass_begin(step 0)  flush(step 0)  pass_end(step 0)
//!   pass_begin(step 1)  flush(step 1)  pass_end(step 1)
//!   ...
//! frame_summary
//! ```

use crate::clock::TickId;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted once per external trigger, after the clock has computed its steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameEvent {
    /// Identifier of this trigger.
    pub tick: TickId,
    /// Wall-clock time reported since the previous trigger, in milliseconds.
    pub elapsed_ms: f64,
    /// Number of passes this trigger will run.
    pub steps: u32,
    /// Backlog carried to the next trigger, in milliseconds.
    pub backlog_ms: f64,
    /// Elapsed time discarded by the catch-up cap, in milliseconds.
    pub dropped_ms: f64,
}

/// Marks the beginning of one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassBeginEvent {
    /// Trigger this pass belongs to.
    pub tick: TickId,
    /// Zero-based step index within the trigger.
    pub step: u32,
    /// Step size in milliseconds.
    pub dt: f64,
}

/// Marks the end of one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassEndEvent {
    /// Trigger this pass belongs to.
    pub tick: TickId,
    /// Zero-based step index within the trigger.
    pub step: u32,
    /// Step size in milliseconds.
    pub dt: f64,
    /// Stream callbacks invoked by the walk.
    pub nodes_run: u32,
    /// Next-tick jobs run before the walk.
    pub jobs_run: u32,
}

/// Emitted after a pass applies its deferred structural edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushEvent {
    /// Trigger this pass belongs to.
    pub tick: TickId,
    /// Zero-based step index within the trigger.
    pub step: u32,
    /// Children appended by queued attaches.
    pub attached: u32,
    /// Streams freed by queued detaches and destroys.
    pub released: u32,
}

/// Per-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSummary {
    /// Identifier of the trigger.
    pub tick: TickId,
    /// Number of passes run.
    pub steps: u32,
    /// Sum of the step sizes, in milliseconds.
    pub simulated_ms: f64,
    /// Stream callbacks invoked across all passes.
    pub nodes_run: u32,
    /// Next-tick jobs run across all passes.
    pub jobs_run: u32,
    /// Deferred attaches applied across all passes.
    pub attached: u32,
    /// Streams released by deferred edits across all passes.
    pub released: u32,
    /// Elapsed time discarded by the catch-up cap, in milliseconds.
    pub dropped_ms: f64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called once per trigger, before any pass.
    fn on_frame(&mut self, e: &FrameEvent) {
        _ = e;
    }

    /// Called before a pass runs next-tick jobs and walks the tree.
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        _ = e;
    }

    /// Called after a pass has walked the tree.
    fn on_pass_end(&mut self, e: &PassEndEvent) {
        _ = e;
    }

    /// Called after a pass has flushed its deferred edits.
    fn on_flush(&mut self, e: &FlushEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameEvent`].
    #[inline]
    pub fn frame(&mut self, e: &FrameEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassBeginEvent`].
    #[inline]
    pub fn pass_begin(&mut self, e: &PassBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassEndEvent`].
    #[inline]
    pub fn pass_end(&mut self, e: &PassEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FlushEvent`].
    #[inline]
    pub fn flush(&mut self, e: &FlushEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_flush(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Accumulates pass and flush events during a frame and produces a
/// [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame: FrameEvent,
    steps: u32,
    simulated_ms: f64,
    nodes_run: u32,
    jobs_run: u32,
    attached: u32,
    released: u32,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(frame: &FrameEvent) -> Self {
        Self {
            frame: *frame,
            steps: 0,
            simulated_ms: 0.0,
            nodes_run: 0,
            jobs_run: 0,
            attached: 0,
            released: 0,
        }
    }

    /// Records a finished pass.
    pub fn record_pass(&mut self, e: &PassEndEvent) {
        self.steps += 1;
        self.simulated_ms += e.dt;
        self.nodes_run += e.nodes_run;
        self.jobs_run += e.jobs_run;
    }

    /// Records a flush.
    pub fn record_flush(&mut self, e: &FlushEvent) {
        self.attached += e.attached;
        self.released += e.released;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            tick: self.frame.tick,
            steps: self.steps,
            simulated_ms: self.simulated_ms,
            nodes_run: self.nodes_run,
            jobs_run: self.jobs_run,
            attached: self.attached,
            released: self.released,
            dropped_ms: self.frame.dropped_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> FrameEvent {
        FrameEvent {
            tick: TickId(42),
            elapsed_ms: 190.0,
            steps: 2,
            backlog_ms: 60.0,
            dropped_ms: 130.0,
        }
    }

    fn pass_end(step: u32, dt: f64, nodes_run: u32) -> PassEndEvent {
        PassEndEvent {
            tick: TickId(42),
            step,
            dt,
            nodes_run,
            jobs_run: 1,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_frame(&sample_frame());
        sink.on_pass_end(&pass_end(0, 16.0, 3));
        sink.on_frame_summary(&FrameSummaryBuilder::new(&sample_frame()).finish());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame(&sample_frame());
        tracer.pass_begin(&PassBeginEvent {
            tick: TickId(42),
            step: 0,
            dt: 16.0,
        });
    }

    #[test]
    fn summary_builder_accumulates_passes() {
        let mut builder = FrameSummaryBuilder::new(&sample_frame());
        builder.record_pass(&pass_end(0, 60.0, 4));
        builder.record_flush(&FlushEvent {
            tick: TickId(42),
            step: 0,
            attached: 2,
            released: 0,
        });
        builder.record_pass(&pass_end(1, 10.0, 5));
        builder.record_flush(&FlushEvent {
            tick: TickId(42),
            step: 1,
            attached: 0,
            released: 3,
        });

        let summary = builder.finish();
        assert_eq!(summary.tick, TickId(42));
        assert_eq!(summary.steps, 2);
        assert_eq!(summary.simulated_ms, 70.0);
        assert_eq!(summary.nodes_run, 9);
        assert_eq!(summary.jobs_run, 2);
        assert_eq!(summary.attached, 2);
        assert_eq!(summary.released, 3);
        assert_eq!(summary.dropped_ms, 130.0);
    }

    #[test]
    fn summary_builder_without_passes_is_empty() {
        let summary = FrameSummaryBuilder::new(&sample_frame()).finish();
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.simulated_ms, 0.0);
        assert_eq!(summary.nodes_run, 0);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            ticks: Vec<u64>,
            flushes: u32,
        }
        impl TraceSink for RecordingSink {
            fn on_frame(&mut self, e: &FrameEvent) {
                self.ticks.push(e.tick.0);
            }
            fn on_flush(&mut self, e: &FlushEvent) {
                self.flushes += e.attached;
            }
        }

        let mut sink = RecordingSink {
            ticks: Vec::new(),
            flushes: 0,
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame(&sample_frame());
        tracer.flush(&FlushEvent {
            tick: TickId(42),
            step: 0,
            attached: 3,
            released: 0,
        });
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.ticks, &[42]);
        assert_eq!(sink.flushes, 3);
    }
}
