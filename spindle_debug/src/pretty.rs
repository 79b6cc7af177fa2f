// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Durations
//! are simulated milliseconds, as produced by the clock.

use std::io::Write;

use spindle_core::trace::{
    FlushEvent, FrameEvent, FrameSummary, PassBeginEvent, PassEndEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    quiet_flushes: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("quiet_flushes", &self.quiet_flushes)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            quiet_flushes: true,
        }
    }

    /// Also prints flushes that applied no edits.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.quiet_flushes = false;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame(&mut self, e: &FrameEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] tick={} elapsed={:.1}ms steps={} backlog={:.1}ms",
            e.tick.0, e.elapsed_ms, e.steps, e.backlog_ms,
        );
        if e.dropped_ms > 0.0 {
            let _ = writeln!(
                self.writer,
                "[frame] tick={} dropped={:.1}ms (catch-up cap)",
                e.tick.0, e.dropped_ms,
            );
        }
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[pass:begin] tick={} step={} dt={:.1}ms",
            e.tick.0, e.step, e.dt,
        );
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        let _ = writeln!(
            self.writer,
            "[pass:end] tick={} step={} nodes={} jobs={}",
            e.tick.0, e.step, e.nodes_run, e.jobs_run,
        );
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        if self.quiet_flushes && e.attached == 0 && e.released == 0 {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[flush] tick={} step={} attached={} released={}",
            e.tick.0, e.step, e.attached, e.released,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] tick={} steps={} simulated={:.1}ms nodes={} jobs={} \
             attached={} released={} dropped={:.1}ms",
            s.tick.0,
            s.steps,
            s.simulated_ms,
            s.nodes_run,
            s.jobs_run,
            s.attached,
            s.released,
            s.dropped_ms,
        );
    }
}
