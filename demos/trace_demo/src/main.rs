// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated frame loop that exercises scheduling, redraw marks, and the
//! tracing pipeline.
//!
//! Drives 60 synthetic display refreshes (with one long stall) through a
//! [`Runtime`](spindle_core::runtime::Runtime), recording events to both a
//! [`PrettyPrintSink`](spindle_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](spindle_debug::recorder::RecorderSink), then exports a
//! Chrome trace JSON file.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use spindle_core::clock::ClockConfig;
use spindle_core::marks::{Lifetime, MarkGraph, MarkId, MarkKey};
use spindle_core::runtime::Runtime;
use spindle_core::stream::{StreamId, StreamOptions};
use spindle_core::time::{HostTime, Timebase};
use spindle_core::trace::{
    FlushEvent, FrameEvent, FrameSummary, PassBeginEvent, PassEndEvent, TraceSink, Tracer,
};

use spindle_debug::pretty::PrettyPrintSink;
use spindle_debug::recorder::RecorderSink;

const FRAME_COUNT: u64 = 60;
/// 16.667 ms refresh interval in microseconds (≈60 Hz).
const REFRESH_INTERVAL_US: u64 = 16_667;
/// The frame after which the host stalls.
const STALL_FRAME: u64 = 30;
const STALL_US: u64 = 250_000;

/// Mark key a spinner uses for "my angle changed".
const ANGLE: MarkKey = MarkKey(1);

type Marks = Rc<RefCell<MarkGraph>>;

/// Forwards every event to two sinks.
struct Tee<'a> {
    first: &'a mut dyn TraceSink,
    second: &'a mut dyn TraceSink,
}

impl TraceSink for Tee<'_> {
    fn on_frame(&mut self, e: &FrameEvent) {
        self.first.on_frame(e);
        self.second.on_frame(e);
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.first.on_pass_begin(e);
        self.second.on_pass_begin(e);
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        self.first.on_pass_end(e);
        self.second.on_pass_end(e);
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        self.first.on_flush(e);
        self.second.on_flush(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.first.on_frame_summary(s);
        self.second.on_frame_summary(s);
    }
}

/// A widget composed of a scheduler stream (animation) and a mark node
/// (redraw state).
struct Spinner {
    stream: StreamId,
    mark: MarkId,
    angle: Rc<Cell<f64>>,
}

impl Spinner {
    fn spawn(runtime: &mut Runtime, marks: &Marks, name: &str, degrees_per_ms: f64) -> Self {
        let mark = marks.borrow_mut().create();
        let angle = Rc::new(Cell::new(0.0));
        let (a, m) = (Rc::clone(&angle), Rc::clone(marks));
        let stream = runtime
            .spawn(
                StreamOptions::new()
                    .name(name)
                    .callback(move |_, _, dt| {
                        if dt > 0.0 {
                            a.set((a.get() + degrees_per_ms * dt) % 360.0);
                            m.borrow_mut().mark(mark, ANGLE, Lifetime::Frames(1));
                        }
                    }),
            )
            .expect("root is alive");
        Self {
            stream,
            mark,
            angle,
        }
    }
}

fn main() {
    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- scene -------------------------------------------------------------
    let mut runtime = Runtime::with_timebase(ClockConfig::catch_up(16.0, 4), Timebase::MICROS);
    let marks: Marks = Rc::new(RefCell::new(MarkGraph::new()));

    let fast = Spinner::spawn(&mut runtime, &marks, "fast", 0.36);
    let slow = Spinner::spawn(&mut runtime, &marks, "slow", 0.09);

    // The panel redraws whenever either spinner does.
    let panel = marks.borrow_mut().create();
    for spinner in [&fast, &slow] {
        marks
            .borrow_mut()
            .subscribe(panel, spinner.mark)
            .expect("fresh nodes cannot form a cycle");
    }

    // A one-shot fade that removes itself after 400 ms of simulated time.
    let fade_left = Rc::new(Cell::new(400.0));
    let f = Rc::clone(&fade_left);
    let fade = runtime
        .spawn(
            StreamOptions::new()
                .name("fade")
                .callback(move |scheduler, me, dt| {
                    f.set(f.get() - dt);
                    if f.get() <= 0.0 {
                        scheduler.detach(me);
                    }
                }),
        )
        .expect("root is alive");
    runtime
        .scheduler_mut()
        .on_teardown(fade, || println!("[demo] fade finished"));

    // -- simulated loop ----------------------------------------------------
    let mut tee = Tee {
        first: &mut pretty,
        second: &mut recorder,
    };
    let mut tracer = Tracer::new(&mut tee);
    let panel_redraws = Rc::new(Cell::new(0_u32));
    let mut now_us: u64 = 1_000_000; // start at 1s

    for frame_index in 0..FRAME_COUNT {
        if frame_index == 10 {
            // Pause the slow spinner for a while.
            runtime.scheduler_mut().stop(slow.stream);
        } else if frame_index == 20 {
            runtime.scheduler_mut().start(slow.stream);
        }

        let (m, r) = (Rc::clone(&marks), Rc::clone(&panel_redraws));
        runtime.frame_at(HostTime(now_us), &mut tracer, move |_, tick, _| {
            let mut marks = m.borrow_mut();
            for spinner in [fast.mark, slow.mark] {
                marks.redraw_if_needed(spinner, tick, || {});
            }
            marks.redraw_if_needed(panel, tick, || r.set(r.get() + 1));
        });

        now_us += REFRESH_INTERVAL_US;
        if frame_index == STALL_FRAME {
            now_us += STALL_US;
        }
    }
    drop(tracer);

    println!(
        "[demo] fast={:.1}° slow={:.1}° panel redraws={}",
        fast.angle.get(),
        slow.angle.get(),
        panel_redraws.get(),
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    spindle_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({FRAME_COUNT} frames)");
}
