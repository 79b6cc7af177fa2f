// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Events carry no wall-clock timestamps, so the trace is laid out on the
//! *simulated* timeline: each pass occupies `dt` milliseconds after the one
//! before it, and frames appear as instants at the point their first pass
//! starts.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    // Simulated time in microseconds.
    let mut now_us = 0.0_f64;
    let mut pass_end_us = 0.0_f64;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Frame(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Frame",
                    "cat": "Clock",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "tick": e.tick.0,
                        "elapsed_ms": e.elapsed_ms,
                        "steps": e.steps,
                        "backlog_ms": e.backlog_ms,
                        "dropped_ms": e.dropped_ms,
                    }
                }));
            }
            RecordedEvent::PassBegin(e) => {
                pass_end_us = now_us + e.dt * 1000.0;
                events.push(json!({
                    "ph": "B",
                    "name": "Pass",
                    "cat": "Scheduler",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "tick": e.tick.0,
                        "step": e.step,
                        "dt_ms": e.dt,
                    }
                }));
            }
            RecordedEvent::Flush(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Flush",
                    "cat": "Scheduler",
                    "ts": pass_end_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "tick": e.tick.0,
                        "step": e.step,
                        "attached": e.attached,
                        "released": e.released,
                    }
                }));
            }
            RecordedEvent::PassEnd(e) => {
                now_us += e.dt * 1000.0;
                events.push(json!({
                    "ph": "E",
                    "name": "Pass",
                    "cat": "Scheduler",
                    "ts": now_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "nodes_run": e.nodes_run,
                        "jobs_run": e.jobs_run,
                    }
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "C",
                    "name": "Streams",
                    "cat": "Summary",
                    "ts": now_us,
                    "pid": 0,
                    "args": {
                        "nodes_run": s.nodes_run,
                        "attached": s.attached,
                        "released": s.released,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use spindle_core::clock::ClockConfig;
    use spindle_core::runtime::Runtime;
    use spindle_core::stream::StreamOptions;
    use spindle_core::trace::Tracer;

    fn export_json(bytes: &[u8]) -> Vec<Value> {
        let mut out = Vec::new();
        export(bytes, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        serde_json::from_str(&json_str).unwrap()
    }

    #[test]
    fn export_produces_valid_json() {
        let mut runtime = Runtime::new(ClockConfig::catch_up(60.0, 4));
        runtime
            .spawn(StreamOptions::new().callback(|s, me, _| s.detach(me)))
            .unwrap();
        let mut rec = RecorderSink::new();
        runtime.frame(100.0, &mut Tracer::new(&mut rec), |_, _, _| {});
        runtime.frame(16.0, &mut Tracer::new(&mut rec), |_, _, _| {});

        let parsed = export_json(rec.as_bytes());
        // Frame 1: frame, B, flush, E, summary. Frame 2: frame, 2 × (B, flush, E), summary.
        assert_eq!(parsed.len(), 5 + 8);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "Frame");
        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[2]["name"], "Flush");
        assert_eq!(parsed[2]["args"]["released"], 1);
        assert_eq!(parsed[4]["ph"], "C");
    }

    #[test]
    fn passes_advance_simulated_time() {
        let mut runtime = Runtime::new(ClockConfig::catch_up(60.0, 4));
        let mut rec = RecorderSink::new();
        runtime.frame(100.0, &mut Tracer::new(&mut rec), |_, _, _| {});
        runtime.frame(0.0, &mut Tracer::new(&mut rec), |_, _, _| {});

        let ends: Vec<f64> = export_json(rec.as_bytes())
            .iter()
            .filter(|e| e["ph"] == "E")
            .map(|e| e["ts"].as_f64().unwrap())
            .collect();
        // The first trigger runs one zero-length pass; the second 60 + 40 ms.
        assert_eq!(ends, vec![0.0, 60_000.0, 100_000.0]);
    }

    #[test]
    fn export_empty_recording() {
        assert!(export_json(&[]).is_empty());
    }
}
