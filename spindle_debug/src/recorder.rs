// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, one tag byte followed by
//! the event fields. Millisecond quantities are stored as `f64` bit
//! patterns, so they decode exactly. [`decode`] reads the records back as an
//! iterator of [`RecordedEvent`].

use spindle_core::clock::TickId;
use spindle_core::trace::{
    FlushEvent, FrameEvent, FrameSummary, PassBeginEvent, PassEndEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME: u8 = 1;
const TAG_PASS_BEGIN: u8 = 2;
const TAG_PASS_END: u8 = 3;
const TAG_FLUSH: u8 = 4;
const TAG_FRAME_SUMMARY: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_tick(&mut self, tick: TickId) {
        self.write_u64(tick.0);
    }
}

impl TraceSink for RecorderSink {
    fn on_frame(&mut self, e: &FrameEvent) {
        self.write_u8(TAG_FRAME);
        self.write_tick(e.tick);
        self.write_f64(e.elapsed_ms);
        self.write_u32(e.steps);
        self.write_f64(e.backlog_ms);
        self.write_f64(e.dropped_ms);
    }

    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.write_u8(TAG_PASS_BEGIN);
        self.write_tick(e.tick);
        self.write_u32(e.step);
        self.write_f64(e.dt);
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        self.write_u8(TAG_PASS_END);
        self.write_tick(e.tick);
        self.write_u32(e.step);
        self.write_f64(e.dt);
        self.write_u32(e.nodes_run);
        self.write_u32(e.jobs_run);
    }

    fn on_flush(&mut self, e: &FlushEvent) {
        self.write_u8(TAG_FLUSH);
        self.write_tick(e.tick);
        self.write_u32(e.step);
        self.write_u32(e.attached);
        self.write_u32(e.released);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_tick(s.tick);
        self.write_u32(s.steps);
        self.write_f64(s.simulated_ms);
        self.write_u32(s.nodes_run);
        self.write_u32(s.jobs_run);
        self.write_u32(s.attached);
        self.write_u32(s.released);
        self.write_f64(s.dropped_ms);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`FrameEvent`].
    Frame(FrameEvent),
    /// A [`PassBeginEvent`].
    PassBegin(PassBeginEvent),
    /// A [`PassEndEvent`].
    PassEnd(PassEndEvent),
    /// A [`FlushEvent`].
    Flush(FlushEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.take().map(f64::from_le_bytes)
    }

    fn read_tick(&mut self) -> Option<TickId> {
        self.read_u64().map(TickId)
    }

    fn decode_frame(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Frame(FrameEvent {
            tick: self.read_tick()?,
            elapsed_ms: self.read_f64()?,
            steps: self.read_u32()?,
            backlog_ms: self.read_f64()?,
            dropped_ms: self.read_f64()?,
        }))
    }

    fn decode_pass_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassBegin(PassBeginEvent {
            tick: self.read_tick()?,
            step: self.read_u32()?,
            dt: self.read_f64()?,
        }))
    }

    fn decode_pass_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassEnd(PassEndEvent {
            tick: self.read_tick()?,
            step: self.read_u32()?,
            dt: self.read_f64()?,
            nodes_run: self.read_u32()?,
            jobs_run: self.read_u32()?,
        }))
    }

    fn decode_flush(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Flush(FlushEvent {
            tick: self.read_tick()?,
            step: self.read_u32()?,
            attached: self.read_u32()?,
            released: self.read_u32()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            tick: self.read_tick()?,
            steps: self.read_u32()?,
            simulated_ms: self.read_f64()?,
            nodes_run: self.read_u32()?,
            jobs_run: self.read_u32()?,
            attached: self.read_u32()?,
            released: self.read_u32()?,
            dropped_ms: self.read_f64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME => self.decode_frame(),
            TAG_PASS_BEGIN => self.decode_pass_begin(),
            TAG_PASS_END => self.decode_pass_end(),
            TAG_FLUSH => self.decode_flush(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use spindle_core::clock::ClockConfig;
    use spindle_core::runtime::Runtime;
    use spindle_core::stream::StreamOptions;
    use spindle_core::trace::Tracer;

    use super::*;

    fn record_frames() -> Vec<u8> {
        let mut runtime = Runtime::new(ClockConfig::catch_up(60.0, 4));
        runtime
            .spawn(StreamOptions::new().callback(|s, me, _| {
                let child = s.create(StreamOptions::new());
                s.attach(me, &[child]).unwrap();
            }))
            .unwrap();
        let mut rec = RecorderSink::new();
        runtime.frame(190.0, &mut Tracer::new(&mut rec), |_, _, _| {});
        runtime.frame(16.0, &mut Tracer::new(&mut rec), |_, _, _| {});
        rec.into_bytes()
    }

    #[test]
    fn runtime_frames_decode_in_order() {
        let bytes = record_frames();
        let tags: Vec<&str> = decode(&bytes)
            .map(|e| match e {
                RecordedEvent::Frame(_) => "frame",
                RecordedEvent::PassBegin(_) => "begin",
                RecordedEvent::PassEnd(_) => "end",
                RecordedEvent::Flush(_) => "flush",
                RecordedEvent::FrameSummary(_) => "summary",
            })
            .collect();
        let mut expected = vec!["frame", "begin", "flush", "end", "summary", "frame"];
        for _ in 0..4 {
            expected.extend(["begin", "flush", "end"]);
        }
        expected.push("summary");
        assert_eq!(tags, expected);
    }

    #[test]
    fn fractional_milliseconds_survive_recording() {
        let mut rec = RecorderSink::new();
        let orig = FrameEvent {
            tick: TickId(3),
            elapsed_ms: 16.666_666_7,
            steps: 1,
            backlog_ms: 16.666_666_7,
            dropped_ms: 0.0,
        };
        rec.on_frame(&orig);
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events, vec![RecordedEvent::Frame(orig)]);
    }

    #[test]
    fn summary_counts_deferred_attaches() {
        let bytes = record_frames();
        let summaries: Vec<FrameSummary> = decode(&bytes)
            .filter_map(|e| match e {
                RecordedEvent::FrameSummary(s) => Some(s),
                _ => None,
            })
            .collect();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[1].steps, 4);
        assert_eq!(summaries[1].simulated_ms, 190.0);
        assert_eq!(summaries[1].attached, 4, "one deferred attach per pass");
        assert_eq!(summaries[0].dropped_ms, 0.0);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_flush(&FlushEvent {
            tick: TickId(1),
            step: 0,
            attached: 1,
            released: 0,
        });
        rec.on_flush(&FlushEvent {
            tick: TickId(1),
            step: 1,
            attached: 0,
            released: 2,
        });
        let bytes = rec.into_bytes();
        let cut = &bytes[..bytes.len() - 3];
        assert_eq!(decode(cut).count(), 1);
        assert_eq!(decode(&[0xff, 0, 0]).count(), 0, "unknown tag");
    }
}
