// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-step update scheduling and dirty-mark propagation.
//!
//! `spindle_core` drives frame-based applications (games, animated UIs,
//! simulations) from an external per-frame trigger. It is `no_std`
//! compatible (with `alloc`), single-threaded, and uses struct-of-arrays
//! storage with generational handles for both of its graphs.
//!
//! # Architecture
//!
//! ```text
//!   Host trigger (elapsed ms or HostTime)
//!       │
//!       ▼
//!   Clock::next_steps() ──► Steps [dt, dt, …, tail]
//!                               │ one pass per step
//!                 ┌─────────────┘
//!                 ▼
//!   next-tick jobs ──► Scheduler walk ──► update hook ──► flush edits
//!                           │
//!                           ▼
//!   MarkGraph::should_redraw(tick) ──► render ──► MarkGraph::tick(tick)
//! ```
//!
//! **[`clock`]** — Converts wall-clock time into fixed-size steps with a
//! prorated tail and a bounded catch-up backlog.
//!
//! **[`stream`]** — The scheduling tree. Callbacks run depth-first in
//! pre-order and may edit the tree; edits requested mid-pass are deferred
//! until the outermost pass unwinds.
//!
//! **[`marks`]** — Keyed dirty marks with subscription counts propagated
//! incrementally along subscribe edges, and a once-per-tick redraw guard.
//!
//! **[`runtime`]** — [`Runtime`](runtime::Runtime) wires the clock and the
//! scheduler into a frame loop.
//!
//! **[`events`]** and **[`jobs`]** — The listener registry and ordered job
//! lists the graphs are built on.
//!
//! **[`time`]** — Monotonic host timestamps and timebase conversion.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Example
//!
//! ```
//! use spindle_core::clock::ClockConfig;
//! use spindle_core::marks::{Lifetime, MarkGraph, MarkKey};
//! use spindle_core::runtime::Runtime;
//! use spindle_core::stream::StreamOptions;
//! use spindle_core::trace::Tracer;
//!
//! let mut runtime = Runtime::new(ClockConfig::DEFAULT);
//! let mut marks: MarkGraph = MarkGraph::new();
//! let widget = marks.create();
//!
//! runtime
//!     .spawn(StreamOptions::new().name("spinner").callback(|_, _, _dt| {
//!         // advance an animation by `dt` milliseconds
//!     }))
//!     .unwrap();
//! marks.mark(widget, MarkKey::DEFAULT, Lifetime::Frames(1));
//!
//! let mut redraws = 0;
//! runtime.frame(16.0, &mut Tracer::none(), |_, tick, _dt| {
//!     marks.redraw_if_needed(widget, tick, || redraws += 1);
//! });
//! assert_eq!(redraws, 1);
//! ```
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod clock;
pub mod events;
pub mod jobs;
pub mod marks;
pub mod runtime;
pub mod stream;
pub mod time;
pub mod trace;
