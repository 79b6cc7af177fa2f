// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-mark propagation.
//!
//! A [`MarkGraph`] holds *mark nodes*. Each node carries a set of keyed
//! **self marks** ("I need to redraw because of `k`") and a **subscription
//! count**: the number of marks held, transitively, by the nodes it
//! subscribes to. A node needs to redraw whenever either is non-zero.
//!
//! ```text
//!   source ──Marked(+n)──▶ subscriber ──Marked(+n)──▶ subscriber'
//!          ◀─subscribe───             ◀─subscribe───
//! ```
//!
//! Marks are keyed, so re-marking with the same key is a no-op and each mark
//! can be revoked independently. Counts are plain integers: every mark or
//! unmark costs O(1) per edge it crosses. A [`Lifetime::Frames`] mark
//! expires on its own after the given number of [`MarkGraph::tick`] calls.
//!
//! Redraw decisions are guarded per [`TickId`](crate::clock::TickId):
//! [`MarkGraph::should_redraw`] answers `false` for a tick the node has
//! already processed.

mod error;
mod graph;
mod id;

pub use error::SubscribeError;
pub use graph::MarkGraph;
pub use id::{Lifetime, MarkEvent, MarkId, MarkKey, Subscription};
