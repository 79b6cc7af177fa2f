// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical update scheduler.
//!
//! A *stream* is a node in the scheduling tree. Each stream has:
//!
//! - An identity ([`StreamId`]): a generational handle that becomes stale
//!   once the stream is released, so operations on torn-down nodes are
//!   detected instead of hitting a recycled slot.
//! - An optional callback, invoked once per pass the stream participates in.
//! - Topology: an optional parent and an ordered list of children.
//! - Flags: `active` (skipped with its subtree when false), `deleted`
//!   (pending release), and `executing` (its callback or a descendant's is
//!   running right now).
//!
//! # Passes
//!
//! [`Scheduler::run`] walks a subtree depth-first in pre-order: a parent's
//! callback runs before its children's, and siblings run in attach order.
//! A callback receives `&mut Scheduler`, so it can attach, detach, start, or
//! stop streams while the walk is in progress.
//!
//! # Deferred edits
//!
//! The walk indexes into each node's child list. To keep that list stable,
//! [`attach`](Scheduler::attach), [`detach`](Scheduler::detach), and
//! [`destroy`](Scheduler::destroy) requested while any pass is running are
//! queued and applied, in request order, once the outermost pass returns.
//! Requested outside a pass, they apply immediately.

mod error;
mod id;
mod scheduler;
mod traverse;

pub use error::AttachError;
pub use id::StreamId;
pub use scheduler::{FlushStats, PassReport, Scheduler, StreamFn, StreamOptions};
pub use traverse::Children;
