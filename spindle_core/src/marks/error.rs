// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

use super::MarkId;

/// Errors from [`MarkGraph::subscribe`](super::MarkGraph::subscribe).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubscribeError {
    /// One of the nodes has been destroyed.
    Destroyed(MarkId),
    /// A node cannot subscribe to itself.
    SelfSubscription(MarkId),
    /// `source` already receives notifications from `subscriber`, directly
    /// or transitively.
    Cycle {
        /// The node that asked to subscribe.
        subscriber: MarkId,
        /// The node it asked to subscribe to.
        source: MarkId,
    },
}

impl fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroyed(id) => write!(f, "{id:?} has been destroyed"),
            Self::SelfSubscription(id) => write!(f, "{id:?} cannot subscribe to itself"),
            Self::Cycle { subscriber, source } => write!(
                f,
                "{subscriber:?} subscribing to {source:?} would create a cycle"
            ),
        }
    }
}

impl core::error::Error for SubscribeError {}
