// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-step clock with bounded catch-up.
//!
//! [`Clock`] turns wall-clock time into a sequence of fixed-size simulation
//! steps. Each external trigger (a display-refresh callback, a timer) calls
//! [`Clock::next_steps`] or [`Clock::advance`], which
//!
//! 1. emits steps covering the backlog *carried from the previous trigger*,
//!    each of size `R` ([`ClockConfig::step_ms`]) except the last, which is
//!    prorated to the remainder, and at least one step even when the backlog
//!    is zero;
//! 2. replaces the backlog with the time elapsed since the previous trigger,
//!    clamped to the catch-up cap (`R × max_catch_up_steps`).
//!
//! The cap is what prevents a stall (a suspended tab, a debugger pause) from
//! turning into an unbounded burst of catch-up steps. With the default cap of
//! one step the backlog never exceeds `R`.
//!
//! ```text
//!   trigger n          trigger n+1             trigger n+2
//!   ──┬────────────────────┬───────────────────────┬──
//!     │ steps(backlog_n)   │ steps(backlog_n+1)    │
//!     │ backlog_n+1 =      │ backlog_n+2 =         │
//!     │   min(gap, cap)    │   min(gap, cap)       │
//! ```

use crate::time::{HostTime, Timebase};

/// Identifier of one external trigger of the frame loop.
///
/// Advanced once per [`Runtime::frame`](crate::runtime::Runtime::frame), even
/// when the trigger carries no elapsed time, and used by
/// [`MarkGraph`](crate::marks::MarkGraph) as its once-per-tick guard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TickId(pub u64);

impl TickId {
    /// Returns the identifier following this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Configuration for a [`Clock`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockConfig {
    /// Nominal step size `R`, in milliseconds.
    pub step_ms: f64,
    /// How many full steps of backlog may be carried into one trigger.
    pub max_catch_up_steps: u32,
}

impl ClockConfig {
    /// Nominal 60 ms step, backlog capped at a single step.
    pub const DEFAULT: Self = Self {
        step_ms: 60.0,
        max_catch_up_steps: 1,
    };

    /// A clock with step `step_ms` that may catch up by up to `steps` full
    /// steps after a stall.
    ///
    /// # Panics
    ///
    /// Panics if `step_ms` is not strictly positive or `steps` is zero.
    #[must_use]
    pub const fn catch_up(step_ms: f64, steps: u32) -> Self {
        assert!(step_ms > 0.0, "clock step must be positive");
        assert!(steps > 0, "clock must allow at least one step of backlog");
        Self {
            step_ms,
            max_catch_up_steps: steps,
        }
    }

    /// Maximum backlog, in milliseconds.
    #[must_use]
    pub fn backlog_cap(&self) -> f64 {
        self.step_ms * f64::from(self.max_catch_up_steps)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Converts elapsed wall-clock time into bounded batches of fixed steps.
#[derive(Clone, Debug)]
pub struct Clock {
    config: ClockConfig,
    timebase: Timebase,
    last_wall_time: Option<HostTime>,
    backlog: f64,
    dropped: f64,
}

impl Clock {
    /// Creates a clock whose [`advance`](Self::advance) timestamps are
    /// nanosecond ticks.
    ///
    /// # Panics
    ///
    /// Panics if `config.step_ms` is not strictly positive or
    /// `config.max_catch_up_steps` is zero.
    #[must_use]
    pub fn new(config: ClockConfig) -> Self {
        Self::with_timebase(config, Timebase::NANOS)
    }

    /// Creates a clock that interprets [`advance`](Self::advance) timestamps
    /// with the given timebase.
    ///
    /// # Panics
    ///
    /// Panics if `config.step_ms` is not strictly positive or
    /// `config.max_catch_up_steps` is zero.
    #[must_use]
    pub fn with_timebase(config: ClockConfig, timebase: Timebase) -> Self {
        assert!(config.step_ms > 0.0, "clock step must be positive");
        assert!(
            config.max_catch_up_steps > 0,
            "clock must allow at least one step of backlog"
        );
        Self {
            config,
            timebase,
            last_wall_time: None,
            backlog: 0.0,
            dropped: 0.0,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> ClockConfig {
        self.config
    }

    /// Returns the backlog that the next trigger will turn into steps.
    #[must_use]
    pub fn backlog(&self) -> f64 {
        self.backlog
    }

    /// Returns how much elapsed time the cap discarded on the most recent
    /// trigger.
    #[must_use]
    pub fn dropped(&self) -> f64 {
        self.dropped
    }

    /// Returns the timestamp of the most recent [`advance`](Self::advance).
    #[must_use]
    pub fn last_wall_time(&self) -> Option<HostTime> {
        self.last_wall_time
    }

    /// Emits the steps for the carried backlog, then stores `elapsed_ms` as
    /// the new backlog (clamped to the cap).
    ///
    /// Negative, NaN, or zero elapsed time counts as no time passing.
    pub fn next_steps(&mut self, elapsed_ms: f64) -> Steps {
        let steps = Steps::new(self.backlog, self.config.step_ms);
        let elapsed = sanitize(elapsed_ms);
        let cap = self.config.backlog_cap();
        self.backlog = elapsed.min(cap);
        self.dropped = if elapsed > cap { elapsed - cap } else { 0.0 };
        steps
    }

    /// Like [`next_steps`](Self::next_steps), but measures the elapsed time
    /// from the previous `advance` timestamp.
    ///
    /// The first call has nothing to measure against and counts as zero
    /// elapsed time.
    pub fn advance(&mut self, now: HostTime) -> Steps {
        let elapsed = match self.last_wall_time {
            Some(last) => now.millis_since(last, self.timebase),
            None => 0.0,
        };
        self.last_wall_time = Some(now);
        self.next_steps(elapsed)
    }

    /// Forgets the backlog and the last timestamp.
    ///
    /// Use after an intentional pause so the resume does not replay it.
    pub fn reset(&mut self) {
        self.last_wall_time = None;
        self.backlog = 0.0;
        self.dropped = 0.0;
    }
}

fn sanitize(elapsed_ms: f64) -> f64 {
    if elapsed_ms.is_nan() || elapsed_ms <= 0.0 {
        return 0.0;
    }
    elapsed_ms
}

/// Iterator over the step sizes produced for one trigger.
///
/// Always yields at least one value; yields `0.0` once when there was no
/// backlog.
#[derive(Clone, Debug)]
pub struct Steps {
    remaining: f64,
    step: f64,
    done: bool,
}

impl Steps {
    fn new(backlog: f64, step: f64) -> Self {
        Self {
            remaining: backlog,
            step,
            done: false,
        }
    }

    /// Returns how many steps are left without consuming them.
    #[must_use]
    pub fn remaining_steps(&self) -> u32 {
        u32::try_from(self.clone().count()).unwrap_or(u32::MAX)
    }
}

impl Iterator for Steps {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.done {
            return None;
        }
        let dt = self.remaining.min(self.step);
        self.remaining -= self.step;
        if self.remaining <= 0.0 {
            self.done = true;
        }
        Some(dt)
    }
}

impl core::iter::FusedIterator for Steps {}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    fn collect(steps: Steps) -> Vec<f64> {
        steps.collect()
    }

    #[test]
    fn first_trigger_emits_single_zero_step() {
        let mut clock = Clock::new(ClockConfig::DEFAULT);
        assert_eq!(collect(clock.next_steps(16.0)), vec![0.0]);
        assert_eq!(clock.backlog(), 16.0);
    }

    #[test]
    fn steps_lag_one_trigger_behind() {
        let mut clock = Clock::new(ClockConfig::DEFAULT);
        let _ = clock.next_steps(16.0);
        assert_eq!(collect(clock.next_steps(20.0)), vec![16.0]);
        assert_eq!(collect(clock.next_steps(0.0)), vec![20.0]);
        assert_eq!(collect(clock.next_steps(0.0)), vec![0.0]);
    }

    #[test]
    fn default_cap_keeps_backlog_at_one_step() {
        // R = 60, 190 ms gap: the backlog becomes min(190, 60) = 60 and the
        // following trigger runs exactly one full step.
        let mut clock = Clock::new(ClockConfig::DEFAULT);
        assert_eq!(collect(clock.next_steps(190.0)), vec![0.0]);
        assert_eq!(clock.backlog(), 60.0);
        assert_eq!(clock.dropped(), 130.0);
        assert_eq!(collect(clock.next_steps(16.0)), vec![60.0]);
        assert_eq!(clock.backlog(), 16.0);
    }

    #[test]
    fn catch_up_splits_backlog_with_prorated_tail() {
        // R = 60, 190 ms gap, up to four steps of catch-up.
        let mut clock = Clock::new(ClockConfig::catch_up(60.0, 4));
        let _ = clock.next_steps(190.0);
        assert_eq!(clock.backlog(), 190.0);
        assert_eq!(collect(clock.next_steps(0.0)), vec![60.0, 60.0, 60.0, 10.0]);
    }

    #[test]
    fn catch_up_is_bounded_after_a_stall() {
        let mut clock = Clock::new(ClockConfig::catch_up(16.0, 3));
        let _ = clock.next_steps(10_000.0);
        let steps = clock.next_steps(16.0);
        assert_eq!(steps.remaining_steps(), 3);
        assert_eq!(collect(steps), vec![16.0, 16.0, 16.0]);
    }

    #[test]
    fn exact_multiple_has_no_zero_tail() {
        let mut clock = Clock::new(ClockConfig::catch_up(10.0, 5));
        let _ = clock.next_steps(30.0);
        assert_eq!(collect(clock.next_steps(0.0)), vec![10.0, 10.0, 10.0]);
    }

    #[test]
    fn anomalous_elapsed_clamps_to_zero() {
        let mut clock = Clock::new(ClockConfig::DEFAULT);
        let _ = clock.next_steps(-5.0);
        assert_eq!(clock.backlog(), 0.0);
        let _ = clock.next_steps(f64::NAN);
        assert_eq!(clock.backlog(), 0.0);
        let _ = clock.next_steps(f64::INFINITY);
        assert_eq!(clock.backlog(), 60.0, "infinite gaps hit the cap");
    }

    #[test]
    fn advance_measures_between_timestamps() {
        let mut clock = Clock::with_timebase(ClockConfig::DEFAULT, Timebase::MICROS);
        assert_eq!(collect(clock.advance(HostTime(1_000_000))), vec![0.0]);
        assert_eq!(clock.backlog(), 0.0, "first advance has no reference point");
        let _ = clock.advance(HostTime(1_016_000));
        assert_eq!(clock.backlog(), 16.0);
        assert_eq!(clock.last_wall_time(), Some(HostTime(1_016_000)));
    }

    #[test]
    fn reset_forgets_backlog() {
        let mut clock = Clock::new(ClockConfig::DEFAULT);
        let _ = clock.advance(HostTime(0));
        let _ = clock.advance(HostTime(50_000_000));
        assert_eq!(clock.backlog(), 50.0);
        clock.reset();
        assert_eq!(clock.backlog(), 0.0);
        assert_eq!(clock.last_wall_time(), None);
    }

    #[test]
    fn tick_id_advances() {
        assert_eq!(TickId(7).next(), TickId(8));
        assert_eq!(TickId(u64::MAX).next(), TickId(0));
    }

    #[test]
    #[should_panic(expected = "clock step must be positive")]
    fn zero_step_panics() {
        let _ = Clock::new(ClockConfig {
            step_ms: 0.0,
            max_catch_up_steps: 1,
        });
    }
}
