// Copyright 2026 the Spindle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time and timebase conversion.
//!
//! [`HostTime`] is a point in time expressed as platform-native monotonic
//! ticks. [`Timebase`] carries the rational ticks→nanoseconds factor, so the
//! [`Clock`](crate::clock::Clock) can turn two timestamps into an elapsed
//! duration in milliseconds.

use core::fmt;

/// A point in time expressed as platform-native monotonic ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Returns the milliseconds elapsed since `earlier`, or zero if `earlier`
    /// is after `self`.
    ///
    /// Host clocks are expected to be monotonic, but a backwards step is
    /// reported as no time passing rather than as a negative gap.
    #[inline]
    #[must_use]
    pub fn millis_since(self, earlier: Self, timebase: Timebase) -> f64 {
        let ticks = self.0.saturating_sub(earlier.0);
        timebase.ticks_to_nanos(ticks) as f64 / 1_000_000.0
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Rational conversion factor from ticks to nanoseconds.
///
/// `nanoseconds = ticks * numer / denom`
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ticks-to-nanoseconds ratio.
    pub numer: u32,
    /// Denominator of the ticks-to-nanoseconds ratio.
    pub denom: u32,
}

impl Timebase {
    /// A timebase where ticks are already nanoseconds (1:1).
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// A timebase where ticks are microseconds, as produced by
    /// `performance.now()`-style millisecond clocks scaled by 1000.
    pub const MICROS: Self = Self {
        numer: 1000,
        denom: 1,
    };

    /// Creates a new timebase with the given numerator and denominator.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(denom != 0, "timebase denominator must not be zero");
        Self { numer, denom }
    }

    /// Converts a tick count to nanoseconds.
    ///
    /// Uses a `u128` intermediate so large tick values cannot overflow.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u128 intermediate avoids overflow; truncation back to u64 is intentional"
    )]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        let wide = ticks as u128 * self.numer as u128 / self.denom as u128;
        wide as u64
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_since_with_nanosecond_ticks() {
        let earlier = HostTime(1_000_000_000);
        let now = HostTime(1_016_000_000);
        assert_eq!(now.millis_since(earlier, Timebase::NANOS), 16.0);
    }

    #[test]
    fn millis_since_with_microsecond_ticks() {
        let earlier = HostTime(5_000);
        let now = HostTime(195_000);
        assert_eq!(now.millis_since(earlier, Timebase::MICROS), 190.0);
    }

    #[test]
    fn backwards_step_is_zero() {
        let earlier = HostTime(2_000);
        let now = HostTime(1_000);
        assert_eq!(now.millis_since(earlier, Timebase::NANOS), 0.0);
    }

    #[test]
    fn mach_style_timebase() {
        // 24 MHz ticks: 125/3 ns per tick.
        let tb = Timebase::new(125, 3);
        assert_eq!(tb.ticks_to_nanos(24_000_000), 1_000_000_000, "24 MHz → 1s");
    }

    #[test]
    #[should_panic(expected = "denominator must not be zero")]
    fn zero_denominator_panics() {
        let _ = Timebase::new(1, 0);
    }
}
