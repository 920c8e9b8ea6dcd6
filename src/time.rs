// Defines a trait for time-like objects and the timestamp types the tuners accept
// Copyright © 2025 Hs293Go
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES
// OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE
// OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use core::ops::Add;
use core::time::Duration;

use core::any::Any;
use core::fmt::Debug;

/// A trait for time-like objects that can be used to measure elapsed time.
///
/// Tuners are driven by caller-supplied timestamps rather than a wall clock. Each tuner compares
/// the time elapsed since its last accepted sample against its sample time and silently drops
/// samples that arrive too early.
pub trait InstantLike:
    Sized
    + Add<Duration, Output = Self>
    + Clone
    + Copy
    + Debug
    + PartialEq<Self>
    + Send
    + Sync
    + Unpin
    + Any
{
    /// Returns the amount of time elapsed from another instant to this one.
    ///
    /// Implementations saturate at zero when `earlier` is actually later than `self`.
    #[must_use]
    fn duration_since(&self, earlier: Self) -> Duration;

    /// Returns `true` if at least `period` has elapsed since `earlier`, or if there is no earlier
    /// instant at all.
    #[must_use]
    fn has_elapsed(&self, earlier: Option<Self>, period: Duration) -> bool {
        earlier.map_or(true, |earlier| self.duration_since(earlier) >= period)
    }
}

/// Milliseconds since an arbitrary epoch, the native timestamp of the relay autotuner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Millis(pub u64);

impl InstantLike for Millis {
    fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Millis {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Millis(self.0 + rhs.as_millis() as u64)
    }
}

/// Microseconds since an arbitrary epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Micros(pub u64);

impl InstantLike for Micros {
    fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Micros {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Micros(self.0 + rhs.as_micros() as u64)
    }
}

/// Seconds since an arbitrary epoch, for hosts whose simulation clock is a float.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Seconds(pub f64);

impl InstantLike for Seconds {
    fn duration_since(&self, earlier: Self) -> Duration {
        let secs = self.0 - earlier.0;
        if secs.is_nan() || secs <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        }
    }
}

impl Add<Duration> for Seconds {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Seconds(self.0 + rhs.as_secs_f64())
    }
}

/// A convenient wrapper around `std::time::Instant` satisfying the `InstantLike` trait.
#[cfg(feature = "std")]
mod std_instant {

    use super::{Add, Duration, InstantLike};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub struct StdInstant(pub std::time::Instant);

    impl StdInstant {
        pub fn now() -> Self {
            StdInstant(std::time::Instant::now())
        }
    }

    impl InstantLike for StdInstant {
        fn duration_since(&self, other: Self) -> Duration {
            self.0.saturating_duration_since(other.0)
        }
    }

    impl Add<Duration> for StdInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self::Output {
            StdInstant(self.0 + rhs)
        }
    }
}

#[cfg(feature = "std")]
pub use std_instant::StdInstant;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_timestamps_saturate() {
        assert_eq!(Millis(10).duration_since(Millis(20)), Duration::ZERO);
        assert_eq!(Micros(10).duration_since(Micros(20)), Duration::ZERO);
        assert_eq!(Seconds(1.0).duration_since(Seconds(2.0)), Duration::ZERO);
    }

    #[test]
    fn test_has_elapsed() {
        let period = Duration::from_millis(250);
        assert!(Millis(0).has_elapsed(None, period));
        assert!(!Millis(249).has_elapsed(Some(Millis(0)), period));
        assert!(Millis(250).has_elapsed(Some(Millis(0)), period));
    }

    #[test]
    fn test_add_duration() {
        assert_eq!(Millis(5) + Duration::from_millis(250), Millis(255));
        assert_eq!(Micros(5) + Duration::from_millis(1), Micros(1005));
        assert_eq!(Seconds(0.5) + Duration::from_millis(250), Seconds(0.75));
    }

    /// StdInstant is one constructor call away from `std::time::Instant`
    #[cfg(feature = "std")]
    #[test]
    fn test_std_instant_wrapper() {
        let start = StdInstant::now();
        let end = StdInstant(std::time::Instant::now());
        assert_eq!(end.duration_since(start), end.0.duration_since(start.0));
        assert_eq!(start.duration_since(end), Duration::ZERO);
    }
}
