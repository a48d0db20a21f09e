//! Core time value types with exact rational arithmetic.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// An exact point in time, counted as `value / rate` seconds.
///
/// For media work `rate` is typically the frame rate (so `value` is a frame
/// count), but nothing here assumes that. Comparison and equality are by
/// *value* — `RationalTime::new(30, 30)` equals `RationalTime::new(1, 1)` —
/// computed with 128-bit cross multiplication, never floating point.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct RationalTime {
    value: i64,
    rate: i64,
}

impl RationalTime {
    pub const ZERO: Self = Self { value: 0, rate: 1 };

    pub fn new(value: i64, rate: i64) -> Self {
        assert!(rate > 0, "RationalTime rate must be > 0");
        Self { value, rate }
    }

    /// A time of `frames` frames at the given frame rate.
    pub fn from_frames(frames: i64, rate: i64) -> Self {
        Self::new(frames, rate)
    }

    pub fn value(self) -> i64 {
        self.value
    }

    pub fn rate(self) -> i64 {
        self.rate
    }

    pub fn is_zero(self) -> bool {
        self.value == 0
    }

    /// Lossy conversion for display and interop. Never used in comparisons
    /// or range arithmetic.
    pub fn to_seconds(self) -> f64 {
        self.value as f64 / self.rate as f64
    }

    /// Both values brought to the least common rate.
    fn aligned(self, other: Self) -> (i64, i64, i64) {
        if self.rate == other.rate {
            return (self.value, other.value, self.rate);
        }
        let common = lcm(self.rate, other.rate);
        (
            self.value * (common / self.rate),
            other.value * (common / other.rate),
            common,
        )
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.value as i128 * other.rate as i128 == other.value as i128 * self.rate as i128
    }
}

impl Eq for RationalTime {}

impl Ord for RationalTime {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.value as i128 * other.rate as i128;
        let rhs = other.value as i128 * self.rate as i128;
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        let (a, b, rate) = self.aligned(rhs);
        Self::new(a + b, rate)
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        let (a, b, rate) = self.aligned(rhs);
        Self::new(a - b, rate)
    }
}

impl Neg for RationalTime {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.value, self.rate)
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rate == 1 {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}/{}", self.value, self.rate)
        }
    }
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

fn lcm(a: i64, b: i64) -> i64 {
    a / gcd(a, b) * b
}

/// A half-open span of time: `[start_time, start_time + duration)`.
///
/// A range with zero (or negative) duration is "empty": it contains no
/// time and overlaps nothing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    pub const ZERO: Self = Self {
        start_time: RationalTime::ZERO,
        duration: RationalTime::ZERO,
    };

    pub fn new(start_time: RationalTime, duration: RationalTime) -> Self {
        Self {
            start_time,
            duration,
        }
    }

    /// Range covering `[start, end)`.
    pub fn from_start_end_time(start_time: RationalTime, end_time_exclusive: RationalTime) -> Self {
        Self {
            start_time,
            duration: end_time_exclusive - start_time,
        }
    }

    pub fn end_time_exclusive(self) -> RationalTime {
        self.start_time + self.duration
    }

    pub fn is_empty(self) -> bool {
        self.duration <= RationalTime::ZERO
    }

    /// True if `time` falls inside the range. Always false for empty ranges,
    /// and false for the exclusive end point.
    pub fn contains(self, time: RationalTime) -> bool {
        !self.is_empty() && self.start_time <= time && time < self.end_time_exclusive()
    }

    /// True if the two ranges share any time. Empty ranges overlap nothing.
    pub fn overlaps(self, other: TimeRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.start_time < other.end_time_exclusive()
            && other.start_time < self.end_time_exclusive()
    }

    /// The shared portion of two ranges, or `None` if it would be empty.
    pub fn intersection(self, other: TimeRange) -> Option<TimeRange> {
        let start = self.start_time.max(other.start_time);
        let end = self.end_time_exclusive().min(other.end_time_exclusive());
        if end <= start {
            return None;
        }
        Some(TimeRange::from_start_end_time(start, end))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_time, self.end_time_exclusive())
    }
}
