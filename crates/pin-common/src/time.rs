//! Wall-clock time marks and signed deltas between them.
//!
//! Marks are read with `clock_gettime` and kept as split seconds /
//! nanoseconds so the difference of two marks can be normalized the same
//! way a `timespec` subtraction is: the fractional part always lies in
//! `[0, 1_000_000_000)` and any borrow is carried into the seconds.

use crate::error::{PinResult, PinSpeedError};
use nix::time::{clock_gettime, ClockId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Clock used to stamp sampling ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// `CLOCK_REALTIME`: wall clock, may step under NTP adjustments.
    #[default]
    Realtime,
    /// `CLOCK_MONOTONIC`: never steps backwards.
    Monotonic,
}

impl ClockSource {
    fn clock_id(self) -> ClockId {
        match self {
            ClockSource::Realtime => ClockId::CLOCK_REALTIME,
            ClockSource::Monotonic => ClockId::CLOCK_MONOTONIC,
        }
    }
}

impl fmt::Display for ClockSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockSource::Realtime => write!(f, "realtime"),
            ClockSource::Monotonic => write!(f, "monotonic"),
        }
    }
}

/// A point in time as `(seconds, nanoseconds)`.
///
/// Built through [`TimeMark::new`] or [`TimeMark::now`], `nsec` lies in
/// `[0, NANOS_PER_SEC)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeMark {
    /// Whole seconds.
    pub sec: i64,
    /// Sub-second part in nanoseconds.
    pub nsec: i64,
}

impl TimeMark {
    /// Build a mark from its parts.
    ///
    /// `nsec` outside `[0, NANOS_PER_SEC)` is carried into `sec`.
    #[must_use]
    pub const fn new(sec: i64, nsec: i64) -> Self {
        Self {
            sec: sec + nsec.div_euclid(NANOS_PER_SEC),
            nsec: nsec.rem_euclid(NANOS_PER_SEC),
        }
    }

    /// Read the given clock.
    ///
    /// # Errors
    ///
    /// Returns [`PinSpeedError::Clock`] if `clock_gettime` fails.
    pub fn now(clock: ClockSource) -> PinResult<Self> {
        let ts = clock_gettime(clock.clock_id())
            .map_err(|e| PinSpeedError::Clock(format!("{clock}: {e}")))?;
        Ok(Self {
            sec: i64::from(ts.tv_sec()),
            nsec: i64::from(ts.tv_nsec()),
        })
    }

    /// Signed difference `self - earlier`, normalized.
    #[must_use]
    pub fn since(&self, earlier: &TimeMark) -> TimeDelta {
        diff_time(self, earlier)
    }
}

/// Signed span between two [`TimeMark`]s.
///
/// `nsec` is always in `[0, NANOS_PER_SEC)`; negative spans carry their
/// sign in `sec` (e.g. -0.6 s is `(-1, 400_000_000)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TimeDelta {
    /// Whole seconds, possibly negative.
    pub sec: i64,
    /// Non-negative sub-second part in nanoseconds.
    pub nsec: i64,
}

impl TimeDelta {
    /// Span as fractional seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(&self) -> f64 {
        self.sec as f64 + self.nsec as f64 / NANOS_PER_SEC as f64
    }

    /// True when the span is zero or negative.
    #[must_use]
    pub fn is_non_positive(&self) -> bool {
        self.sec < 0 || (self.sec == 0 && self.nsec == 0)
    }
}

/// Compute `a - b` with borrow from the seconds field.
#[must_use]
pub fn diff_time(a: &TimeMark, b: &TimeMark) -> TimeDelta {
    let mut sec = a.sec - b.sec;
    let mut nsec = a.nsec - b.nsec;
    if nsec < 0 {
        sec -= 1;
        nsec += NANOS_PER_SEC;
    }
    TimeDelta { sec, nsec }
}
