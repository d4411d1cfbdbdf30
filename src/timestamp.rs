// ABOUTME: The BSON internal timestamp: 32-bit seconds in the high half, a counter in the low half.
// ABOUTME: Encoded on the wire as a single little-endian u64.

use crate::generator::IdGenerator;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Internal replication timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    /// A fresh timestamp for the current second from the process-wide generator.
    #[must_use]
    pub fn now() -> Self {
        IdGenerator::global().timestamp()
    }

    /// A fresh timestamp for `time` from the process-wide generator.
    #[must_use]
    pub fn new<Tz: TimeZone>(time: DateTime<Tz>) -> Self {
        IdGenerator::global().timestamp_at(time)
    }

    /// A timestamp for `time` with an explicit counter.
    ///
    /// Seconds saturate: times before 1970 store 0 and times past the u32
    /// range store `u32::MAX`.
    #[must_use]
    pub fn with_counter<Tz: TimeZone>(time: DateTime<Tz>, counter: u32) -> Self {
        Self::from_parts(unix_seconds(&time), counter)
    }

    #[must_use]
    pub const fn from_parts(seconds: u32, counter: u32) -> Self {
        Self(((seconds as u64) << 32) | counter as u64)
    }

    #[must_use]
    pub const fn from_u64(v: u64) -> Self {
        Self(v)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn seconds(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[must_use]
    pub const fn counter(self) -> u32 {
        self.0 as u32
    }

    #[must_use]
    pub fn time(self) -> DateTime<Utc> {
        Utc.timestamp_opt(i64::from(self.seconds()), 0)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}, {})", self.seconds(), self.counter())
    }
}

/// Whole seconds since the Unix epoch as a u32, clamped to 0 for times
/// before 1970 and to `u32::MAX` for times after early 2106.
pub(crate) fn unix_seconds<Tz: TimeZone>(time: &DateTime<Tz>) -> u32 {
    u32::try_from(time.timestamp().max(0)).unwrap_or(u32::MAX)
}

impl From<u64> for Timestamp {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl From<Timestamp> for u64 {
    fn from(t: Timestamp) -> u64 {
        t.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let t = Timestamp::from_parts(1_703_596_962, 7);
        assert_eq!(t.seconds(), 1_703_596_962);
        assert_eq!(t.counter(), 7);
        assert_eq!(t.as_u64(), (1_703_596_962u64 << 32) | 7);
        assert_eq!(t.to_string(), "Timestamp(1703596962, 7)");
        assert_eq!(t.time().timestamp(), 1_703_596_962);
    }

    #[test]
    fn test_with_counter() {
        let time = Utc.timestamp_opt(1_703_596_962, 500_000_000).unwrap();
        let t = Timestamp::with_counter(time, 9);
        assert_eq!(t, Timestamp::from_parts(1_703_596_962, 9));
        assert_eq!(Timestamp::new(time).seconds(), 1_703_596_962);
    }

    #[test]
    fn test_seconds_saturate_outside_u32_range() {
        let before_epoch = Utc.timestamp_opt(-86_400, 0).unwrap();
        assert_eq!(Timestamp::with_counter(before_epoch, 1).seconds(), 0);

        let after_2106 = Utc.with_ymd_and_hms(2200, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Timestamp::with_counter(after_2106, 1).seconds(), u32::MAX);
        assert_eq!(Timestamp::with_counter(after_2106, 1).counter(), 1);
    }

    #[test]
    fn test_now_increments_counter() {
        let a = Timestamp::now();
        let b = Timestamp::now();
        assert_ne!(a, b);
    }
}
