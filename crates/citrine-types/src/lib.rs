//! # citrine-types: Core types for `Citrine`
//!
//! This crate contains shared types used across the `Citrine` simulation
//! substrate:
//! - Temporal types ([`Timestamp`], [`SimDuration`])
//! - Source identity ([`SourceId`])
//!
//! All simulation time is *virtual*: a [`Timestamp`] is a signed 64-bit
//! nanosecond count relative to the UTC epoch, advanced only by event
//! delivery, never by the wall clock.

use std::{
    fmt::{self, Display},
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Errors from calendar-based [`Timestamp`] constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimeError {
    /// The `YYYYMMDD` value does not name a calendar date.
    #[error("invalid calendar date: ymd={ymd}")]
    InvalidDate { ymd: u32 },

    /// The `HHMMSS` value does not name a time of day.
    #[error("invalid time of day: hms={hms}")]
    InvalidTime { hms: u32 },

    /// Sub-second component out of range (microseconds must be < 1_000_000).
    #[error("invalid microsecond count: usec={usec}")]
    InvalidMicros { usec: u32 },
}

// ============================================================================
// SimDuration
// ============================================================================

/// A signed span of virtual time, in nanoseconds.
///
/// Arithmetic is plain `i64` arithmetic; callers that accept wraparound risk
/// should use the `checked_*` variants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimDuration(i64);

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);

    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub const fn from_micros(us: i64) -> Self {
        Self(us * 1_000)
    }

    pub const fn from_millis(ms: i64) -> Self {
        Self(ms * 1_000_000)
    }

    pub const fn from_secs(s: i64) -> Self {
        Self(s * 1_000_000_000)
    }

    pub const fn from_minutes(m: i64) -> Self {
        Self::from_secs(m * 60)
    }

    pub const fn from_hours(h: i64) -> Self {
        Self::from_secs(h * 3_600)
    }

    pub const fn from_days(d: i64) -> Self {
        Self::from_secs(d * 86_400)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Span in seconds, as a float (lossy for very large spans).
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Span in 86 400-second days, as a float.
    pub fn as_days_f64(self) -> f64 {
        self.as_secs_f64() / 86_400.0
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, rhs: SimDuration) -> Option<SimDuration> {
        self.0.checked_add(rhs.0).map(SimDuration)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<SimDuration> {
        self.0.checked_mul(rhs).map(SimDuration)
    }
}

impl Add for SimDuration {
    type Output = SimDuration;

    fn add(self, rhs: Self) -> Self::Output {
        SimDuration(self.0 + rhs.0)
    }
}

impl Sub for SimDuration {
    type Output = SimDuration;

    fn sub(self, rhs: Self) -> Self::Output {
        SimDuration(self.0 - rhs.0)
    }
}

impl Neg for SimDuration {
    type Output = SimDuration;

    fn neg(self) -> Self::Output {
        SimDuration(-self.0)
    }
}

impl Mul<i64> for SimDuration {
    type Output = SimDuration;

    fn mul(self, rhs: i64) -> Self::Output {
        SimDuration(self.0 * rhs)
    }
}

impl Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

// ============================================================================
// Timestamp
// ============================================================================

/// A point in virtual time: nanoseconds since the UTC epoch.
///
/// Total order; ties between events at equal timestamps are broken by the
/// scheduling layer using stable identities, never by wall-clock state.
///
/// # Examples
///
/// ```
/// use citrine_types::{SimDuration, Timestamp};
///
/// let t0 = Timestamp::from_ymd_hms(20220707, 93000).unwrap();
/// let t1 = t0 + SimDuration::from_secs(30);
/// assert_eq!(format!("{t1}"), "20220707:093030.000000");
/// assert_eq!(t1 - t0, SimDuration::from_secs(30));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Midnight, 1 Jan 1970 UTC.
    pub const EPOCH: Timestamp = Timestamp(0);

    pub const fn from_nanos(ns: i64) -> Self {
        Self(ns)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Builds a timestamp from packed decimal date and time-of-day fields,
    /// e.g. `ymd = 20220610`, `hms = 162905` for 10 Jun 2022, 16:29:05 UTC.
    pub fn from_ymd_hms(ymd: u32, hms: u32) -> Result<Self, TimeError> {
        let year = (ymd / 10_000) as i32;
        let month = (ymd % 10_000) / 100;
        let day = ymd % 100;

        let hour = hms / 10_000;
        let minute = (hms % 10_000) / 100;
        let second = hms % 100;

        if NaiveDate::from_ymd_opt(year, month, day).is_none() {
            return Err(TimeError::InvalidDate { ymd });
        }

        let dt = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, second)
            .single()
            .ok_or(TimeError::InvalidTime { hms })?;

        Ok(Self(dt.timestamp() * 1_000_000_000))
    }

    /// Like [`Timestamp::from_ymd_hms`], with an additional microsecond
    /// component.
    pub fn from_ymd_hms_usec(ymd: u32, hms: u32, usec: u32) -> Result<Self, TimeError> {
        if usec >= 1_000_000 {
            return Err(TimeError::InvalidMicros { usec });
        }

        let base = Self::from_ymd_hms(ymd, hms)?;

        Ok(base + SimDuration::from_micros(i64::from(usec)))
    }

    /// Midnight UTC on date `ymd`, e.g. `ymd_midnight(20220707)`.
    pub fn ymd_midnight(ymd: u32) -> Result<Self, TimeError> {
        Self::from_ymd_hms(ymd, 0)
    }

    /// Adds a span, clamping at the representable extremes instead of
    /// wrapping.
    pub fn saturating_add(self, dt: SimDuration) -> Self {
        Timestamp(self.0.saturating_add(dt.as_nanos()))
    }

    pub fn checked_add(self, dt: SimDuration) -> Option<Self> {
        self.0.checked_add(dt.as_nanos()).map(Timestamp)
    }

    fn to_datetime(self) -> Option<DateTime<Utc>> {
        let secs = self.0.div_euclid(1_000_000_000);
        let subsec_ns = self.0.rem_euclid(1_000_000_000) as u32;

        DateTime::from_timestamp(secs, subsec_ns)
    }
}

impl Add<SimDuration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: SimDuration) -> Self::Output {
        Timestamp(self.0 + rhs.as_nanos())
    }
}

impl AddAssign<SimDuration> for Timestamp {
    fn add_assign(&mut self, rhs: SimDuration) {
        self.0 += rhs.as_nanos();
    }
}

impl Sub<SimDuration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, rhs: SimDuration) -> Self::Output {
        Timestamp(self.0 - rhs.as_nanos())
    }
}

impl SubAssign<SimDuration> for Timestamp {
    fn sub_assign(&mut self, rhs: SimDuration) {
        self.0 -= rhs.as_nanos();
    }
}

impl Sub for Timestamp {
    type Output = SimDuration;

    fn sub(self, rhs: Self) -> Self::Output {
        SimDuration::from_nanos(self.0 - rhs.0)
    }
}

/// Formats as `YYYYMMDD:HHMMSS.uuuuuu` (microsecond precision, UTC).
impl Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => {
                let usec = dt.nanosecond() / 1_000;
                write!(f, "{}.{usec:06}", dt.format("%Y%m%d:%H%M%S"))
            }
            None => write!(f, "<timestamp {}ns>", self.0),
        }
    }
}

// ============================================================================
// SourceId
// ============================================================================

/// Stable identity for an event source.
///
/// Allocated from a process-wide counter at source construction; used by the
/// reactor as the deterministic tie-break when two sources expose events at
/// the same virtual time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(u64);

impl SourceId {
    /// Allocates the next unused id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);

        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "src-{}", self.0)
    }
}

impl From<u64> for SourceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    #[test]
    fn epoch_formats_as_19700101() {
        assert_eq!(format!("{}", Timestamp::EPOCH), "19700101:000000.000000");
    }

    #[test]
    fn ymd_hms_usec_round_trips_through_display() {
        let t = Timestamp::from_ymd_hms_usec(20220610, 162905, 123_456).unwrap();
        assert_eq!(format!("{t}"), "20220610:162905.123456");
    }

    #[test]
    fn ymd_midnight_is_start_of_day() {
        let midnight = Timestamp::ymd_midnight(20220707).unwrap();
        let morning = Timestamp::from_ymd_hms(20220707, 93000).unwrap();

        assert_eq!(
            morning - midnight,
            SimDuration::from_hours(9) + SimDuration::from_minutes(30)
        );
    }

    #[test_case(20221301, 0 ; "month 13")]
    #[test_case(20220631, 0 ; "june 31st")]
    #[test_case(20220229, 0 ; "feb 29 in non-leap year")]
    fn invalid_dates_are_rejected(ymd: u32, hms: u32) {
        assert_eq!(
            Timestamp::from_ymd_hms(ymd, hms),
            Err(TimeError::InvalidDate { ymd })
        );
    }

    #[test_case(240000 ; "hour 24")]
    #[test_case(126000 ; "minute 60")]
    #[test_case(123061 ; "second 61")]
    fn invalid_times_are_rejected(hms: u32) {
        assert_eq!(
            Timestamp::from_ymd_hms(20220707, hms),
            Err(TimeError::InvalidTime { hms })
        );
    }

    #[test]
    fn oversized_micros_are_rejected() {
        assert_eq!(
            Timestamp::from_ymd_hms_usec(20220707, 0, 1_000_000),
            Err(TimeError::InvalidMicros { usec: 1_000_000 })
        );
    }

    #[test]
    fn duration_conversions_agree() {
        assert_eq!(SimDuration::from_secs(1), SimDuration::from_millis(1_000));
        assert_eq!(SimDuration::from_hours(1), SimDuration::from_minutes(60));
        assert_eq!(SimDuration::from_days(1), SimDuration::from_hours(24));
        assert!((SimDuration::from_days(1).as_days_f64() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn source_ids_are_unique_and_ordered() {
        let a = SourceId::next();
        let b = SourceId::next();

        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn timestamp_serializes_as_plain_nanos() {
        let t = Timestamp::from_ymd_hms(20220707, 93000).unwrap();

        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, t.as_nanos().to_string());
        assert_eq!(serde_json::from_str::<Timestamp>(&json).unwrap(), t);

        let d = SimDuration::from_millis(1_500);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(serde_json::from_str::<SimDuration>(&json).unwrap(), d);
    }

    proptest! {
        #[test]
        fn timestamp_duration_arithmetic_is_consistent(base in -1_000_000_000_000i64..1_000_000_000_000i64,
                                                       dt in -1_000_000_000_000i64..1_000_000_000_000i64) {
            let t = Timestamp::from_nanos(base);
            let d = SimDuration::from_nanos(dt);

            prop_assert_eq!((t + d) - t, d);
            prop_assert_eq!((t + d) - d, t);
        }

        #[test]
        fn display_is_sortable_for_same_day(a in 0i64..86_400_000_000i64,
                                            b in 0i64..86_400_000_000i64) {
            // Within one UTC day, lexicographic order of the display string
            // matches timestamp order.
            let day = Timestamp::ymd_midnight(20240102).unwrap();
            let ta = day + SimDuration::from_micros(a);
            let tb = day + SimDuration::from_micros(b);

            prop_assert_eq!(ta.cmp(&tb), format!("{ta}").cmp(&format!("{tb}")));
        }
    }
}
