//! # Time representation
//!
//! [`Instant`] is the crate-wide point in time: a count of TAI seconds since
//! 1900-01-01T00:00:00 TAI, split into an integer part and a fraction in `[0, 1)`.
//! Arithmetic and ordering live in TAI and are therefore transparent to leap
//! seconds. Everything that needs the leap-second table (UTC views, Julian dates,
//! construction from UTC) goes through a [`TimeSystem`](time_system::TimeSystem).
//!
//! ## Example
//!
//! ```rust
//! use rotcol::time::{calendar::Calendar, time_system::{TimeSystem, UtcConvention}, Instant};
//!
//! let ts = TimeSystem::builtin(UtcConvention::System2).unwrap();
//! let t = Instant::builder()
//!     .utc(Calendar::new(2019, 3, 14, 6, 30, 0.0).unwrap())
//!     .build(&ts)
//!     .unwrap();
//! let later = t + 90.0;
//! assert_eq!(later - t, 90.0);
//! assert_eq!(ts.to(later, "utc").unwrap().minute, 31);
//! ```

pub mod calendar;
pub mod leap_seconds;
pub mod time_system;

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Sub, SubAssign};

use hifitime::{Duration, Epoch};

use crate::constants::JulianDate;
use crate::rotcol_errors::RotcolError;
use calendar::{Calendar, SecondCount};
use time_system::TimeSystem;

/// Seconds in one hifitime century (36525 days).
const SECONDS_PER_CENTURY: i64 = 3_155_760_000;

/// Point in time, canonically TAI.
#[derive(Debug, Clone, Copy)]
pub struct Instant {
    seconds: i64,
    fraction: f64,
}

impl Instant {
    pub(crate) fn from_count(count: SecondCount) -> Self {
        Instant {
            seconds: count.whole,
            fraction: count.fraction,
        }
    }

    pub(crate) fn count(&self) -> SecondCount {
        SecondCount::new(self.seconds, self.fraction)
    }

    /// Instant from whole TAI seconds since 1900-01-01 and a fraction of a second.
    pub fn from_tai_parts(seconds: i64, fraction: f64) -> Self {
        Instant::from_count(SecondCount::new(seconds, fraction))
    }

    /// `(whole seconds, fraction)` of TAI since 1900-01-01.
    pub fn tai_parts(&self) -> (i64, f64) {
        (self.seconds, self.fraction)
    }

    /// TAI seconds since 1900-01-01 as a single float (microsecond resolution today).
    pub fn tai_seconds(&self) -> f64 {
        self.count().as_seconds()
    }

    /// Start a builder taking exactly one of TAI, UTC or GPS.
    pub fn builder() -> InstantBuilder {
        InstantBuilder::default()
    }

    /// Calendar representation in `"utc"`, `"tai"` or `"gps"`.
    pub fn to(&self, time_system: &TimeSystem, standard: &str) -> Result<Calendar, RotcolError> {
        time_system.to(*self, standard)
    }

    pub fn julian_date(&self, time_system: &TimeSystem) -> JulianDate {
        time_system.julian_date(*self)
    }

    /// Same instant as a hifitime [`Epoch`].
    pub fn to_epoch(&self) -> Epoch {
        let centuries = self.seconds.div_euclid(SECONDS_PER_CENTURY);
        let rest = self.seconds.rem_euclid(SECONDS_PER_CENTURY) as u64;
        let nanos = rest * 1_000_000_000 + (self.fraction * 1e9).round() as u64;
        Epoch::from_tai_duration(Duration::from_parts(centuries as i16, nanos))
    }

    pub fn from_epoch(epoch: Epoch) -> Self {
        let (centuries, nanos) = epoch.to_tai_duration().to_parts();
        let whole = centuries as i64 * SECONDS_PER_CENTURY + (nanos / 1_000_000_000) as i64;
        let fraction = (nanos % 1_000_000_000) as f64 * 1e-9;
        Instant::from_tai_parts(whole, fraction)
    }
}

impl PartialEq for Instant {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Instant {}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.count().total_cmp(&other.count())
    }
}

impl Add<f64> for Instant {
    type Output = Instant;

    fn add(self, seconds: f64) -> Instant {
        Instant::from_count(self.count().offset(seconds))
    }
}

impl Sub<f64> for Instant {
    type Output = Instant;

    fn sub(self, seconds: f64) -> Instant {
        Instant::from_count(self.count().offset(-seconds))
    }
}

impl Sub<Instant> for Instant {
    type Output = f64;

    /// Elapsed TAI seconds.
    fn sub(self, other: Instant) -> f64 {
        self.count().seconds_since(other.count())
    }
}

impl AddAssign<f64> for Instant {
    fn add_assign(&mut self, seconds: f64) {
        *self = *self + seconds;
    }
}

impl SubAssign<f64> for Instant {
    fn sub_assign(&mut self, seconds: f64) {
        *self = *self - seconds;
    }
}

/// Builder for [`Instant`] accepting exactly one source representation.
#[derive(Debug, Clone, Default)]
pub struct InstantBuilder {
    tai: Option<Calendar>,
    utc: Option<Calendar>,
    gps: Option<Calendar>,
    gps_seconds: Option<f64>,
}

impl InstantBuilder {
    pub fn tai(mut self, v: Calendar) -> Self {
        self.tai = Some(v);
        self
    }
    pub fn utc(mut self, v: Calendar) -> Self {
        self.utc = Some(v);
        self
    }
    pub fn gps(mut self, v: Calendar) -> Self {
        self.gps = Some(v);
        self
    }
    /// Seconds since the GPS epoch.
    pub fn gps_seconds(mut self, v: f64) -> Self {
        self.gps_seconds = Some(v);
        self
    }

    /// Resolve the single given representation into an [`Instant`].
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` when no representation, or more than one,
    ///   was supplied, when the calendar is not a valid date, or when the GPS seconds
    ///   are not finite.
    pub fn build(self, time_system: &TimeSystem) -> Result<Instant, RotcolError> {
        let given = [
            self.tai.is_some(),
            self.utc.is_some(),
            self.gps.is_some(),
            self.gps_seconds.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();

        if given != 1 {
            return Err(RotcolError::InvalidArgument(format!(
                "exactly one of tai, utc or gps must be given, got {given}"
            )));
        }

        if let Some(tai) = self.tai {
            return time_system.from_tai(&tai);
        }
        if let Some(utc) = self.utc {
            return time_system.from_utc(&utc);
        }
        if let Some(gps) = self.gps {
            return time_system.from_gps(&gps);
        }
        match self.gps_seconds {
            Some(s) if s.is_finite() => Ok(time_system.from_gps_seconds(s)),
            _ => Err(RotcolError::InvalidArgument(
                "gps seconds must be finite".into(),
            )),
        }
    }
}
