//! Calendar dates and the 1900 second count.
//!
//! Every time standard handled by the crate is carried internally as a count of
//! seconds since 1900-01-01T00:00:00 of that standard, ignoring leap seconds. The
//! count is split into an integer part and a fraction so that sub-microsecond
//! differences survive across decades. [`Calendar`] is the broken-down view of such
//! a count; the Gregorian arithmetic is delegated to hifitime, whose TAI epoch is the
//! same 1900-01-01T00:00:00 origin.

use std::cmp::Ordering;
use std::fmt;

use hifitime::Epoch;

use crate::constants::SECONDS_PER_DAY_I64;
use crate::rotcol_errors::RotcolError;
use crate::time::Instant;

/// Seconds since 1900-01-01T00:00:00 of one time standard, without leap seconds.
///
/// The fraction always lies in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SecondCount {
    pub(crate) whole: i64,
    pub(crate) fraction: f64,
}

impl SecondCount {
    pub(crate) fn new(whole: i64, fraction: f64) -> Self {
        let carry = fraction.floor();
        let mut whole = whole + carry as i64;
        let mut fraction = fraction - carry;
        // -1e-17 floors to -1 and leaves 1.0 after the subtraction
        if fraction >= 1.0 {
            whole += 1;
            fraction -= 1.0;
        }
        SecondCount { whole, fraction }
    }

    /// Shift the count by a (possibly negative, possibly large) number of seconds.
    pub(crate) fn offset(self, seconds: f64) -> Self {
        let whole = seconds.floor();
        SecondCount::new(self.whole + whole as i64, self.fraction + (seconds - whole))
    }

    /// `self − other` in seconds.
    pub(crate) fn seconds_since(self, other: SecondCount) -> f64 {
        (self.whole - other.whole) as f64 + (self.fraction - other.fraction)
    }

    pub(crate) fn as_seconds(self) -> f64 {
        self.whole as f64 + self.fraction
    }

    pub(crate) fn total_cmp(&self, other: &SecondCount) -> Ordering {
        self.whole
            .cmp(&other.whole)
            .then(self.fraction.total_cmp(&other.fraction))
    }
}

/// Broken-down calendar representation of an instant in one time standard.
///
/// `second` is fractional. A value in `[60, 61)` denotes the inserted leap second
/// (`23:59:60.x`) and only appears for UTC under
/// [`UtcConvention::System2`](crate::time::time_system::UtcConvention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calendar {
    pub year: i32,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
}

impl Calendar {
    /// Build a validated calendar date.
    ///
    /// Arguments
    /// ---------
    /// * `year`, `month` (1–12), `day` (1–days in month), `hour` (0–23), `minute` (0–59)
    /// * `second`: fractional second in `[0, 61)`
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` if any field is out of range.
    pub fn new(
        year: i32,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: f64,
    ) -> Result<Self, RotcolError> {
        if !(1..=12).contains(&month) {
            return Err(RotcolError::InvalidArgument(format!(
                "month {month} outside 1..=12"
            )));
        }
        if day == 0 || day > days_in_month(year, month) {
            return Err(RotcolError::InvalidArgument(format!(
                "day {day} invalid for {year}-{month:02}"
            )));
        }
        if hour > 23 || minute > 59 {
            return Err(RotcolError::InvalidArgument(format!(
                "time of day {hour:02}:{minute:02} out of range"
            )));
        }
        if !(0.0..61.0).contains(&second) {
            return Err(RotcolError::InvalidArgument(format!(
                "second {second} outside [0, 61)"
            )));
        }
        Ok(Calendar {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Midnight of the given date.
    pub fn date(year: i32, month: u8, day: u8) -> Result<Self, RotcolError> {
        Calendar::new(year, month, day, 0, 0, 0.0)
    }

    pub(crate) fn from_count(count: SecondCount) -> Self {
        let whole_seconds = Instant::from_tai_parts(count.whole, 0.0).to_epoch();
        let (year, month, day, hour, minute, second, _) = whole_seconds.to_gregorian_tai();
        Calendar {
            year,
            month,
            day,
            hour,
            minute,
            second: second as f64 + count.fraction,
        }
    }

    /// Second count of this date read in its own standard.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` when the fields (which are public) do not
    ///   form a valid date and time of day.
    pub(crate) fn to_count(&self) -> Result<SecondCount, RotcolError> {
        if !(0.0..61.0).contains(&self.second) {
            return Err(RotcolError::InvalidArgument(format!(
                "second {} outside [0, 61)",
                self.second
            )));
        }
        let start_of_minute = Epoch::maybe_from_gregorian_tai(
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            0,
            0,
        )
        .map_err(|e| RotcolError::InvalidArgument(format!("{self:?}: {e}")))?;
        let (whole, _) = Instant::from_epoch(start_of_minute).tai_parts();
        Ok(SecondCount::new(whole, self.second))
    }

    fn days_since_1900(&self) -> Result<i64, RotcolError> {
        Ok(self.to_count()?.whole.div_euclid(SECONDS_PER_DAY_I64))
    }

    /// Day of year, 1 for January 1st.
    pub fn day_of_year(&self) -> u16 {
        (1..self.month)
            .map(|m| days_in_month(self.year, m) as u16)
            .sum::<u16>()
            + self.day as u16
    }

    /// Day of week, 0 for Sunday.
    pub fn day_of_week(&self) -> Result<u8, RotcolError> {
        // 1900-01-01 was a Monday
        Ok((self.days_since_1900()? + 1).rem_euclid(7) as u8)
    }

    /// ISO 8601 representation truncated to whole seconds, `YYYY-MM-DDTHH:MM:SS`.
    pub fn isoformat(&self) -> String {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second.floor() as u8
        )
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let micro = ((self.second - self.second.floor()) * 1e6).floor() as u32;
        write!(f, "{}.{:06}", self.isoformat(), micro)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}
