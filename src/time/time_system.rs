//! # Leap-second aware time service
//!
//! [`TimeSystem`] owns the active leap-second table and performs every conversion
//! that depends on it: TAI ↔ UTC, calendar views, Julian dates and GPS week
//! bookkeeping. TAI is the canonical scale of [`Instant`]; GPS is a fixed 19 s
//! offset from TAI and UTC is derived through the table.
//!
//! ## Lifecycle
//!
//! The table is loaded once with [`TimeSystem::load`] (or [`TimeSystem::builtin`]),
//! and refreshed only through [`TimeSystem::refresh_if_stale`], which takes `&mut self`.
//! Conversions borrow the service immutably, so a refresh can never happen in the
//! middle of a computation.
//!
//! ## UTC conventions
//!
//! Around an inserted leap second, TAI runs one second longer than the UTC day:
//!
//! * [`UtcConvention::System1`]: `23:59:59` is shown twice.
//! * [`UtcConvention::System2`]: the extra second is shown as `23:59:60`.

use std::fs;
use std::str::FromStr;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use hifitime::Epoch;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{
    JulianDate, GPS_EPOCH_1900, JD_1900, SECONDS_PER_DAY, SECONDS_PER_WEEK, TAI_MINUS_GPS,
};
use crate::rotcol_errors::RotcolError;
use crate::time::calendar::{Calendar, SecondCount};
use crate::time::leap_seconds::{current_year_month, LeapSecondSource, LeapSecondTable};
use crate::time::Instant;

/// How UTC labels the inserted leap second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UtcConvention {
    /// `23:59:59` repeats before the leap second.
    System1,
    /// `23:59:60` exists.
    #[default]
    System2,
}

/// Time standards an [`Instant`] can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeStandard {
    Utc,
    Tai,
    Gps,
}

impl FromStr for TimeStandard {
    type Err = RotcolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utc" => Ok(TimeStandard::Utc),
            "tai" => Ok(TimeStandard::Tai),
            "gps" => Ok(TimeStandard::Gps),
            other => Err(RotcolError::InvalidArgument(format!(
                "time standard must be utc, tai or gps, got {other:?}"
            ))),
        }
    }
}

/// GPS week bookkeeping of an instant at or after the GPS epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsTime {
    pub week: i64,
    /// 0 for Sunday.
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: f64,
}

/// Settings used by [`TimeSystem::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSystemConfig {
    /// Cached leap-second file. `None` disables the cache.
    pub leap_second_file: Option<Utf8PathBuf>,
    pub convention: UtcConvention,
    /// Use the compiled-in table when the cache file does not exist.
    pub allow_builtin: bool,
}

impl Default for TimeSystemConfig {
    fn default() -> Self {
        TimeSystemConfig {
            leap_second_file: default_leap_second_file(),
            convention: UtcConvention::default(),
            allow_builtin: true,
        }
    }
}

/// `<user cache dir>/rotcol/leap_seconds.txt`, if a cache directory exists.
pub fn default_leap_second_file() -> Option<Utf8PathBuf> {
    let base_dir = BaseDirs::new()?;
    let cache = Utf8PathBuf::from_path_buf(base_dir.cache_dir().to_path_buf()).ok()?;
    Some(cache.join("rotcol").join("leap_seconds.txt"))
}

/// Owner of the leap-second table and of all table-dependent conversions.
#[derive(Debug, Clone)]
pub struct TimeSystem {
    table: LeapSecondTable,
    convention: UtcConvention,
    cache_file: Option<Utf8PathBuf>,
}

impl TimeSystem {
    pub fn new(table: LeapSecondTable, convention: UtcConvention) -> Self {
        TimeSystem {
            table,
            convention,
            cache_file: None,
        }
    }

    /// Time system backed by the compiled-in leap-second table.
    pub fn builtin(convention: UtcConvention) -> Result<Self, RotcolError> {
        Ok(TimeSystem::new(LeapSecondTable::builtin()?, convention))
    }

    /// Load the leap-second table according to `config`.
    ///
    /// The cache file is preferred. Without one, the compiled-in table is used if
    /// `allow_builtin` is set.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::NoLeapSecondData)` if neither source is available.
    /// * Parse and I/O errors of an existing but unreadable cache file.
    pub fn load(config: &TimeSystemConfig) -> Result<Self, RotcolError> {
        let cached = config
            .leap_second_file
            .as_ref()
            .filter(|path| path.exists());

        let table = match cached {
            Some(path) => {
                info!("Loading leap second table from {path}");
                LeapSecondTable::from_file(path)?
            }
            None if config.allow_builtin => {
                info!("No cached leap second table, using the compiled-in table");
                LeapSecondTable::builtin()?
            }
            None => {
                return Err(RotcolError::NoLeapSecondData(format!(
                    "no leap second file at {:?} and built-in table disabled",
                    config.leap_second_file
                )))
            }
        };

        Ok(TimeSystem {
            table,
            convention: config.convention,
            cache_file: config.leap_second_file.clone(),
        })
    }

    pub fn convention(&self) -> UtcConvention {
        self.convention
    }

    pub fn table(&self) -> &LeapSecondTable {
        &self.table
    }

    /// True when the table was retrieved in an earlier half-year than `now` (UTC year, month).
    pub fn is_stale(&self, now: (i32, u8)) -> bool {
        self.table.is_stale(now)
    }

    /// [`TimeSystem::refresh_if_stale_at`] evaluated at the current system time.
    pub fn refresh_if_stale(&mut self, source: &dyn LeapSecondSource) -> Result<bool, RotcolError> {
        self.refresh_if_stale_at(current_year_month()?, source)
    }

    /// Replace a stale table with fresh content from `source`.
    ///
    /// When the fetch or the parse fails the current table is kept and the failure is
    /// logged; the call then returns `Ok(false)`. The new text is written to the cache
    /// file when one is configured.
    ///
    /// Return
    /// ----------
    /// * `Ok(true)` if the table was replaced, `Ok(false)` otherwise.
    /// * `Err(RotcolError::IoError)` if the cache file cannot be written.
    pub fn refresh_if_stale_at(
        &mut self,
        now: (i32, u8),
        source: &dyn LeapSecondSource,
    ) -> Result<bool, RotcolError> {
        if !self.is_stale(now) {
            return Ok(false);
        }

        let fresh = source
            .fetch()
            .and_then(|text| LeapSecondTable::parse(&text, now).map(|table| (text, table)));

        match fresh {
            Ok((text, table)) => {
                info!(
                    "Leap second table refreshed from {} ({} entries)",
                    source.describe(),
                    table.entries().len()
                );
                if let Some(path) = &self.cache_file {
                    if let Some(dir) = path.parent() {
                        fs::create_dir_all(dir)?;
                    }
                    fs::write(path, text)?;
                }
                self.table = table;
                Ok(true)
            }
            Err(e) => {
                warn!(
                    "Leap second table is stale and refresh from {} failed: {e}",
                    source.describe()
                );
                Ok(false)
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Conversions
    // ---------------------------------------------------------------------------------------------

    /// UTC count of a TAI count, and whether it falls inside an inserted leap second.
    fn utc_count(&self, tai: SecondCount) -> (SecondCount, bool) {
        self.utc_count_in(tai, self.convention)
    }

    fn utc_count_in(&self, tai: SecondCount, convention: UtcConvention) -> (SecondCount, bool) {
        let entries = self.table.entries();
        for (i, entry) in entries.iter().enumerate().rev() {
            let utc = tai.offset(-entry.tai_minus_utc);
            let accepted = match convention {
                UtcConvention::System1 => {
                    utc.total_cmp(&entry.effective_count.offset(-1.0)).is_ge()
                }
                UtcConvention::System2 => utc.total_cmp(&entry.effective_count).is_ge(),
            };
            if accepted {
                // Under System 2 an older entry can yield a UTC count past the next
                // boundary: that is the leap second itself.
                let in_leap = entries
                    .get(i + 1)
                    .is_some_and(|next| utc.total_cmp(&next.effective_count).is_ge());
                return (utc, in_leap);
            }
        }
        let oldest = entries.first().map_or(0.0, |e| e.tai_minus_utc);
        (tai.offset(-oldest), false)
    }

    /// TAI count of a UTC count (no leap-second notation).
    ///
    /// Before the oldest table entry the oldest offset is applied unchanged, so that
    /// this stays the inverse of [`TimeSystem::calendar`] there. NASA's CDF library
    /// uses the oldest offset minus one second instead; dates before 1960 therefore
    /// differ from CDF by one second.
    fn tai_count(&self, utc: SecondCount) -> SecondCount {
        let offset = self
            .table
            .entries()
            .iter()
            .rev()
            .find(|entry| utc.total_cmp(&entry.effective_count).is_ge())
            .or_else(|| self.table.entries().first())
            .map_or(0.0, |entry| entry.tai_minus_utc);
        utc.offset(offset)
    }

    /// Instant of a UTC calendar date. `second ≥ 60` addresses the inserted leap second.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` if the calendar fields are not a valid date.
    pub fn from_utc(&self, utc: &Calendar) -> Result<Instant, RotcolError> {
        if utc.second >= 60.0 {
            let before = Calendar {
                second: utc.second - 1.0,
                ..*utc
            };
            return Ok(Instant::from_count(
                self.tai_count(before.to_count()?).offset(1.0),
            ));
        }
        Ok(Instant::from_count(self.tai_count(utc.to_count()?)))
    }

    pub fn from_tai(&self, tai: &Calendar) -> Result<Instant, RotcolError> {
        Ok(Instant::from_count(tai.to_count()?))
    }

    pub fn from_gps(&self, gps: &Calendar) -> Result<Instant, RotcolError> {
        Ok(Instant::from_count(gps.to_count()?.offset(TAI_MINUS_GPS)))
    }

    /// Instant from seconds elapsed since the GPS epoch (1980-01-06T00:00:00 GPS).
    pub fn from_gps_seconds(&self, seconds: f64) -> Instant {
        Instant::from_count(SecondCount::new(GPS_EPOCH_1900, 0.0).offset(seconds + TAI_MINUS_GPS))
    }

    /// Current instant, read from the system clock through hifitime.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::SystemClock)` if the clock cannot be read.
    pub fn now(&self) -> Result<Instant, RotcolError> {
        let now = Epoch::now().map_err(|e| RotcolError::SystemClock(e.to_string()))?;
        let (year, month, day, hour, minute, second, nanos) = now.to_gregorian_utc();
        self.from_utc(&Calendar {
            year,
            month,
            day,
            hour,
            minute,
            second: second as f64 + nanos as f64 * 1e-9,
        })
    }

    /// Calendar view of `instant` in the requested standard.
    pub fn calendar(&self, instant: Instant, standard: TimeStandard) -> Calendar {
        match standard {
            TimeStandard::Tai => Calendar::from_count(instant.count()),
            TimeStandard::Gps => Calendar::from_count(instant.count().offset(-TAI_MINUS_GPS)),
            TimeStandard::Utc => {
                let (utc, in_leap) = self.utc_count(instant.count());
                if in_leap {
                    let mut cal = Calendar::from_count(utc.offset(-1.0));
                    cal.second += 1.0;
                    cal
                } else {
                    Calendar::from_count(utc)
                }
            }
        }
    }

    /// Calendar view of `instant` in the standard named `"utc"`, `"tai"` or `"gps"`.
    pub fn to(&self, instant: Instant, standard: &str) -> Result<Calendar, RotcolError> {
        Ok(self.calendar(instant, standard.parse()?))
    }

    /// TAI − UTC at `instant`, in seconds.
    pub fn tai_minus_utc(&self, instant: Instant) -> f64 {
        let (utc, _) = self.utc_count(instant.count());
        instant.count().seconds_since(utc)
    }

    /// Julian date derived from the UTC representation.
    ///
    /// A Julian date has no room for `23:59:60`: during an inserted leap second it
    /// holds at the following midnight, whatever the convention. The result never
    /// decreases with `instant`.
    pub fn julian_date(&self, instant: Instant) -> JulianDate {
        let (utc, in_leap) = self.utc_count_in(instant.count(), UtcConvention::System2);
        let utc = if in_leap {
            SecondCount::new(utc.whole, 0.0)
        } else {
            utc
        };
        JD_1900 + utc.whole as f64 / SECONDS_PER_DAY + utc.fraction / SECONDS_PER_DAY
    }

    /// Instant of a UTC Julian date, the inverse of [`TimeSystem::julian_date`].
    pub fn from_julian_date(&self, jd: JulianDate) -> Instant {
        let days = jd - JD_1900;
        let whole_days = days.floor();
        let utc = SecondCount::new(whole_days as i64 * 86_400, 0.0)
            .offset((days - whole_days) * SECONDS_PER_DAY);
        Instant::from_count(self.tai_count(utc))
    }

    /// Seconds elapsed since the GPS epoch.
    pub fn gps_seconds(&self, instant: Instant) -> f64 {
        instant
            .count()
            .offset(-TAI_MINUS_GPS)
            .seconds_since(SecondCount::new(GPS_EPOCH_1900, 0.0))
    }

    /// GPS week and seconds into that week.
    pub fn gps_week_seconds(&self, instant: Instant) -> (i64, f64) {
        let gps = instant.count().offset(-TAI_MINUS_GPS);
        let elapsed = gps.whole - GPS_EPOCH_1900;
        let week = elapsed.div_euclid(SECONDS_PER_WEEK);
        let seconds = elapsed.rem_euclid(SECONDS_PER_WEEK) as f64 + gps.fraction;
        (week, seconds)
    }

    /// GPS week, day of week and time of day, `None` before the GPS epoch.
    pub fn gps_time(&self, instant: Instant) -> Option<GpsTime> {
        let gps = instant.count().offset(-TAI_MINUS_GPS);
        if gps.whole < GPS_EPOCH_1900 {
            return None;
        }
        let (week, _) = self.gps_week_seconds(instant);
        let cal = Calendar::from_count(gps);
        Some(GpsTime {
            week,
            day_of_week: cal.day_of_week().ok()?,
            hour: cal.hour,
            minute: cal.minute,
            second: cal.second,
        })
    }
}
