//! Leap-second table.
//!
//! The table is read from the CDF leap-second text format published by NASA GSFC:
//!
//! ```text
//! ; comment lines start with a semicolon
//! ;  Year Month Day  Leap Seconds      Drift
//!    2015   7    1   36.0             0.0  0.0
//!    2017   1    1   37.0             0.0  0.0
//! ```
//!
//! Each entry gives the cumulative TAI − UTC offset effective from 00:00:00 UTC of
//! the listed date. The drift columns of the pre-1972 entries are not applied.

use std::fs;
use std::sync::LazyLock;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use hifitime::Epoch;
use itertools::Itertools;
use log::debug;
use regex::Regex;

use crate::rotcol_errors::RotcolError;
use crate::time::calendar::{Calendar, SecondCount};

/// Compiled-in copy of the leap-second table.
const BUILTIN_TABLE: &str = include_str!("../../data/leap_seconds.txt");

/// Month in which the compiled-in table was last checked against IERS Bulletin C.
const BUILTIN_TABLE_CHECKED: (i32, u8) = (2025, 7);

static LEAP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{4})\s+(\d{1,2})\s+(\d{1,2})\s+([-+]?\d+(?:\.\d*)?)(?:\s|$)").unwrap()
});

/// One row of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct LeapSecondEntry {
    /// UTC date from which the offset applies.
    pub effective: Calendar,
    /// Cumulative TAI − UTC in seconds.
    pub tai_minus_utc: f64,
    pub(crate) effective_count: SecondCount,
}

/// Sorted (oldest first) leap-second entries plus the month they were retrieved.
#[derive(Debug, Clone, PartialEq)]
pub struct LeapSecondTable {
    entries: Vec<LeapSecondEntry>,
    retrieved: (i32, u8),
}

impl LeapSecondTable {
    /// Parse a table in the CDF text format.
    ///
    /// Arguments
    /// ---------
    /// * `text`: content of a leap-second file.
    /// * `retrieved`: `(year, month)` at which the content was obtained, used by the
    ///   staleness policy.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidLeapSecondLine)` for a data line that does not parse.
    /// * `Err(RotcolError::NoLeapSecondData)` if the text holds no entry at all.
    pub fn parse(text: &str, retrieved: (i32, u8)) -> Result<Self, RotcolError> {
        let mut entries = Vec::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }
            let caps = LEAP_LINE
                .captures(trimmed)
                .ok_or_else(|| RotcolError::InvalidLeapSecondLine(trimmed.to_string()))?;

            let field = |i: usize| caps.get(i).map_or("", |m| m.as_str());
            let bad = || RotcolError::InvalidLeapSecondLine(trimmed.to_string());
            let year: i32 = field(1).parse().map_err(|_| bad())?;
            let month: u8 = field(2).parse().map_err(|_| bad())?;
            let day: u8 = field(3).parse().map_err(|_| bad())?;
            let tai_minus_utc: f64 = field(4).parse().map_err(|_| bad())?;

            let effective = Calendar::date(year, month, day).map_err(|_| bad())?;
            entries.push(LeapSecondEntry {
                effective,
                tai_minus_utc,
                effective_count: effective.to_count()?,
            });
        }

        if entries.is_empty() {
            return Err(RotcolError::NoLeapSecondData(
                "leap second text holds no entry".into(),
            ));
        }

        let entries = entries
            .into_iter()
            .sorted_by(|a, b| a.effective_count.total_cmp(&b.effective_count))
            .collect();

        Ok(LeapSecondTable { entries, retrieved })
    }

    /// Table shipped with the crate (last entry 2017-01-01, 37 s).
    pub fn builtin() -> Result<Self, RotcolError> {
        LeapSecondTable::parse(BUILTIN_TABLE, BUILTIN_TABLE_CHECKED)
    }

    /// Read a table from disk. The retrieval month is the file modification month (UTC).
    pub fn from_file(path: &Utf8Path) -> Result<Self, RotcolError> {
        let text = fs::read_to_string(path)?;
        let modified = fs::metadata(path)?.modified()?;
        debug!("leap second table read from {path}");
        LeapSecondTable::parse(&text, year_month_of(modified))
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> &[LeapSecondEntry] {
        &self.entries
    }

    pub fn retrieved(&self) -> (i32, u8) {
        self.retrieved
    }

    pub fn latest(&self) -> Option<&LeapSecondEntry> {
        self.entries.last()
    }

    /// A table goes stale once `now` falls in a later half-year than its retrieval.
    ///
    /// Leap seconds are only inserted at the end of June or December, so a table
    /// retrieved in a given half-year stays authoritative until that half-year ends.
    pub fn is_stale(&self, now: (i32, u8)) -> bool {
        half_year_index(now) > half_year_index(self.retrieved)
    }
}

fn half_year_index((year, month): (i32, u8)) -> i64 {
    2 * year as i64 + ((month.max(1) - 1) / 6) as i64
}

/// UTC `(year, month)` of a file timestamp.
pub(crate) fn year_month_of(time: SystemTime) -> (i32, u8) {
    let unix = match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    };
    let (year, month, ..) = Epoch::from_unix_seconds(unix).to_gregorian_utc();
    (year, month)
}

/// UTC `(year, month)` of the system clock.
pub(crate) fn current_year_month() -> Result<(i32, u8), RotcolError> {
    let now = Epoch::now().map_err(|e| RotcolError::SystemClock(e.to_string()))?;
    let (year, month, ..) = now.to_gregorian_utc();
    Ok((year, month))
}

/// Somewhere a fresh copy of the leap-second text can be obtained from.
///
/// Network retrieval is left to implementors outside this crate.
pub trait LeapSecondSource {
    /// Return the text of a leap-second file.
    fn fetch(&self) -> Result<String, RotcolError>;

    /// Human readable origin, used in log messages.
    fn describe(&self) -> String;
}

/// Leap-second text read from a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: Utf8PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

impl LeapSecondSource for FileSource {
    fn fetch(&self) -> Result<String, RotcolError> {
        Ok(fs::read_to_string(&self.path)?)
    }

    fn describe(&self) -> String {
        self.path.to_string()
    }
}
