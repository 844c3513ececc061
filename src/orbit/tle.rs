//! Two-line element sets and the providers that hand them out.
//!
//! Lines are decoded by [`sgp4::Elements::from_tle`]; [`TwoLineElement`] keeps the
//! mean elements in radians and the epoch as a UTC Julian date, which is what the
//! searches work with.

use itertools::Itertools;
use log::debug;

use crate::constants::{
    JulianDate, Radian, DAYS_PER_JULIAN_YEAR, DPI, JD_J2000, MAX_TLE_AGE_DAYS, RADEG,
};
use crate::rotcol_errors::RotcolError;

/// Mean orbital elements of one satellite at one epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoLineElement {
    pub satellite_number: u64,
    /// Epoch as a UTC Julian date.
    pub epoch: JulianDate,
    pub inclination: Radian,
    pub raan: Radian,
    pub eccentricity: f64,
    pub argument_of_perigee: Radian,
    pub mean_anomaly: Radian,
    /// Mean motion in revolutions per day.
    pub mean_motion: f64,
    /// B* drag term (1 / Earth radii).
    pub bstar: f64,
}

impl TwoLineElement {
    /// Parse the two data lines of a TLE.
    ///
    /// Arguments
    /// ---------
    /// * `line1`, `line2`: the 69-column lines (trailing blanks are ignored).
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidTle)` when the lines are rejected by the SGP4 element
    ///   parser (wrong line numbers or lengths, checksum mismatch, unparsable fields).
    pub fn parse(line1: &str, line2: &str) -> Result<Self, RotcolError> {
        let elements =
            sgp4::Elements::from_tle(None, line1.trim_end().as_bytes(), line2.trim_end().as_bytes())
                .map_err(|e| RotcolError::InvalidTle(format!("{e:?}")))?;
        Ok(TwoLineElement::from(&elements))
    }

    /// Parse every 2-line or 3-line (named) element set of a text file.
    pub fn parse_batch(input: &str) -> Result<Vec<Self>, RotcolError> {
        let lines = input
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect_vec();

        let mut tles = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            if lines[i].starts_with('1') && lines.get(i + 1).is_some_and(|l| l.starts_with('2')) {
                tles.push(TwoLineElement::parse(lines[i], lines[i + 1])?);
                i += 2;
            } else {
                // satellite name or unrelated line
                i += 1;
            }
        }
        Ok(tles)
    }

    /// Mean motion in radians per minute.
    pub fn mean_motion_rad_per_min(&self) -> f64 {
        self.mean_motion * DPI / 1440.0
    }

    /// Orbital period in seconds.
    pub fn orbital_period(&self) -> f64 {
        86_400.0 / self.mean_motion
    }

    /// Epoch in Julian years since J2000, the time origin of SGP4.
    pub fn epoch_years_since_j2000(&self) -> f64 {
        (self.epoch - JD_J2000) / DAYS_PER_JULIAN_YEAR
    }
}

/// Milliseconds per day; the SGP4 epoch carries millisecond resolution.
const MS_PER_DAY: f64 = 86_400_000.0;

impl From<&sgp4::Elements> for TwoLineElement {
    fn from(elements: &sgp4::Elements) -> Self {
        // round away the float noise of the years-since-J2000 representation
        let days = (elements.epoch() * DAYS_PER_JULIAN_YEAR * MS_PER_DAY).round() / MS_PER_DAY;
        TwoLineElement {
            satellite_number: elements.norad_id,
            epoch: JD_J2000 + days,
            inclination: elements.inclination * RADEG,
            raan: elements.right_ascension * RADEG,
            eccentricity: elements.eccentricity,
            argument_of_perigee: elements.argument_of_perigee * RADEG,
            mean_anomaly: elements.mean_anomaly * RADEG,
            mean_motion: elements.mean_motion,
            bstar: elements.drag_term,
        }
    }
}

/// Source of element sets for one satellite.
pub trait TleProvider: Send + Sync {
    /// Element set whose epoch is closest to `jd` (UTC Julian date).
    ///
    /// Fails with [`RotcolError::MissingOrbitData`] when the closest epoch is more than
    /// 12 hours away.
    fn nearest(&self, jd: JulianDate) -> Result<TwoLineElement, RotcolError>;
}

/// In-memory set of element sets, sorted by epoch.
#[derive(Debug, Clone, Default)]
pub struct TleCatalog {
    tles: Vec<TwoLineElement>,
}

impl TleCatalog {
    pub fn new(tles: Vec<TwoLineElement>) -> Self {
        let tles = tles
            .into_iter()
            .sorted_by(|a, b| a.epoch.total_cmp(&b.epoch))
            .collect();
        TleCatalog { tles }
    }

    pub fn from_text(input: &str) -> Result<Self, RotcolError> {
        Ok(TleCatalog::new(TwoLineElement::parse_batch(input)?))
    }

    pub fn len(&self) -> usize {
        self.tles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tles.is_empty()
    }
}

impl TleProvider for TleCatalog {
    fn nearest(&self, jd: JulianDate) -> Result<TwoLineElement, RotcolError> {
        let split = self.tles.partition_point(|t| t.epoch < jd);
        let candidates = [split.checked_sub(1), Some(split)];
        let best = candidates
            .iter()
            .flatten()
            .filter_map(|&i| self.tles.get(i))
            .min_by(|a, b| (a.epoch - jd).abs().total_cmp(&(b.epoch - jd).abs()));

        match best {
            Some(tle) if (tle.epoch - jd).abs() <= MAX_TLE_AGE_DAYS => {
                debug!(
                    "TLE of satellite {} at JD {:.5} chosen for JD {jd:.5}",
                    tle.satellite_number, tle.epoch
                );
                Ok(tle.clone())
            }
            Some(tle) => Err(RotcolError::MissingOrbitData(format!(
                "closest element set is {:.2} h away from JD {jd:.5}",
                (tle.epoch - jd).abs() * 24.0
            ))),
            None => Err(RotcolError::MissingOrbitData(
                "no element set available".into(),
            )),
        }
    }
}
