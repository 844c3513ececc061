//! Earth orientation between the terrestrial frame of the soundings and the
//! true-equator mean-equinox (TEME) frame of the propagated orbits.
//!
//! The transformation used is
//!
//! ```text
//! v_TEME = (W · R3(θ))ᵀ · v_ITRS
//! ```
//!
//! with `W` the polar-motion matrix and `R3(θ)` the frame rotation by the Greenwich
//! mean sidereal angle. Evaluating `W` and `θ` is comparatively expensive (table
//! interpolation, polynomial in time) and both vary slowly, so a batch builds an
//! [`OrientationCache`] once, keyed by UTC day, and extrapolates the sidereal
//! angle inside a day with the Earth rotation rate.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::debug;
use nalgebra::Matrix3;

use crate::constants::{
    JulianDate, Radian, DPI, EARTH_ROTATION_RATE, JDTOMJD, MJD, RADSEC, SECONDS_PER_DAY, T2000,
};
use crate::ref_system::{frame_rotation, polar_motion_matrix, Axis};
use crate::rotcol_errors::RotcolError;

/// Provider of the Earth orientation parameters needed by the nadir-frame transform.
pub trait EarthOrientation: Send + Sync {
    /// Pole coordinates `(xp, yp)` in radians at the UTC Julian date `jd`.
    fn polar_motion(&self, jd: JulianDate) -> Result<(Radian, Radian), RotcolError>;

    /// Greenwich sidereal angle in radians at the UTC Julian date `jd`.
    fn sidereal_angle(&self, jd: JulianDate) -> Result<Radian, RotcolError>;
}

/// Greenwich mean sidereal time (IAU 1982 model).
///
/// Arguments
/// ---------
/// * `tjm`: Modified Julian Date in UT1.
///
/// Return
/// ----------
/// * GMST in radians, in `[0, 2π)`.
pub fn gmst(tjm: MJD) -> Radian {
    // GMST at 0h UT1, seconds
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    // sidereal to solar day ratio
    const RAP: f64 = 1.00273790934;

    let day = tjm.floor();
    let t = (day - T2000) / 36525.0;
    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / SECONDS_PER_DAY;

    (gmst0 + (tjm - day) * DPI * RAP).rem_euclid(DPI)
}

/// Zero polar motion and GMST with UT1 taken equal to UTC.
///
/// Good to a few hundred meters on the ground, well below the spatial tolerance of
/// any collocation search.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanEarthOrientation;

impl EarthOrientation for MeanEarthOrientation {
    fn polar_motion(&self, _jd: JulianDate) -> Result<(Radian, Radian), RotcolError> {
        Ok((0.0, 0.0))
    }

    fn sidereal_angle(&self, jd: JulianDate) -> Result<Radian, RotcolError> {
        Ok(gmst(jd - JDTOMJD))
    }
}

/// One day of tabulated Earth orientation parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EopRecord {
    pub mjd: MJD,
    /// Pole x coordinate, arcseconds.
    pub xp: f64,
    /// Pole y coordinate, arcseconds.
    pub yp: f64,
    /// UT1 − UTC, seconds.
    pub dut1: f64,
}

/// Earth orientation interpolated linearly in a table of daily records.
#[derive(Debug, Clone)]
pub struct TabulatedEarthOrientation {
    records: Vec<EopRecord>,
}

impl TabulatedEarthOrientation {
    /// Build the table. At least two records are needed to interpolate.
    pub fn new(records: Vec<EopRecord>) -> Result<Self, RotcolError> {
        if records.len() < 2 {
            return Err(RotcolError::InvalidArgument(format!(
                "at least two Earth orientation records are needed, got {}",
                records.len()
            )));
        }
        let records = records
            .into_iter()
            .sorted_by(|a, b| a.mjd.total_cmp(&b.mjd))
            .collect();
        Ok(TabulatedEarthOrientation { records })
    }

    /// Parse whitespace-separated `mjd xp yp dut1` lines; `#` starts a comment.
    pub fn parse(text: &str) -> Result<Self, RotcolError> {
        let mut records = Vec::new();
        for line in text.lines() {
            let content = line.split('#').next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            let values: Vec<f64> = content
                .split_whitespace()
                .map(str::parse)
                .collect::<Result<_, _>>()
                .map_err(|_| {
                    RotcolError::InvalidArgument(format!("bad Earth orientation line: {line}"))
                })?;
            match values[..] {
                [mjd, xp, yp, dut1] => records.push(EopRecord { mjd, xp, yp, dut1 }),
                _ => {
                    return Err(RotcolError::InvalidArgument(format!(
                        "expected 4 columns in Earth orientation line: {line}"
                    )))
                }
            }
        }
        TabulatedEarthOrientation::new(records)
    }

    fn interpolate(&self, jd: JulianDate) -> Result<EopRecord, RotcolError> {
        let mjd = jd - JDTOMJD;
        let first = self.records[0];
        let last = self.records[self.records.len() - 1];
        if mjd < first.mjd || mjd > last.mjd {
            return Err(RotcolError::InvalidArgument(format!(
                "MJD {mjd:.3} outside of the Earth orientation table [{}, {}]",
                first.mjd, last.mjd
            )));
        }

        let upper = self
            .records
            .partition_point(|r| r.mjd <= mjd)
            .clamp(1, self.records.len() - 1);
        let (a, b) = (self.records[upper - 1], self.records[upper]);
        let w = (mjd - a.mjd) / (b.mjd - a.mjd);
        let lerp = |x: f64, y: f64| x + w * (y - x);

        Ok(EopRecord {
            mjd,
            xp: lerp(a.xp, b.xp),
            yp: lerp(a.yp, b.yp),
            dut1: lerp(a.dut1, b.dut1),
        })
    }
}

impl EarthOrientation for TabulatedEarthOrientation {
    fn polar_motion(&self, jd: JulianDate) -> Result<(Radian, Radian), RotcolError> {
        let eop = self.interpolate(jd)?;
        Ok((eop.xp * RADSEC, eop.yp * RADSEC))
    }

    fn sidereal_angle(&self, jd: JulianDate) -> Result<Radian, RotcolError> {
        let eop = self.interpolate(jd)?;
        Ok(gmst(jd - JDTOMJD + eop.dut1 / SECONDS_PER_DAY))
    }
}

#[derive(Debug, Clone, Copy)]
struct DayOrientation {
    midnight: JulianDate,
    sidereal_at_midnight: Radian,
    polar: Matrix3<f64>,
}

/// Earth orientation evaluated once per UTC day.
#[derive(Debug, Clone, Default)]
pub struct OrientationCache {
    days: BTreeMap<i64, DayOrientation>,
}

fn day_key(jd: JulianDate) -> i64 {
    (jd - 0.5).floor() as i64
}

impl OrientationCache {
    /// Evaluate `orientation` at midnight of every UTC day touched by `dates`.
    pub fn build(
        orientation: &dyn EarthOrientation,
        dates: impl IntoIterator<Item = JulianDate>,
    ) -> Result<Self, RotcolError> {
        let mut days = BTreeMap::new();
        for key in dates.into_iter().map(day_key).unique() {
            let midnight = key as f64 + 0.5;
            let (xp, yp) = orientation.polar_motion(midnight)?;
            days.insert(
                key,
                DayOrientation {
                    midnight,
                    sidereal_at_midnight: orientation.sidereal_angle(midnight)?,
                    polar: polar_motion_matrix(xp, yp),
                },
            );
        }
        debug!("Earth orientation cached for {} day(s)", days.len());
        Ok(OrientationCache { days })
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Cached day of `jd`, or the closest cached day when `jd` falls outside.
    fn day(&self, jd: JulianDate) -> Result<&DayOrientation, RotcolError> {
        let key = day_key(jd);
        let before = self.days.range(..=key).next_back();
        let after = self.days.range(key..).next();
        match (before, after) {
            (Some((k, d)), _) if *k == key => Ok(d),
            (Some((kb, db)), Some((ka, da))) => Ok(if key - kb <= ka - key { db } else { da }),
            (Some((_, d)), None) | (None, Some((_, d))) => Ok(d),
            (None, None) => Err(RotcolError::InvalidArgument(
                "Earth orientation cache is empty".into(),
            )),
        }
    }

    /// Sidereal angle at `jd`, extrapolated from the cached midnight value.
    pub fn sidereal_angle(&self, jd: JulianDate) -> Result<Radian, RotcolError> {
        let day = self.day(jd)?;
        Ok((day.sidereal_at_midnight
            + EARTH_ROTATION_RATE * (jd - day.midnight) * SECONDS_PER_DAY)
            .rem_euclid(DPI))
    }

    /// Matrix taking Earth-fixed (ITRS) coordinates to TEME at `jd`.
    pub fn itrs_to_teme(&self, jd: JulianDate) -> Result<Matrix3<f64>, RotcolError> {
        let day = self.day(jd)?;
        let theta = self.sidereal_angle(jd)?;
        Ok((day.polar * frame_rotation(theta, Axis::Z)).transpose())
    }
}
