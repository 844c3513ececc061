//! # Rotation collocation
//!
//! Each sounding is sampled at a few sub-occultation times around its nominal time
//! and moved into the orbital frame of the nadir satellite
//! ([`OrbitFrameTransform`]). Between two consecutive samples the along-track angle
//! `atan2(y, x)` decreases as the satellite flies on; when it goes through a
//! multiple of `2π` the satellite passes the sounding. The cross-track angle
//! `asin(z)` at that instant, interpolated linearly between the samples, tells
//! whether the sounding lies inside the swath.
//!
//! No footprint is ever read: the result is an approximate [`Collocation`] whose
//! footprint is resolved later by [`Collocation::refine`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use rotcol::search::rotation::RotationCollocation;
//!
//! let search = RotationCollocation::new(3).unwrap();
//! assert_eq!(search.n_subocc(), 3);
//! assert!(RotationCollocation::new(1).is_err());
//! ```

use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::Vector3;

use crate::collocation::collocation_list::CollocationList;
use crate::collocation::Collocation;
use crate::constants::{Meter, Radian, DPI, EARTH_POLAR_RADIUS};
use crate::instruments::NadirInstrument;
use crate::occultation::Occultation;
use crate::orbit::earth_orientation::{EarthOrientation, MeanEarthOrientation};
use crate::ref_system::{constrain_angle_pair, constrain_to_pi_range};
use crate::report::{AdvisoryKind, Report};
use crate::rotcol_errors::RotcolError;
use crate::search::nadir_frame::{sub_occultation_offsets, OrbitFrameTransform};
use crate::search::{validate_soundings, CollocationSearch, SearchParams};
use crate::time::time_system::TimeSystem;

/// Crossing of the satellite track found between two frame samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossingEstimate {
    /// Cross-track angle of the sounding when the satellite passes it, radians.
    pub estimated_scan_angle: Radian,
    pub start_scan_angle: Radian,
    pub end_scan_angle: Radian,
    /// Position of the crossing between the samples: 0 at the first, 1 at the second.
    pub fraction: f64,
}

/// Look for the satellite passing a sounding between two orbital-frame samples.
///
/// The along-track angles of the samples are normalized with
/// [`constrain_angle_pair`] so that the first one is ahead of the second by at most
/// `num_revs + 1` turns. The cross-track angle is then fitted linearly against the
/// along-track angle and evaluated at every multiple of `2π` bracketed by the
/// samples, the smallest first. A sample lying within `spatial_tolerance` of the
/// track is a crossing by itself; the second sample takes precedence over the first,
/// and both over an interior crossing.
///
/// Arguments
/// ---------
/// * `prev`, `curr`: frame vectors at the earlier and later sample.
/// * `max_scan_angle`: largest cross-track angle covered by the swath, radians.
/// * `num_revs`: orbital revolutions elapsed between the samples.
/// * `spatial_tolerance`: meters.
///
/// Return
/// ----------
/// * The first crossing inside `(−max_scan_angle, max_scan_angle)`, if any.
pub fn compare_points_in_nadir_frame(
    prev: &Vector3<f64>,
    curr: &Vector3<f64>,
    max_scan_angle: Radian,
    num_revs: f64,
    spatial_tolerance: Meter,
) -> Option<CrossingEstimate> {
    let full_revs = num_revs.max(0.0).floor() as u32;
    let (end_arglat, start_arglat) =
        constrain_angle_pair(curr.y.atan2(curr.x), prev.y.atan2(prev.x), full_revs);

    let start_scan_angle = constrain_to_pi_range(prev.z.clamp(-1.0, 1.0).asin());
    let end_scan_angle = constrain_to_pi_range(curr.z.clamp(-1.0, 1.0).asin());
    let estimate = |estimated_scan_angle, fraction| CrossingEstimate {
        estimated_scan_angle,
        start_scan_angle,
        end_scan_angle,
        fraction,
    };

    let near_track = (spatial_tolerance * 1.0e-3 / EARTH_POLAR_RADIUS).cos();
    if end_arglat.cos() > near_track && end_scan_angle.abs() < max_scan_angle {
        return Some(estimate(end_scan_angle, 1.0));
    }
    if start_arglat.cos() > near_track && start_scan_angle.abs() < max_scan_angle {
        return Some(estimate(start_scan_angle, 0.0));
    }

    let span = start_arglat - end_arglat;
    (0..=full_revs + 1)
        .map(|k| DPI * k as f64)
        .filter(|&wrap| end_arglat < wrap && wrap < start_arglat)
        .find_map(|wrap| {
            let fraction = (start_arglat - wrap) / span;
            let scan_angle = start_scan_angle + (end_scan_angle - start_scan_angle) * fraction;
            (scan_angle.abs() < max_scan_angle).then(|| estimate(scan_angle, fraction))
        })
}

/// Collocation search in the orbital frame of the nadir satellite.
pub struct RotationCollocation {
    n_subocc: usize,
    earth_orientation: Arc<dyn EarthOrientation>,
}

impl Default for RotationCollocation {
    fn default() -> Self {
        RotationCollocation {
            n_subocc: 2,
            earth_orientation: Arc::new(MeanEarthOrientation),
        }
    }
}

impl RotationCollocation {
    /// Search sampling every sounding `n_subocc` times over its time window.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` when `n_subocc < 2`: a crossing needs two
    ///   samples to be interpolated.
    pub fn new(n_subocc: usize) -> Result<Self, RotcolError> {
        if n_subocc < 2 {
            return Err(RotcolError::InvalidArgument(format!(
                "rotation collocation needs at least 2 sub-occultations, got {n_subocc}"
            )));
        }
        Ok(RotationCollocation {
            n_subocc,
            ..Default::default()
        })
    }

    pub fn with_earth_orientation(mut self, earth_orientation: Arc<dyn EarthOrientation>) -> Self {
        self.earth_orientation = earth_orientation;
        self
    }

    pub fn n_subocc(&self) -> usize {
        self.n_subocc
    }

    /// First accepted crossing of one sounding, in ascending sample order.
    fn first_crossing(
        &self,
        transform: &OrbitFrameTransform,
        instrument: &Arc<dyn NadirInstrument>,
        sounding: &Occultation,
        params: &SearchParams,
        time_system: &TimeSystem,
    ) -> Result<Option<Collocation>, RotcolError> {
        let geometry = instrument.geometry();
        let tle = transform.tle();
        let latitude = sounding.latitude_rad();

        let offsets = sub_occultation_offsets(params.time_tolerance, self.n_subocc)?;
        let frames = transform.rotate(sounding, params.time_tolerance, self.n_subocc)?;
        let max_scan_angle = geometry.max_scan_angle_with(
            tle,
            sounding.time.julian_date(time_system),
            latitude,
            params.spatial_tolerance,
        )?;

        for ((&t_prev, prev), (&t_curr, curr)) in offsets.iter().zip(&frames).tuple_windows() {
            let step = t_curr - t_prev;
            let Some(crossing) = compare_points_in_nadir_frame(
                prev,
                curr,
                max_scan_angle,
                step / tle.orbital_period(),
                params.spatial_tolerance,
            ) else {
                continue;
            };

            let time = sounding.time + t_prev + crossing.fraction * step;
            let refined_max = geometry.max_scan_angle_with(
                tle,
                time.julian_date(time_system),
                latitude,
                params.spatial_tolerance,
            )?;
            if crossing.estimated_scan_angle.abs() > refined_max {
                debug!(
                    "{}: crossing at {:.4} rad outside the swath ({refined_max:.4} rad)",
                    sounding.occid, crossing.estimated_scan_angle
                );
                continue;
            }

            return Ok(Some(Collocation::approximate(
                sounding.clone(),
                Arc::clone(instrument),
                sounding.longitude,
                sounding.latitude,
                time,
                crossing.estimated_scan_angle,
            )));
        }
        Ok(None)
    }
}

impl CollocationSearch for RotationCollocation {
    fn name(&self) -> &'static str {
        "rotation"
    }

    fn search(
        &self,
        instrument: &Arc<dyn NadirInstrument>,
        soundings: &[Occultation],
        params: &SearchParams,
        time_system: &TimeSystem,
    ) -> Result<Report<CollocationList>, RotcolError> {
        validate_soundings(soundings)?;
        let mut report = Report::new(CollocationList::default());
        if soundings.is_empty() {
            warn!("Rotation collocation called without any sounding");
            report.push(AdvisoryKind::EmptyBatch, "no sounding to collocate");
            return Ok(report);
        }

        let transform = OrbitFrameTransform::prepare(
            instrument.geometry(),
            time_system,
            soundings,
            self.earth_orientation.as_ref(),
        )?;

        for sounding in soundings {
            match self.first_crossing(&transform, instrument, sounding, params, time_system)? {
                Some(collocation) => report.data.push(collocation),
                None => debug!("{}: no crossing with {}", sounding.occid, instrument.label()),
            }
        }

        info!(
            "Rotation collocation: {} of {} sounding(s) collocated with {}",
            report.data.len(),
            soundings.len(),
            instrument.label()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod rotation_test {
    use super::*;
    use crate::constants::RADEG;
    use crate::ref_system::unit_vector;

    /// Frame vector of a sounding `along` radians ahead of the satellite and
    /// `across` radians off-track.
    fn frame(along: Radian, across: Radian) -> Vector3<f64> {
        unit_vector(along, across)
    }

    #[test]
    fn test_interior_crossing() {
        let prev = frame(0.05, 0.01);
        let curr = frame(-0.05, 0.02);

        let c = compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.05, 1_000.0).unwrap();
        assert!(c.start_scan_angle < c.estimated_scan_angle);
        assert!(c.estimated_scan_angle < c.end_scan_angle);
        assert!((c.fraction - 0.5).abs() < 1e-12);
        assert!((c.estimated_scan_angle - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_crossing_with_scan_angle_sign_flip() {
        let prev = frame(0.2, -0.03);
        let curr = frame(-0.1, 0.06);

        let c = compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.05, 1_000.0).unwrap();
        assert!(c.start_scan_angle < 0.0 && c.end_scan_angle > 0.0);
        assert!(c.start_scan_angle < c.estimated_scan_angle);
        assert!(c.estimated_scan_angle < c.end_scan_angle);
        assert!((c.estimated_scan_angle - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_crossing_outside_swath() {
        let prev = frame(0.05, 0.30);
        let curr = frame(-0.05, 0.32);
        assert!(compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.05, 1_000.0).is_none());
    }

    #[test]
    fn test_no_crossing_before_or_after() {
        // satellite still approaching at both samples
        let prev = frame(0.30, 0.01);
        let curr = frame(0.10, 0.01);
        assert!(compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.05, 1_000.0).is_none());

        // satellite already gone
        let prev = frame(-0.10, 0.01);
        let curr = frame(-0.30, 0.01);
        assert!(compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.05, 1_000.0).is_none());

        // sounding on the far side of the Earth
        let prev = frame(3.0, 0.01);
        let curr = frame(-3.0, 0.01);
        assert!(compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.05, 1_000.0).is_none());
    }

    #[test]
    fn test_crossing_on_a_sample() {
        // 1 km from the track, within a 10 km tolerance
        let near = 1.0 / EARTH_POLAR_RADIUS;
        let end = compare_points_in_nadir_frame(
            &frame(0.10, 0.05),
            &frame(-near, 0.04),
            0.2,
            0.05,
            10_000.0,
        )
        .unwrap();
        assert_eq!(end.fraction, 1.0);
        assert_eq!(end.estimated_scan_angle, end.end_scan_angle);

        let start = compare_points_in_nadir_frame(
            &frame(near, 0.05),
            &frame(-0.10, 0.04),
            0.2,
            0.05,
            10_000.0,
        )
        .unwrap();
        assert_eq!(start.fraction, 0.0);
        assert_eq!(start.estimated_scan_angle, start.start_scan_angle);
    }

    #[test]
    fn test_crossing_after_full_revolutions() {
        // 340 degrees apart: a backward step, unless a revolution went by in between
        let prev = frame(170.0 * RADEG, 0.02);
        let curr = frame(-170.0 * RADEG, 0.02);
        assert!(compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.0, 1_000.0).is_none());

        let c = compare_points_in_nadir_frame(&prev, &curr, 0.2, 1.05, 1_000.0).unwrap();
        assert!(c.fraction > 0.0 && c.fraction < 1.0);
        assert!((c.estimated_scan_angle - 0.02).abs() < 1e-12);

        // partial revolutions are floored
        assert!(compare_points_in_nadir_frame(&prev, &curr, 0.2, 0.95, 1_000.0).is_none());
        assert_eq!(compare_points_in_nadir_frame(&prev, &curr, 0.2, 1.95, 1_000.0), Some(c));
    }

    #[test]
    fn test_n_subocc() {
        assert!(matches!(
            RotationCollocation::new(1),
            Err(RotcolError::InvalidArgument(_))
        ));
        assert!(RotationCollocation::new(0).is_err());
        assert_eq!(RotationCollocation::new(4).unwrap().n_subocc(), 4);
        assert_eq!(RotationCollocation::default().n_subocc(), 2);
    }
}
