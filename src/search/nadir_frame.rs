//! # Orbital frame of a nadir scanner
//!
//! A sounding is expressed in the frame that follows the carrying satellite: the x
//! axis points at the satellite, the z axis along the orbital angular momentum. In
//! that frame `atan2(y, x)` is the along-track angle still to travel before the
//! satellite passes the sounding, and `asin(z)` is the Earth-central cross-track
//! angle of the sounding. A footprint can only cover the sounding when the
//! along-track angle reaches zero while the cross-track angle lies inside the swath.
//!
//! The atmosphere is taken as co-rotating with the Earth: a sounding sampled `dt`
//! seconds away from its nominal time has moved `ω⊕·dt` in inertial longitude.
//!
//! The element set and the Earth orientation are looked up once per batch, before
//! any sounding is transformed. A missing element set therefore fails the batch.

use log::{debug, info};
use nalgebra::Vector3;

use crate::constants::{JulianDate, Radian, Seconds, EARTH_ROTATION_RATE};
use crate::instruments::ScannerGeometry;
use crate::occultation::Occultation;
use crate::orbit::earth_orientation::{EarthOrientation, OrientationCache};
use crate::orbit::propagator::ClassicalElements;
use crate::orbit::tle::TwoLineElement;
use crate::ref_system::{frame_rotation, longitude_latitude, unit_vector, Axis};
use crate::rotcol_errors::RotcolError;
use crate::time::time_system::TimeSystem;

/// Offsets of the sub-occultation samples from the nominal sounding time.
///
/// `n_subocc` samples evenly spread over `[−time_tolerance, time_tolerance]`, in
/// ascending order. A single sample sits at the nominal time.
///
/// Return
/// ----------
/// * `Err(RotcolError::InvalidArgument)` when `n_subocc` is zero.
pub fn sub_occultation_offsets(
    time_tolerance: Seconds,
    n_subocc: usize,
) -> Result<Vec<Seconds>, RotcolError> {
    match n_subocc {
        0 => Err(RotcolError::InvalidArgument(
            "at least one sub-occultation sample is needed".into(),
        )),
        1 => Ok(vec![0.0]),
        n => {
            let half = (n - 1) as f64 / 2.0;
            let step = 2.0 * time_tolerance / (n - 1) as f64;
            Ok((0..n).map(|i| (i as f64 - half) * step).collect())
        }
    }
}

/// Batch-level state needed to move soundings into the orbital frame.
pub struct OrbitFrameTransform<'a> {
    geometry: &'a ScannerGeometry,
    time_system: &'a TimeSystem,
    tle: TwoLineElement,
    orientation: OrientationCache,
}

impl<'a> OrbitFrameTransform<'a> {
    /// Look the element set up at the time of the first sounding and cache the Earth
    /// orientation of every day touched by the batch.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::MissingOrbitData)` when no element set is close enough to
    ///   the first sounding, `Err(RotcolError::InvalidArgument)` for an empty batch.
    pub fn prepare(
        geometry: &'a ScannerGeometry,
        time_system: &'a TimeSystem,
        soundings: &[Occultation],
        earth_orientation: &dyn EarthOrientation,
    ) -> Result<Self, RotcolError> {
        let first = soundings.first().ok_or_else(|| {
            RotcolError::InvalidArgument("no sounding to move into the orbital frame".into())
        })?;

        let tle = geometry.nearest_orbit_elements(time_system, first.time)?;
        let orientation = OrientationCache::build(
            earth_orientation,
            soundings.iter().map(|s| s.time.julian_date(time_system)),
        )?;

        info!(
            "Orbital frame of satellite {} prepared for {} sounding(s)",
            tle.satellite_number,
            soundings.len()
        );

        Ok(OrbitFrameTransform {
            geometry,
            time_system,
            tle,
            orientation,
        })
    }

    /// Element set shared by the whole batch.
    pub fn tle(&self) -> &TwoLineElement {
        &self.tle
    }

    pub fn orientation(&self) -> &OrientationCache {
        &self.orientation
    }

    /// Inertial (TEME) longitude and latitude of a sounding at its nominal time.
    pub fn inertial_position(&self, sounding: &Occultation) -> Result<(Radian, Radian), RotcolError> {
        let jd = sounding.time.julian_date(self.time_system);
        let teme = self.orientation.itrs_to_teme(jd)? * sounding.unit_vector();
        Ok(longitude_latitude(&teme))
    }

    /// Classical elements of the satellite at `jd`.
    pub fn elements_at(&self, jd: JulianDate) -> Result<ClassicalElements, RotcolError> {
        let state = self.geometry.propagate(&self.tle, jd)?;
        Ok(self.geometry.propagator().classical_elements(&state))
    }

    /// Orbital-frame unit vector of an inertial direction at `jd`.
    pub fn to_orbit_frame(
        &self,
        inertial_longitude: Radian,
        inertial_latitude: Radian,
        jd: JulianDate,
    ) -> Result<Vector3<f64>, RotcolError> {
        let elements = self.elements_at(jd)?;
        let in_node_frame = unit_vector(inertial_longitude - elements.raan, inertial_latitude);

        Ok(frame_rotation(elements.argument_of_latitude, Axis::Z)
            * frame_rotation(elements.inclination, Axis::X)
            * in_node_frame)
    }

    /// Frame vectors of one sounding at its sub-occultation times.
    ///
    /// Arguments
    /// ---------
    /// * `sounding`: the RO sounding.
    /// * `time_tolerance`: half width of the sampled window, seconds.
    /// * `n_subocc`: number of samples.
    ///
    /// Return
    /// ----------
    /// * `n_subocc` unit vectors, in ascending time order.
    pub fn rotate(
        &self,
        sounding: &Occultation,
        time_tolerance: Seconds,
        n_subocc: usize,
    ) -> Result<Vec<Vector3<f64>>, RotcolError> {
        let offsets = sub_occultation_offsets(time_tolerance, n_subocc)?;
        let (longitude, latitude) = self.inertial_position(sounding)?;

        offsets
            .iter()
            .map(|&dt| {
                let jd = (sounding.time + dt).julian_date(self.time_system);
                self.to_orbit_frame(longitude + EARTH_ROTATION_RATE * dt, latitude, jd)
            })
            .collect()
    }

    /// [`OrbitFrameTransform::rotate`] applied to every sounding of a batch.
    pub fn rotate_batch(
        &self,
        soundings: &[Occultation],
        time_tolerance: Seconds,
        n_subocc: usize,
    ) -> Result<Vec<Vec<Vector3<f64>>>, RotcolError> {
        let frames = soundings
            .iter()
            .map(|s| self.rotate(s, time_tolerance, n_subocc))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("{} sounding(s) rotated with {n_subocc} sample(s) each", frames.len());
        Ok(frames)
    }
}
