//! Orbit propagation seam.
//!
//! [`OrbitPropagator`] is the collaborator the collocation searches use to place the
//! nadir satellite at a given Julian date. [`Sgp4Propagator`] runs the SGP4 model of
//! the `sgp4` crate on the element set closest in time.

use nalgebra::Vector3;

use crate::constants::{JulianDate, Kilometer, Radian, DPI, GM_EARTH};
use crate::orbit::tle::TwoLineElement;
use crate::rotcol_errors::RotcolError;

/// TEME position (km) and velocity (km/s).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// Osculating classical elements.
///
/// For circular orbits the argument of perigee is set to zero and the true anomaly
/// equals the argument of latitude; for equatorial orbits the node is taken on the
/// x axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassicalElements {
    pub semi_major_axis: Kilometer,
    pub eccentricity: f64,
    pub inclination: Radian,
    pub raan: Radian,
    pub argument_of_perigee: Radian,
    pub true_anomaly: Radian,
    pub argument_of_latitude: Radian,
}

/// Propagates element sets to arbitrary dates.
pub trait OrbitPropagator: Send + Sync {
    /// State of the satellite described by `tle` at the UTC Julian date `jd`.
    fn propagate(&self, tle: &TwoLineElement, jd: JulianDate) -> Result<StateVector, RotcolError>;

    /// Classical elements of a propagated state.
    fn classical_elements(&self, state: &StateVector) -> ClassicalElements {
        classical_elements(state, GM_EARTH)
    }
}

/// Convert a Cartesian state to classical elements.
///
/// Arguments
/// ---------
/// * `state`: position and velocity in km and km/s.
/// * `mu`: gravitational parameter in km³/s².
///
/// Return
/// ----------
/// * The classical elements, angles in `[0, 2π)`.
pub fn classical_elements(state: &StateVector, mu: f64) -> ClassicalElements {
    const SMALL: f64 = 1e-11;

    let r = state.position;
    let v = state.velocity;
    let rn = r.norm();
    let h = r.cross(&v);
    let hn = h.norm();
    let h_hat = h / hn;

    let e_vec = ((v.norm_squared() - mu / rn) * r - r.dot(&v) * v) / mu;
    let eccentricity = e_vec.norm();
    let energy = 0.5 * v.norm_squared() - mu / rn;
    let semi_major_axis = -mu / (2.0 * energy);
    let inclination = (h.z / hn).clamp(-1.0, 1.0).acos();

    let node = Vector3::new(-h.y, h.x, 0.0);
    let (node_hat, raan) = if node.norm() > SMALL * hn {
        let nh = node.normalize();
        (nh, nh.y.atan2(nh.x).rem_euclid(DPI))
    } else {
        (Vector3::x(), 0.0)
    };

    // signed angle from `from` to `to`, measured about the angular momentum
    let in_plane_angle =
        |from: &Vector3<f64>, to: &Vector3<f64>| from.cross(to).dot(&h_hat).atan2(from.dot(to));

    let argument_of_latitude = in_plane_angle(&node_hat, &r).rem_euclid(DPI);
    let (argument_of_perigee, true_anomaly) = if eccentricity > SMALL {
        (
            in_plane_angle(&node_hat, &e_vec).rem_euclid(DPI),
            in_plane_angle(&e_vec, &r).rem_euclid(DPI),
        )
    } else {
        (0.0, argument_of_latitude)
    };

    ClassicalElements {
        semi_major_axis,
        eccentricity,
        inclination,
        raan,
        argument_of_perigee,
        true_anomaly,
        argument_of_latitude,
    }
}

/// SGP4 propagation with the WGS84 geopotential.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4Propagator;

impl Sgp4Propagator {
    /// SGP4 constants of an element set.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` for eccentricities outside `[0, 1)` or a
    ///   non-positive mean motion, `Err(RotcolError::Propagation)` when SGP4 refuses
    ///   the elements.
    pub fn constants(&self, tle: &TwoLineElement) -> Result<sgp4::Constants, RotcolError> {
        let e = tle.eccentricity;
        if !(0.0..1.0).contains(&e) || tle.mean_motion <= 0.0 {
            return Err(RotcolError::InvalidArgument(format!(
                "cannot propagate element set with e = {e}, n = {}",
                tle.mean_motion
            )));
        }

        let orbit = sgp4::Orbit::from_kozai_elements(
            &sgp4::WGS84,
            tle.inclination,
            tle.raan,
            e,
            tle.argument_of_perigee,
            tle.mean_anomaly,
            tle.mean_motion_rad_per_min(),
        )
        .map_err(|err| RotcolError::Propagation(format!("{err:?}")))?;

        sgp4::Constants::new(
            sgp4::WGS84,
            sgp4::iau_epoch_to_sidereal_time,
            tle.epoch_years_since_j2000(),
            tle.bstar,
            orbit,
        )
        .map_err(|err| RotcolError::Propagation(format!("{err:?}")))
    }
}

impl OrbitPropagator for Sgp4Propagator {
    fn propagate(&self, tle: &TwoLineElement, jd: JulianDate) -> Result<StateVector, RotcolError> {
        let constants = self.constants(tle)?;
        let prediction = constants
            .propagate(sgp4::MinutesSinceEpoch((jd - tle.epoch) * 1440.0))
            .map_err(|err| {
                RotcolError::Propagation(format!(
                    "satellite {} at JD {jd:.5}: {err:?}",
                    tle.satellite_number
                ))
            })?;

        Ok(StateVector {
            position: Vector3::from(prediction.position),
            velocity: Vector3::from(prediction.velocity),
        })
    }
}
