//! # Elementary geometry on the rotating Earth
//!
//! Rotation matrices, Earth-fixed unit vectors, the WGS-84 local radius and the
//! angle normalizations used by both collocation strategies.
//!
//! Two rotation conventions coexist:
//!
//! * [`rotmt`] rotates a **vector** counter-clockwise about an axis (active rotation).
//! * [`frame_rotation`] expresses a fixed vector in a **frame** rotated
//!   counter-clockwise about an axis (passive rotation, the IERS/SOFA `R1`, `R2`,
//!   `R3` matrices). It is the transpose of the active one.

use nalgebra::{Matrix3, Rotation3, Vector3};
use std::f64::consts::PI;

use crate::constants::{
    Kilometer, Meter, Radian, DPI, EARTH_EQUATORIAL_RADIUS, EARTH_POLAR_RADIUS,
};

/// Coordinate axis of a right-handed Cartesian frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Active rotation matrix of angle `alpha` about `axis`.
///
/// Arguments
/// ---------
/// * `alpha`: rotation angle in radians, counter-clockwise seen from the tip of the axis.
/// * `axis`: rotation axis.
///
/// Return
/// ----------
/// * The matrix `R` such that `R · v` is `v` rotated by `alpha`.
pub fn rotmt(alpha: Radian, axis: Axis) -> Matrix3<f64> {
    let axis = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Passive rotation matrix: coordinates of a fixed vector in a frame rotated by
/// `alpha` about `axis`.
pub fn frame_rotation(alpha: Radian, axis: Axis) -> Matrix3<f64> {
    rotmt(-alpha, axis)
}

/// Polar-motion matrix `W = R1(−yp) · R2(−xp)` taking terrestrial intermediate
/// coordinates to ITRS.
///
/// Arguments
/// ---------
/// * `xp`, `yp`: pole coordinates in radians.
pub fn polar_motion_matrix(xp: Radian, yp: Radian) -> Matrix3<f64> {
    frame_rotation(-yp, Axis::X) * frame_rotation(-xp, Axis::Y)
}

/// Local radius of the WGS-84 ellipsoid at a given latitude.
///
/// ```text
/// r(φ) = sqrt( ((a² cosφ)² + (b² sinφ)²) / ((a cosφ)² + (b sinφ)²) )
/// ```
///
/// Arguments
/// ---------
/// * `latitude`: latitude in radians.
///
/// Return
/// ----------
/// * Radius in kilometers, between the polar and equatorial radii.
pub fn earth_radius(latitude: Radian) -> Kilometer {
    let a = EARTH_EQUATORIAL_RADIUS;
    let b = EARTH_POLAR_RADIUS;
    let (s, c) = latitude.sin_cos();
    let num = (a * a * c).powi(2) + (b * b * s).powi(2);
    let den = (a * c).powi(2) + (b * s).powi(2);
    (num / den).sqrt()
}

/// Great-circle angle covered by `distance` meters at the given latitude.
pub fn spatial_tolerance_angle(distance: Meter, latitude: Radian) -> Radian {
    distance * 1.0e-3 / earth_radius(latitude)
}

/// Unit vector of a spherical longitude/latitude pair (radians).
pub fn unit_vector(longitude: Radian, latitude: Radian) -> Vector3<f64> {
    let (slon, clon) = longitude.sin_cos();
    let (slat, clat) = latitude.sin_cos();
    Vector3::new(clon * clat, slon * clat, slat)
}

/// Longitude/latitude (radians) of a non-zero vector.
pub fn longitude_latitude(v: &Vector3<f64>) -> (Radian, Radian) {
    let n = v.norm();
    (v.y.atan2(v.x), (v.z / n).clamp(-1.0, 1.0).asin())
}

/// Angle between two vectors.
///
/// Computed as `atan2(|a × b|, a · b)`, which keeps full precision for nearly
/// parallel vectors where `acos` of the dot product does not.
pub fn angular_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Bring an angle into `[−π, π]`. Angles already in range are returned unchanged.
pub fn constrain_to_pi_range(angle: Radian) -> Radian {
    if (-PI..=PI).contains(&angle) {
        angle
    } else {
        (angle + PI).rem_euclid(DPI) - PI
    }
}

/// Normalize a pair of delta arguments of latitude for a crossing search.
///
/// `end` is moved into `[−2π, 0]`. `start` is then moved by whole turns into
/// `[end + 2π·n − π, end + 2π·(n + 1) − π]` with `n = num_full_revs`, so that the
/// pair spans at most the number of revolutions completed between the two samples.
/// Values already in range are returned unchanged, which makes the function
/// idempotent.
///
/// Arguments
/// ---------
/// * `end`, `start`: delta arguments of latitude at the later and earlier sample.
/// * `num_full_revs`: completed revolutions between the samples. Callers floor the
///   fractional revolution count, so 1.9 revolutions pass as 1.
///
/// Return
/// ----------
/// * `(end, start)` after normalization.
pub fn constrain_angle_pair(end: Radian, start: Radian, num_full_revs: u32) -> (Radian, Radian) {
    let end = if (-DPI..=0.0).contains(&end) {
        end
    } else {
        end.rem_euclid(DPI) - DPI
    };

    let low = end + DPI * num_full_revs as f64 - PI;
    let high = end + DPI * (num_full_revs as f64 + 1.0) - PI;
    let start = if (low..=high).contains(&start) {
        start
    } else {
        low + (start - low).rem_euclid(DPI)
    };

    (end, start)
}

#[cfg(test)]
mod ref_system_test {
    use super::*;
    use crate::constants::RADEG;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_conventions() {
        let x = Vector3::x();
        let active = rotmt(PI / 2.0, Axis::Z) * x;
        assert_relative_eq!(active, Vector3::y(), epsilon = 1e-15);

        let passive = frame_rotation(PI / 2.0, Axis::Z) * x;
        assert_relative_eq!(passive, -Vector3::y(), epsilon = 1e-15);

        let r = frame_rotation(0.3, Axis::X);
        assert_relative_eq!(r * r.transpose(), Matrix3::identity(), epsilon = 1e-15);
    }

    #[test]
    fn test_polar_motion_identity_at_zero() {
        assert_relative_eq!(
            polar_motion_matrix(0.0, 0.0),
            Matrix3::identity(),
            epsilon = 1e-15
        );
        let w = polar_motion_matrix(1e-6, 2e-6);
        assert_relative_eq!(w.determinant(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_earth_radius() {
        assert_relative_eq!(earth_radius(0.0), EARTH_EQUATORIAL_RADIUS, epsilon = 1e-9);
        assert_relative_eq!(earth_radius(PI / 2.0), EARTH_POLAR_RADIUS, epsilon = 1e-9);
        assert_relative_eq!(earth_radius(-PI / 2.0), EARTH_POLAR_RADIUS, epsilon = 1e-9);
        let mid = earth_radius(45.0 * RADEG);
        assert!(mid > EARTH_POLAR_RADIUS && mid < EARTH_EQUATORIAL_RADIUS);
    }

    #[test]
    fn test_angular_distance() {
        let a = unit_vector(0.0, 0.0);
        let b = unit_vector(10.0 * RADEG, 0.0);
        assert_relative_eq!(angular_distance(&a, &b), 10.0 * RADEG, epsilon = 1e-14);
        assert_relative_eq!(angular_distance(&a, &a), 0.0);

        let tiny = unit_vector(1e-9, 0.0);
        assert_relative_eq!(angular_distance(&a, &tiny), 1e-9, max_relative = 1e-6);

        let (lon, lat) = longitude_latitude(&(unit_vector(-2.0, 0.4) * 7000.0));
        assert_relative_eq!(lon, -2.0, epsilon = 1e-14);
        assert_relative_eq!(lat, 0.4, epsilon = 1e-14);
    }

    #[test]
    fn test_constrain_to_pi_range() {
        assert_relative_eq!(constrain_to_pi_range(1.5 * PI), -0.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(constrain_to_pi_range(-1.5 * PI), 0.5 * PI, epsilon = 1e-12);
        assert_eq!(constrain_to_pi_range(0.25), 0.25);
        assert_eq!(constrain_to_pi_range(PI), PI);

        for a in [-20.0, -4.0, -PI, -1.0, 0.0, 2.0, PI, 3.5, 11.0, 1e6] {
            let once = constrain_to_pi_range(a);
            assert!((-PI..=PI).contains(&once));
            assert_eq!(constrain_to_pi_range(once), once);
        }
    }

    #[test]
    fn test_constrain_angle_pair() {
        let (end, start) = constrain_angle_pair(0.5, 1.0, 0);
        assert_relative_eq!(end, 0.5 - DPI, epsilon = 1e-12);
        assert_relative_eq!(start, 1.0 - DPI, epsilon = 1e-12);

        let (end, start) = constrain_angle_pair(-0.1, 0.2, 0);
        assert_eq!((end, start), (-0.1, 0.2));

        // one full revolution between the samples pushes start one turn ahead
        let (end, start) = constrain_angle_pair(-0.1, 0.2, 1);
        assert_eq!(end, -0.1);
        assert_relative_eq!(start, 0.2 + DPI, epsilon = 1e-12);

        for n in 0..3 {
            for (e, s) in [(3.0, -3.0), (-7.0, 9.0), (0.0, 0.0), (-DPI, PI), (12.0, -40.0)] {
                let once = constrain_angle_pair(e, s, n);
                assert!(once.0 <= 0.0 && once.0 >= -DPI);
                assert!((once.1 - once.0).abs() < DPI * (n as f64 + 1.0));
                assert_eq!(constrain_angle_pair(once.0, once.1, n), once);
            }
        }
    }
}
