//! Orbit collaborators of the nadir satellite: element sets, propagation and Earth
//! orientation.

pub mod earth_orientation;
pub mod propagator;
pub mod tle;
