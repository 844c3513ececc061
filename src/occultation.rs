//! Radio-occultation sounding as seen by the collocation searches.

use nalgebra::Vector3;

use crate::constants::{Degree, OccId, Radian, RADEG};
use crate::ref_system::unit_vector;
use crate::rotcol_errors::RotcolError;
use crate::time::Instant;

/// One RO sounding: identity, reference geolocation and time.
#[derive(Debug, Clone, PartialEq)]
pub struct Occultation {
    pub occid: OccId,
    /// Degrees east.
    pub longitude: Degree,
    /// Degrees north.
    pub latitude: Degree,
    pub time: Instant,
}

impl Occultation {
    /// Validated sounding.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` for a non-finite longitude, a latitude
    ///   outside `[−90°, 90°]`, or an empty identifier.
    pub fn new(
        occid: impl Into<OccId>,
        longitude: Degree,
        latitude: Degree,
        time: Instant,
    ) -> Result<Self, RotcolError> {
        let occ = Occultation {
            occid: occid.into(),
            longitude,
            latitude,
            time,
        };
        occ.validate()?;
        Ok(occ)
    }

    /// Check the invariants of a sounding built field by field.
    pub fn validate(&self) -> Result<(), RotcolError> {
        if self.occid.is_empty() {
            return Err(RotcolError::InvalidArgument(
                "occultation identifier is empty".into(),
            ));
        }
        if !self.longitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(RotcolError::InvalidArgument(format!(
                "occultation {} has invalid geolocation ({}, {})",
                self.occid, self.longitude, self.latitude
            )));
        }
        Ok(())
    }

    pub fn longitude_rad(&self) -> Radian {
        self.longitude * RADEG
    }

    pub fn latitude_rad(&self) -> Radian {
        self.latitude * RADEG
    }

    /// Earth-fixed unit vector of the sounding.
    pub fn unit_vector(&self) -> Vector3<f64> {
        unit_vector(self.longitude_rad(), self.latitude_rad())
    }
}

#[cfg(test)]
mod occultation_test {
    use super::*;
    use crate::time::calendar::Calendar;
    use crate::time::time_system::{TimeSystem, UtcConvention};
    use approx::assert_relative_eq;

    #[test]
    fn test_new_validates() {
        let ts = TimeSystem::builtin(UtcConvention::System2).unwrap();
        let t = ts.from_utc(&Calendar::date(2022, 3, 1).unwrap()).unwrap();

        let occ = Occultation::new("COSMIC2-G05-C2E1-2022-03-01-00-00", 90.0, 0.0, t).unwrap();
        assert_relative_eq!(occ.unit_vector(), Vector3::y(), epsilon = 1e-15);

        assert!(Occultation::new("x", 10.0, 90.5, t).is_err());
        assert!(Occultation::new("x", f64::NAN, 10.0, t).is_err());
        assert!(Occultation::new("x", 10.0, f64::NAN, t).is_err());
        assert!(Occultation::new("", 10.0, 10.0, t).is_err());
    }
}
