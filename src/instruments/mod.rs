//! # Nadir-scanning instruments
//!
//! An instrument is seen by the collocation searches through two pieces:
//!
//! * [`ScannerGeometry`], a read-only bundle of scan constants plus the orbit
//!   collaborators needed to place the carrying satellite in space,
//! * the [`NadirInstrument`] capability, which turns a time window into a
//!   [`ScanSwathIndex`](scan_swath::ScanSwathIndex) and hands out the
//!   [`GranuleReader`] used to pull observation records later on.
//!
//! Data-provider specifics (download clients, NetCDF/HDF readers) live behind these
//! traits and are not part of this crate.

pub mod scan_swath;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, JulianDate, Meter, Radian, Seconds, RADEG};
use crate::orbit::propagator::{OrbitPropagator, Sgp4Propagator, StateVector};
use crate::orbit::tle::{TleProvider, TwoLineElement};
use crate::ref_system::{earth_radius, spatial_tolerance_angle};
use crate::rotcol_errors::RotcolError;
use crate::time::time_system::TimeSystem;
use crate::time::Instant;
use scan_swath::{FileHandleCache, ScanSwathIndex};

/// Instruments with built-in scan constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Advanced Microwave Sounding Unit-A (Metop).
    Amsua,
    /// Advanced Technology Microwave Sounder (Suomi-NPP, JPSS).
    Atms,
    /// Atmospheric Infrared Sounder (Aqua).
    Airs,
}

impl InstrumentKind {
    /// `(time between scans [s], footprints per scan, footprint spacing [°])`
    fn scan_constants(self) -> (Seconds, usize, Degree) {
        match self {
            InstrumentKind::Amsua => (8.0, 30, 3.33),
            InstrumentKind::Atms => (8.0 / 3.0, 96, 1.108),
            InstrumentKind::Airs => (8.0 / 3.0, 90, 1.10),
        }
    }

    /// Satellites flying the instrument.
    pub fn valid_satellites(self) -> &'static [&'static str] {
        match self {
            InstrumentKind::Amsua => &["Metop-A", "Metop-B", "Metop-C"],
            InstrumentKind::Atms => &["Suomi-NPP", "JPSS-1"],
            InstrumentKind::Airs => &["Aqua"],
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrumentKind::Amsua => "AMSU-A",
            InstrumentKind::Atms => "ATMS",
            InstrumentKind::Airs => "AIRS",
        };
        write!(f, "{name}")
    }
}

/// Scan constants of a cross-track scanner and access to its orbit.
#[derive(Clone)]
pub struct ScannerGeometry {
    xi: Radian,
    time_between_scans: Seconds,
    footprints_per_scan: usize,
    footprint_spacing: Radian,
    tle_provider: Option<Arc<dyn TleProvider>>,
    propagator: Arc<dyn OrbitPropagator>,
}

impl fmt::Debug for ScannerGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerGeometry")
            .field("xi", &self.xi)
            .field("time_between_scans", &self.time_between_scans)
            .field("footprints_per_scan", &self.footprints_per_scan)
            .field("footprint_spacing", &self.footprint_spacing)
            .field("has_tle_provider", &self.tle_provider.is_some())
            .finish()
    }
}

impl ScannerGeometry {
    /// Build a geometry from its scan constants.
    ///
    /// Arguments
    /// ---------
    /// * `max_scan_angle`: scan half-angle ξ at the satellite, radians.
    /// * `time_between_scans`: seconds between two cross-track scans.
    /// * `footprints_per_scan`: number of footprints of one scan line.
    /// * `footprint_spacing`: angle between adjacent footprints, radians.
    /// * `tle_provider`: element sets of the carrying satellite, if any.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` if any constant is not strictly positive,
    ///   or if ξ is not below π/2.
    pub fn new(
        max_scan_angle: Radian,
        time_between_scans: Seconds,
        footprints_per_scan: usize,
        footprint_spacing: Radian,
        tle_provider: Option<Arc<dyn TleProvider>>,
    ) -> Result<Self, RotcolError> {
        if !(max_scan_angle > 0.0 && max_scan_angle < std::f64::consts::FRAC_PI_2) {
            return Err(RotcolError::InvalidArgument(format!(
                "scan half-angle must be in (0, π/2), got {max_scan_angle}"
            )));
        }
        if !(time_between_scans > 0.0) || !(footprint_spacing > 0.0) || footprints_per_scan == 0 {
            return Err(RotcolError::InvalidArgument(
                "scan period, footprint count and footprint spacing must be positive".into(),
            ));
        }

        Ok(ScannerGeometry {
            xi: max_scan_angle,
            time_between_scans,
            footprints_per_scan,
            footprint_spacing,
            tle_provider,
            propagator: Arc::new(Sgp4Propagator),
        })
    }

    /// Geometry of a known instrument; ξ is `spacing · (n − 1) / 2`.
    pub fn for_instrument(
        kind: InstrumentKind,
        tle_provider: Option<Arc<dyn TleProvider>>,
    ) -> Result<Self, RotcolError> {
        let (tbs, n, spacing) = kind.scan_constants();
        let spacing = spacing * RADEG;
        ScannerGeometry::new(
            spacing * (n - 1) as f64 * 0.5,
            tbs,
            n,
            spacing,
            tle_provider,
        )
    }

    /// Replace the orbit propagator (a [`Sgp4Propagator`] by default).
    pub fn with_propagator(mut self, propagator: Arc<dyn OrbitPropagator>) -> Self {
        self.propagator = propagator;
        self
    }

    pub fn with_tle_provider(mut self, tle_provider: Arc<dyn TleProvider>) -> Self {
        self.tle_provider = Some(tle_provider);
        self
    }

    /// Scan half-angle ξ (radians).
    pub fn scan_half_angle(&self) -> Radian {
        self.xi
    }

    pub fn time_between_scans(&self) -> Seconds {
        self.time_between_scans
    }

    pub fn footprints_per_scan(&self) -> usize {
        self.footprints_per_scan
    }

    pub fn footprint_spacing(&self) -> Radian {
        self.footprint_spacing
    }

    pub fn propagator(&self) -> &dyn OrbitPropagator {
        self.propagator.as_ref()
    }

    /// Element set closest to `time`.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::MissingOrbitData)` if no provider is attached or no element
    ///   set lies within 12 hours.
    pub fn nearest_orbit_elements(
        &self,
        time_system: &TimeSystem,
        time: Instant,
    ) -> Result<TwoLineElement, RotcolError> {
        let provider = self.tle_provider.as_ref().ok_or_else(|| {
            RotcolError::MissingOrbitData("no element set provider attached".into())
        })?;
        provider.nearest(time.julian_date(time_system))
    }

    /// Propagate the carrying satellite with a given element set.
    pub fn propagate(
        &self,
        tle: &TwoLineElement,
        jd: JulianDate,
    ) -> Result<StateVector, RotcolError> {
        self.propagator.propagate(tle, jd)
    }

    /// Earth-central angle reachable by the swath edge, widened by a spatial tolerance.
    ///
    /// The satellite is propagated to `time` with the nearest element set; the local
    /// Earth radius is taken at its sub-satellite latitude.
    ///
    /// Arguments
    /// ---------
    /// * `time`: instant of evaluation.
    /// * `latitude`: latitude of the sounding (radians), used to convert the tolerance.
    /// * `spatial_tolerance`: meters.
    ///
    /// Return
    /// ----------
    /// * `|asin(r/r_e · sin ξ) − ξ| + tolerance / r_e(latitude)` in radians.
    pub fn max_scan_angle(
        &self,
        time_system: &TimeSystem,
        time: Instant,
        latitude: Radian,
        spatial_tolerance: Meter,
    ) -> Result<Radian, RotcolError> {
        let tle = self.nearest_orbit_elements(time_system, time)?;
        self.max_scan_angle_with(&tle, time.julian_date(time_system), latitude, spatial_tolerance)
    }

    /// Same as [`ScannerGeometry::max_scan_angle`] with an element set already in hand.
    pub fn max_scan_angle_with(
        &self,
        tle: &TwoLineElement,
        jd: JulianDate,
        latitude: Radian,
        spatial_tolerance: Meter,
    ) -> Result<Radian, RotcolError> {
        let state = self.propagate(tle, jd)?;
        let r = state.position.norm();
        let sub_satellite_latitude = (state.position.z / r).asin();

        let sine = (r / earth_radius(sub_satellite_latitude) * self.xi.sin()).min(1.0);
        let ds = sine.asin() - self.xi;

        Ok(ds.abs() + spatial_tolerance_angle(spatial_tolerance, latitude))
    }
}

/// Variables of one footprint, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationRecord {
    pub variables: BTreeMap<String, Vec<f64>>,
}

impl ObservationRecord {
    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.variables.insert(name.into(), values);
    }
}

/// An opened instrument data file.
pub trait Granule: Send {
    /// Number of `(scans, footprints)` in the granule.
    fn shape(&self) -> (usize, usize);

    /// Observation record at one footprint of the granule.
    fn record(&self, scan: usize, footprint: usize) -> Result<ObservationRecord, RotcolError>;
}

/// Opens granules of one instrument.
pub trait GranuleReader: Send + Sync {
    fn open_granule(&self, path: &Utf8Path) -> Result<Box<dyn Granule>, RotcolError>;
}

/// Capability of a nadir-scanning instrument on a given satellite.
pub trait NadirInstrument: Send + Sync {
    /// Instrument name, e.g. `"AMSU-A"`.
    fn name(&self) -> &str;

    /// Satellite name, e.g. `"Metop-B"`.
    fn satellite(&self) -> &str;

    fn geometry(&self) -> &ScannerGeometry;

    /// Footprint geolocations of all scans between `start` and `end`.
    fn get_geolocations(&self, start: Instant, end: Instant)
        -> Result<ScanSwathIndex, RotcolError>;

    /// Observation record of one footprint of a swath built by this instrument.
    ///
    /// The default reads the granule through the swath's reader; instruments that
    /// derive or post-process variables override it.
    fn get_data(
        &self,
        swath: &ScanSwathIndex,
        scan: usize,
        footprint: usize,
        cache: &mut FileHandleCache,
    ) -> Result<ObservationRecord, RotcolError> {
        swath.fetch(scan, footprint, cache)
    }

    /// `"<instrument> on <satellite>"`, used in log lines and collocation records.
    fn label(&self) -> String {
        format!("{} on {}", self.name(), self.satellite())
    }
}

#[cfg(test)]
mod instruments_test {
    use super::*;
    use crate::orbit::tle::TleCatalog;
    use crate::time::calendar::Calendar;
    use crate::time::time_system::UtcConvention;
    use approx::assert_relative_eq;

    fn catalog() -> Arc<dyn TleProvider> {
        Arc::new(TleCatalog::new(vec![TwoLineElement {
            satellite_number: 43013,
            epoch: 2_459_365.0,
            inclination: 98.74 * RADEG,
            raan: 150.2 * RADEG,
            eccentricity: 0.00012,
            argument_of_perigee: 90.0 * RADEG,
            mean_anomaly: 270.1 * RADEG,
            mean_motion: 14.1954,
            bstar: 0.0,
        }]))
    }

    #[test]
    fn test_instrument_constants() {
        let amsua = ScannerGeometry::for_instrument(InstrumentKind::Amsua, None).unwrap();
        assert_relative_eq!(amsua.scan_half_angle(), 48.285 * RADEG, epsilon = 1e-12);
        assert_eq!(amsua.footprints_per_scan(), 30);
        assert_eq!(amsua.time_between_scans(), 8.0);

        let atms = ScannerGeometry::for_instrument(InstrumentKind::Atms, None).unwrap();
        assert_relative_eq!(atms.scan_half_angle(), 52.63 * RADEG, epsilon = 1e-12);
        assert_relative_eq!(atms.time_between_scans(), 8.0 / 3.0);

        let airs = ScannerGeometry::for_instrument(InstrumentKind::Airs, None).unwrap();
        assert_relative_eq!(airs.scan_half_angle(), 48.95 * RADEG, epsilon = 1e-12);
        assert_eq!(InstrumentKind::Airs.valid_satellites(), &["Aqua"]);
        assert_eq!(InstrumentKind::Amsua.to_string(), "AMSU-A");
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(ScannerGeometry::new(0.0, 8.0, 30, 0.05, None).is_err());
        assert!(ScannerGeometry::new(1.7, 8.0, 30, 0.05, None).is_err());
        assert!(ScannerGeometry::new(0.8, f64::NAN, 30, 0.05, None).is_err());
        assert!(ScannerGeometry::new(0.8, 8.0, 0, 0.05, None).is_err());
    }

    #[test]
    fn test_missing_orbit_data() {
        let ts = TimeSystem::builtin(UtcConvention::System2).unwrap();
        let t = ts.from_utc(&Calendar::new(2021, 5, 30, 12, 0, 0.0).unwrap()).unwrap();

        let no_provider = ScannerGeometry::for_instrument(InstrumentKind::Amsua, None).unwrap();
        assert!(matches!(
            no_provider.max_scan_angle(&ts, t, 0.0, 0.0),
            Err(RotcolError::MissingOrbitData(_))
        ));

        let geometry = no_provider.with_tle_provider(catalog());
        let far = ts.from_utc(&Calendar::new(2021, 6, 2, 0, 0, 0.0).unwrap()).unwrap();
        assert!(matches!(
            geometry.nearest_orbit_elements(&ts, far),
            Err(RotcolError::MissingOrbitData(_))
        ));
        assert!(geometry.nearest_orbit_elements(&ts, t).is_ok());
    }

    #[test]
    fn test_max_scan_angle() {
        let ts = TimeSystem::builtin(UtcConvention::System2).unwrap();
        let t = ts.from_utc(&Calendar::new(2021, 5, 30, 12, 10, 0.0).unwrap()).unwrap();
        let geometry =
            ScannerGeometry::for_instrument(InstrumentKind::Amsua, Some(catalog())).unwrap();

        let bare = geometry.max_scan_angle(&ts, t, 0.3, 0.0).unwrap();
        let tle = geometry.nearest_orbit_elements(&ts, t).unwrap();
        let state = geometry.propagate(&tle, t.julian_date(&ts)).unwrap();
        let r = state.position.norm();
        let lat = (state.position.z / r).asin();
        let xi = geometry.scan_half_angle();
        let expected = ((r / earth_radius(lat)) * xi.sin()).asin() - xi;
        assert_relative_eq!(bare, expected, epsilon = 1e-12);

        // half swath of AMSU-A is a bit above 1000 km on the ground
        let ground = bare * earth_radius(lat);
        assert!(ground > 900.0 && ground < 1300.0, "half swath {ground} km");

        let widened = geometry.max_scan_angle(&ts, t, 0.3, 150_000.0).unwrap();
        assert_relative_eq!(widened - bare, 150.0 / earth_radius(0.3), epsilon = 1e-12);
    }
}
