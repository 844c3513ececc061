#![allow(dead_code)]

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use nalgebra::{DMatrix, Vector3};

use rotcol::constants::{Radian, RADEG};
use rotcol::instruments::scan_swath::{ScanLocator, ScanSwathIndex};
use rotcol::instruments::{
    Granule, GranuleReader, NadirInstrument, ObservationRecord, ScannerGeometry,
};
use rotcol::occultation::Occultation;
use rotcol::orbit::earth_orientation::{MeanEarthOrientation, OrientationCache};
use rotcol::orbit::tle::{TleCatalog, TleProvider, TwoLineElement};
use rotcol::ref_system::{frame_rotation, longitude_latitude, Axis};
use rotcol::rotcol_errors::RotcolError;
use rotcol::time::calendar::Calendar;
use rotcol::time::time_system::{TimeSystem, UtcConvention};
use rotcol::time::Instant;

pub const SCANS_PER_GRANULE: usize = 75;
pub const FOOTPRINTS: usize = 21;
pub const FOOTPRINT_SPACING: Radian = 0.008;
pub const TIME_BETWEEN_SCANS: f64 = 8.0;

/// Sun-synchronous element set with an epoch at 2021-05-30T12:00 UTC.
pub fn test_tle() -> TwoLineElement {
    TwoLineElement {
        satellite_number: 43013,
        epoch: 2_459_365.0,
        inclination: 98.74 * RADEG,
        raan: 150.2 * RADEG,
        eccentricity: 0.00012,
        argument_of_perigee: 90.0 * RADEG,
        mean_anomaly: 270.1 * RADEG,
        mean_motion: 14.1954,
        bstar: 0.0,
    }
}

pub fn time_system() -> TimeSystem {
    TimeSystem::builtin(UtcConvention::System2).unwrap()
}

/// Cross-track angle of footprint `fp`, symmetric around nadir.
pub fn cross_track_angle(fp: usize) -> Radian {
    (fp as f64 - (FOOTPRINTS - 1) as f64 / 2.0) * FOOTPRINT_SPACING
}

/// Scanner flying the test element set, with footprints laid out exactly
/// perpendicular to the orbital plane.
pub struct OrbitScanner {
    pub geometry: ScannerGeometry,
    pub time_system: TimeSystem,
    pub start: Instant,
    pub nscans: usize,
}

impl OrbitScanner {
    pub fn new(nscans: usize) -> Self {
        let time_system = time_system();
        let start = time_system.from_utc(&Calendar::new(2021, 5, 30, 12, 0, 0.0).unwrap()).unwrap();
        let catalog: Arc<dyn TleProvider> = Arc::new(TleCatalog::new(vec![test_tle()]));
        let geometry = ScannerGeometry::new(
            48.285 * RADEG,
            TIME_BETWEEN_SCANS,
            FOOTPRINTS,
            FOOTPRINT_SPACING,
            Some(catalog),
        )
        .unwrap();

        OrbitScanner {
            geometry,
            time_system,
            start,
            nscans,
        }
    }

    pub fn shared(nscans: usize) -> Arc<dyn NadirInstrument> {
        Arc::new(OrbitScanner::new(nscans))
    }

    pub fn scan_time(&self, scan: usize) -> Instant {
        self.start + TIME_BETWEEN_SCANS * scan as f64
    }

    /// Earth-fixed (longitude, latitude) in degrees of a point `cross_track` radians
    /// off the sub-satellite point at `time`.
    pub fn ground_point(&self, time: Instant, cross_track: Radian) -> (f64, f64) {
        let jd = time.julian_date(&self.time_system);
        let tle = self
            .geometry
            .nearest_orbit_elements(&self.time_system, time)
            .unwrap();
        let state = self.geometry.propagate(&tle, jd).unwrap();
        let elements = self.geometry.propagator().classical_elements(&state);

        let to_orbit_frame = frame_rotation(elements.argument_of_latitude, Axis::Z)
            * frame_rotation(elements.inclination, Axis::X)
            * frame_rotation(elements.raan, Axis::Z);
        let in_orbit_frame = Vector3::new(cross_track.cos(), 0.0, cross_track.sin());

        let cache = OrientationCache::build(&MeanEarthOrientation, [jd]).unwrap();
        let itrs = cache.itrs_to_teme(jd).unwrap().transpose()
            * to_orbit_frame.transpose()
            * in_orbit_frame;
        let (lon, lat) = longitude_latitude(&itrs);
        (lon / RADEG, lat / RADEG)
    }

    /// Sounding sitting exactly on footprint `fp` of scan `scan`.
    pub fn sounding_on_footprint(&self, occid: &str, scan: usize, fp: usize) -> Occultation {
        let time = self.scan_time(scan);
        let (lon, lat) = self.ground_point(time, cross_track_angle(fp));
        Occultation::new(occid, lon, lat, time).unwrap()
    }

    /// Sounding at the time of scan `scan`, `cross_track` radians off the track.
    pub fn sounding_off_track(&self, occid: &str, scan: usize, cross_track: Radian) -> Occultation {
        let time = self.scan_time(scan);
        let (lon, lat) = self.ground_point(time, cross_track);
        Occultation::new(occid, lon, lat, time).unwrap()
    }

    fn granule_path(index: usize) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("/data/scanner/granule_{index:03}.nc"))
    }
}

impl NadirInstrument for OrbitScanner {
    fn name(&self) -> &str {
        "SYNTH"
    }

    fn satellite(&self) -> &str {
        "Test-Sat"
    }

    fn geometry(&self) -> &ScannerGeometry {
        &self.geometry
    }

    fn get_geolocations(&self, start: Instant, end: Instant) -> Result<ScanSwathIndex, RotcolError> {
        let scans: Vec<usize> = (0..self.nscans)
            .filter(|&i| {
                let t = self.scan_time(i);
                t >= start && t <= end
            })
            .collect();

        let mut longitudes = DMatrix::zeros(scans.len(), FOOTPRINTS);
        let mut latitudes = DMatrix::zeros(scans.len(), FOOTPRINTS);
        for (row, &scan) in scans.iter().enumerate() {
            for fp in 0..FOOTPRINTS {
                let (lon, lat) = self.ground_point(self.scan_time(scan), cross_track_angle(fp));
                longitudes[(row, fp)] = lon * RADEG;
                latitudes[(row, fp)] = lat * RADEG;
            }
        }

        let ngranules = self.nscans.div_ceil(SCANS_PER_GRANULE);
        ScanSwathIndex::new(
            self.label(),
            longitudes,
            latitudes,
            scans.iter().map(|&s| self.scan_time(s)).collect(),
            scans
                .iter()
                .map(|&s| ScanLocator {
                    file_index: s / SCANS_PER_GRANULE,
                    scan_index: s % SCANS_PER_GRANULE,
                })
                .collect(),
            (0..ngranules).map(OrbitScanner::granule_path).collect(),
            Some(Arc::new(ScanGranuleReader)),
        )
    }
}

/// Reader of the synthetic granules: every footprint reports where it comes from.
pub struct ScanGranuleReader;

struct ScanGranule {
    index: usize,
}

impl Granule for ScanGranule {
    fn shape(&self) -> (usize, usize) {
        (SCANS_PER_GRANULE, FOOTPRINTS)
    }

    fn record(&self, scan: usize, footprint: usize) -> Result<ObservationRecord, RotcolError> {
        let mut record = ObservationRecord::default();
        record.insert(
            "scan",
            vec![(self.index * SCANS_PER_GRANULE + scan) as f64],
        );
        record.insert("footprint", vec![footprint as f64]);
        record.insert("cross_track_angle", vec![cross_track_angle(footprint)]);
        Ok(record)
    }
}

impl GranuleReader for ScanGranuleReader {
    fn open_granule(&self, path: &Utf8Path) -> Result<Box<dyn Granule>, RotcolError> {
        let index = path
            .file_stem()
            .and_then(|stem| stem.strip_prefix("granule_"))
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| RotcolError::GranuleRead(format!("unexpected granule {path}")))?;
        Ok(Box::new(ScanGranule { index }))
    }
}
