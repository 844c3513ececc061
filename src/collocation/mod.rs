//! # Collocations
//!
//! A [`Collocation`] ties one RO sounding to one footprint of a nadir scanner. The
//! rotation-collocation search only knows *that* a footprint is within reach and
//! roughly *when* and at which scan angle; such a collocation is approximate until
//! [`Collocation::refine`] resolves the exact scan and footprint indices. The brute
//! force search creates collocations that are exact from the start.
//!
//! Once `(scan_index, footprint_index)` are set, longitude, latitude and time are
//! those of that footprint; fields are private so this cannot be broken from
//! outside.

pub mod collocation_list;

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Radian, RADEG};
use crate::instruments::scan_swath::{FileHandleCache, ScanSwathIndex};
use crate::instruments::{NadirInstrument, ObservationRecord};
use crate::occultation::Occultation;
use crate::ref_system::{angular_distance, earth_radius};
use crate::rotcol_errors::RotcolError;
use crate::time::Instant;

/// Scans on each side of the approximate time fetched by [`Collocation::refine`].
pub const REFINE_HALF_WINDOW_SCANS: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollocationStatus {
    #[default]
    Nominal,
    /// Refinement found no footprint geolocation around the collocation time.
    NoSounderData,
}

impl fmt::Display for CollocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollocationStatus::Nominal => write!(f, "nominal"),
            CollocationStatus::NoSounderData => write!(f, "no sounder data available"),
        }
    }
}

/// One RO sounding matched with one nadir-scanner footprint.
#[derive(Clone)]
pub struct Collocation {
    occultation: Occultation,
    instrument: Arc<dyn NadirInstrument>,
    longitude: Option<Degree>,
    latitude: Option<Degree>,
    time: Option<Instant>,
    scan_angle: Option<Radian>,
    swath: Option<Arc<ScanSwathIndex>>,
    footprint: Option<(usize, usize)>,
    status: CollocationStatus,
}

impl fmt::Debug for Collocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collocation")
            .field("occid", &self.occultation.occid)
            .field("instrument", &self.instrument.label())
            .field("longitude", &self.longitude)
            .field("latitude", &self.latitude)
            .field("scan_angle", &self.scan_angle)
            .field("footprint", &self.footprint)
            .field("status", &self.status)
            .finish()
    }
}

impl Collocation {
    /// Collocation known only approximately, as produced by the rotation search.
    ///
    /// Arguments
    /// ---------
    /// * `longitude`, `latitude`: approximate footprint geolocation in degrees.
    /// * `time`: approximate time of the footprint.
    /// * `scan_angle`: estimated scan angle at the satellite, radians.
    pub fn approximate(
        occultation: Occultation,
        instrument: Arc<dyn NadirInstrument>,
        longitude: Degree,
        latitude: Degree,
        time: Instant,
        scan_angle: Radian,
    ) -> Self {
        Collocation {
            occultation,
            instrument,
            longitude: Some(longitude),
            latitude: Some(latitude),
            time: Some(time),
            scan_angle: Some(scan_angle),
            swath: None,
            footprint: None,
            status: CollocationStatus::Nominal,
        }
    }

    /// Collocation on a known footprint of a swath.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` if the indices are outside the swath.
    pub fn exact(
        occultation: Occultation,
        instrument: Arc<dyn NadirInstrument>,
        swath: Arc<ScanSwathIndex>,
        scan_index: usize,
        footprint_index: usize,
    ) -> Result<Self, RotcolError> {
        let mut colloc = Collocation {
            occultation,
            instrument,
            longitude: None,
            latitude: None,
            time: None,
            scan_angle: None,
            swath: Some(swath),
            footprint: None,
            status: CollocationStatus::Nominal,
        };
        colloc.set_footprint(scan_index, footprint_index)?;
        Ok(colloc)
    }

    fn set_footprint(&mut self, scan: usize, footprint: usize) -> Result<(), RotcolError> {
        let swath = self.swath.as_ref().ok_or_else(|| {
            RotcolError::InvalidArgument("footprint indices need a swath".into())
        })?;
        let (lon, lat) = swath.geolocation(scan, footprint).ok_or_else(|| {
            RotcolError::InvalidArgument(format!(
                "footprint ({scan}, {footprint}) outside of a {}×{} swath",
                swath.len(),
                swath.footprints_per_scan()
            ))
        })?;

        self.longitude = Some(lon / RADEG);
        self.latitude = Some(lat / RADEG);
        self.time = Some(swath.mid_times()[scan]);
        self.footprint = Some((scan, footprint));
        Ok(())
    }

    pub fn occid(&self) -> &str {
        &self.occultation.occid
    }

    pub fn occultation(&self) -> &Occultation {
        &self.occultation
    }

    pub fn instrument(&self) -> &Arc<dyn NadirInstrument> {
        &self.instrument
    }

    /// Longitude of the footprint, degrees east.
    pub fn longitude(&self) -> Option<Degree> {
        self.longitude
    }

    /// Latitude of the footprint, degrees north.
    pub fn latitude(&self) -> Option<Degree> {
        self.latitude
    }

    pub fn time(&self) -> Option<Instant> {
        self.time
    }

    pub fn scan_angle(&self) -> Option<Radian> {
        self.scan_angle
    }

    pub fn swath(&self) -> Option<&Arc<ScanSwathIndex>> {
        self.swath.as_ref()
    }

    pub fn scan_index(&self) -> Option<usize> {
        self.footprint.map(|(s, _)| s)
    }

    pub fn footprint_index(&self) -> Option<usize> {
        self.footprint.map(|(_, f)| f)
    }

    pub fn status(&self) -> CollocationStatus {
        self.status
    }

    /// Whether the exact footprint is known.
    pub fn is_refined(&self) -> bool {
        self.footprint.is_some()
    }

    /// Resolve the footprint closest to the sounding.
    ///
    /// Without a swath, geolocations are fetched for `±4` scan periods around the
    /// collocation time. An empty swath sets the status to
    /// [`CollocationStatus::NoSounderData`] and leaves the geometry untouched.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` when the scan angle or time is unknown,
    ///   errors of the instrument's geolocation reader otherwise.
    pub fn refine(&mut self) -> Result<(), RotcolError> {
        if self.scan_angle.is_none() && self.footprint.is_none() {
            return Err(RotcolError::InvalidArgument(format!(
                "scan angle of collocation {} is unknown",
                self.occid()
            )));
        }
        let Some(time) = self.time else {
            return Err(RotcolError::InvalidArgument(format!(
                "time of collocation {} is unknown",
                self.occid()
            )));
        };

        let swath = match &self.swath {
            Some(swath) => Arc::clone(swath),
            None => {
                let half = REFINE_HALF_WINDOW_SCANS
                    * self.instrument.geometry().time_between_scans();
                let swath = Arc::new(self.instrument.get_geolocations(time - half, time + half)?);
                self.swath = Some(Arc::clone(&swath));
                swath
            }
        };

        if swath.is_empty() {
            debug!("no sounder data around collocation {}", self.occid());
            self.status = CollocationStatus::NoSounderData;
            return Ok(());
        }

        let target = self.occultation.unit_vector();
        let nfootprints = swath.footprints_per_scan();
        let closest = (0..swath.len())
            .flat_map(|scan| (0..nfootprints).map(move |fp| (scan, fp)))
            .map(|(scan, fp)| {
                let d = angular_distance(&swath.footprint_vector(scan, fp), &target);
                ((scan, fp), d)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match closest {
            Some(((scan, fp), distance)) => {
                debug!(
                    "collocation {} refined to footprint ({scan}, {fp}) at {:.2} km",
                    self.occid(),
                    distance * earth_radius(self.occultation.latitude_rad())
                );
                self.set_footprint(scan, fp)
            }
            None => {
                self.status = CollocationStatus::NoSounderData;
                Ok(())
            }
        }
    }

    /// Observation record of the collocated footprint.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` if the collocation is not refined.
    pub fn get_data(&self, cache: &mut FileHandleCache) -> Result<ObservationRecord, RotcolError> {
        match (&self.swath, self.footprint) {
            (Some(swath), Some((scan, fp))) => self.instrument.get_data(swath, scan, fp, cache),
            _ => Err(RotcolError::InvalidArgument(format!(
                "collocation {} has no exact footprint, refine it first",
                self.occid()
            ))),
        }
    }
}
