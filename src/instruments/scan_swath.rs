//! In-memory index of the footprints of a nadir scanner over a time window.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use nalgebra::{DMatrix, Vector3};

use crate::constants::Radian;
use crate::instruments::{Granule, GranuleReader, ObservationRecord};
use crate::ref_system::unit_vector;
use crate::rotcol_errors::RotcolError;
use crate::time::Instant;

/// Where a scan row lives: file of the swath file list and row inside that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLocator {
    pub file_index: usize,
    pub scan_index: usize,
}

/// Footprint geolocations of consecutive scans, plus the way back to their data.
///
/// Longitudes and latitudes are `nscans × nfootprints` matrices in radians; row `i`
/// was observed around `mid_times[i]` and is stored at `locators[i]`.
#[derive(Clone)]
pub struct ScanSwathIndex {
    instrument: String,
    longitudes: DMatrix<f64>,
    latitudes: DMatrix<f64>,
    mid_times: Vec<Instant>,
    locators: Vec<ScanLocator>,
    files: Vec<Utf8PathBuf>,
    reader: Option<Arc<dyn GranuleReader>>,
}

impl fmt::Debug for ScanSwathIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanSwathIndex")
            .field("instrument", &self.instrument)
            .field("nscans", &self.len())
            .field("nfootprints", &self.footprints_per_scan())
            .field("files", &self.files)
            .finish()
    }
}

impl ScanSwathIndex {
    /// Assemble a swath from parallel arrays.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` when the matrices, mid times and locators
    ///   disagree on the number of scans, or a locator points past the file list.
    pub fn new(
        instrument: impl Into<String>,
        longitudes: DMatrix<f64>,
        latitudes: DMatrix<f64>,
        mid_times: Vec<Instant>,
        locators: Vec<ScanLocator>,
        files: Vec<Utf8PathBuf>,
        reader: Option<Arc<dyn GranuleReader>>,
    ) -> Result<Self, RotcolError> {
        let nscans = longitudes.nrows();
        if latitudes.shape() != longitudes.shape()
            || mid_times.len() != nscans
            || locators.len() != nscans
        {
            return Err(RotcolError::InvalidArgument(format!(
                "inconsistent swath: longitudes {:?}, latitudes {:?}, {} mid times, {} locators",
                longitudes.shape(),
                latitudes.shape(),
                mid_times.len(),
                locators.len()
            )));
        }
        if let Some(bad) = locators.iter().find(|l| l.file_index >= files.len()) {
            return Err(RotcolError::InvalidArgument(format!(
                "scan locator {bad:?} points past the {} swath file(s)",
                files.len()
            )));
        }

        Ok(ScanSwathIndex {
            instrument: instrument.into(),
            longitudes,
            latitudes,
            mid_times,
            locators,
            files,
            reader,
        })
    }

    /// Swath without any scan.
    pub fn empty(instrument: impl Into<String>, footprints_per_scan: usize) -> Self {
        ScanSwathIndex {
            instrument: instrument.into(),
            longitudes: DMatrix::zeros(0, footprints_per_scan),
            latitudes: DMatrix::zeros(0, footprints_per_scan),
            mid_times: Vec::new(),
            locators: Vec::new(),
            files: Vec::new(),
            reader: None,
        }
    }

    /// Join swaths of the same instrument, in the given order.
    ///
    /// File lists are appended and locators shifted accordingly. The first reader
    /// found is kept.
    pub fn concat(parts: Vec<ScanSwathIndex>) -> Result<Self, RotcolError> {
        let Some(first) = parts.first() else {
            return Err(RotcolError::InvalidArgument(
                "cannot concatenate an empty list of swaths".into(),
            ));
        };
        let instrument = first.instrument.clone();
        let nfootprints = first.footprints_per_scan();

        if let Some(bad) = parts
            .iter()
            .find(|p| p.instrument != instrument || p.footprints_per_scan() != nfootprints)
        {
            return Err(RotcolError::InvalidArgument(format!(
                "cannot join swath of {} ({} footprints) with swath of {instrument} ({nfootprints} footprints)",
                bad.instrument,
                bad.footprints_per_scan()
            )));
        }

        let nscans: usize = parts.iter().map(ScanSwathIndex::len).sum();
        let mut longitudes = DMatrix::zeros(nscans, nfootprints);
        let mut latitudes = DMatrix::zeros(nscans, nfootprints);
        let mut mid_times = Vec::with_capacity(nscans);
        let mut locators = Vec::with_capacity(nscans);
        let mut files = Vec::new();
        let mut reader = None;

        let mut row = 0;
        for part in parts {
            let n = part.len();
            longitudes.rows_mut(row, n).copy_from(&part.longitudes);
            latitudes.rows_mut(row, n).copy_from(&part.latitudes);
            mid_times.extend(part.mid_times);
            let offset = files.len();
            locators.extend(part.locators.into_iter().map(|l| ScanLocator {
                file_index: l.file_index + offset,
                scan_index: l.scan_index,
            }));
            files.extend(part.files);
            reader = reader.or(part.reader);
            row += n;
        }

        Ok(ScanSwathIndex {
            instrument,
            longitudes,
            latitudes,
            mid_times,
            locators,
            files,
            reader,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Number of scans.
    pub fn len(&self) -> usize {
        self.mid_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mid_times.is_empty()
    }

    pub fn footprints_per_scan(&self) -> usize {
        self.longitudes.ncols()
    }

    pub fn longitudes(&self) -> &DMatrix<f64> {
        &self.longitudes
    }

    pub fn latitudes(&self) -> &DMatrix<f64> {
        &self.latitudes
    }

    pub fn mid_times(&self) -> &[Instant] {
        &self.mid_times
    }

    pub fn locators(&self) -> &[ScanLocator] {
        &self.locators
    }

    pub fn files(&self) -> &[Utf8PathBuf] {
        &self.files
    }

    /// Longitude and latitude (radians) of one footprint, if it exists.
    pub fn geolocation(&self, scan: usize, footprint: usize) -> Option<(Radian, Radian)> {
        Some((
            *self.longitudes.get((scan, footprint))?,
            *self.latitudes.get((scan, footprint))?,
        ))
    }

    /// Earth-fixed unit vector of one footprint.
    pub(crate) fn footprint_vector(&self, scan: usize, footprint: usize) -> Vector3<f64> {
        unit_vector(
            self.longitudes[(scan, footprint)],
            self.latitudes[(scan, footprint)],
        )
    }

    /// Indices of the scans whose mid time lies in `[start, end]`.
    pub fn scans_within(&self, start: Instant, end: Instant) -> Vec<usize> {
        self.mid_times
            .iter()
            .enumerate()
            .filter(|(_, t)| **t >= start && **t <= end)
            .map(|(i, _)| i)
            .collect()
    }

    fn check_indices(&self, scan: usize, footprint: usize) -> Result<(), RotcolError> {
        if scan >= self.len() || footprint >= self.footprints_per_scan() {
            return Err(RotcolError::InvalidArgument(format!(
                "footprint ({scan}, {footprint}) outside of a {}×{} swath",
                self.len(),
                self.footprints_per_scan()
            )));
        }
        Ok(())
    }

    /// Observation record of one footprint, read through the caller's granule cache.
    ///
    /// Arguments
    /// ---------
    /// * `scan`, `footprint`: zero-based indices into this swath.
    /// * `cache`: opened granules, reused across calls.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` for indices outside the swath or a swath
    ///   without reader, reader errors otherwise.
    pub fn fetch(
        &self,
        scan: usize,
        footprint: usize,
        cache: &mut FileHandleCache,
    ) -> Result<ObservationRecord, RotcolError> {
        self.check_indices(scan, footprint)?;
        let reader = self.reader.as_deref().ok_or_else(|| {
            RotcolError::InvalidArgument(format!(
                "swath of {} has no granule reader",
                self.instrument
            ))
        })?;

        let locator = self.locators[scan];
        let path = &self.files[locator.file_index];
        cache
            .granule(path, reader)?
            .record(locator.scan_index, footprint)
    }
}

/// Caller-owned least-recently-used set of opened granules.
pub struct FileHandleCache {
    capacity: usize,
    entries: VecDeque<(Utf8PathBuf, Box<dyn Granule>)>,
}

impl Default for FileHandleCache {
    fn default() -> Self {
        FileHandleCache {
            capacity: 1,
            entries: VecDeque::with_capacity(1),
        }
    }
}

impl fmt::Debug for FileHandleCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandleCache")
            .field("capacity", &self.capacity)
            .field("open", &self.entries.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .finish()
    }
}

impl FileHandleCache {
    /// Cache keeping at most `capacity` granules open; `capacity` must be at least 1.
    pub fn new(capacity: usize) -> Result<Self, RotcolError> {
        if capacity == 0 {
            return Err(RotcolError::InvalidArgument(
                "file handle cache needs a capacity of at least 1".into(),
            ));
        }
        Ok(FileHandleCache {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.entries.iter().any(|(p, _)| p == path)
    }

    /// Opened granule at `path`, opening it with `reader` on a miss.
    pub fn granule(
        &mut self,
        path: &Utf8Path,
        reader: &dyn GranuleReader,
    ) -> Result<&dyn Granule, RotcolError> {
        match self.entries.iter().position(|(p, _)| p == path) {
            Some(0) => {}
            Some(i) => {
                if let Some(entry) = self.entries.remove(i) {
                    self.entries.push_front(entry);
                }
            }
            None => {
                debug!("opening granule {path}");
                let granule = reader.open_granule(path)?;
                self.entries.push_front((path.to_owned(), granule));
                self.entries.truncate(self.capacity);
            }
        }

        self.entries
            .front()
            .map(|(_, g)| g.as_ref())
            .ok_or_else(|| RotcolError::GranuleRead(format!("granule {path} was not retained")))
    }
}
