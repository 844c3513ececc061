//! # Collocation searches
//!
//! Two interchangeable strategies decide, for every RO sounding of a batch, whether a
//! footprint of a nadir scanner lies within a time and a spatial tolerance:
//!
//! * [`BruteForce`](brute_force::BruteForce) compares each sounding with every
//!   footprint observed inside its time window. It is O(n·m) and serves as ground
//!   truth.
//! * [`RotationCollocation`](rotation::RotationCollocation) rotates each sounding into
//!   the orbital frame of the scanner (see [`nadir_frame`]) and looks for the instant
//!   the satellite passes it, which needs no footprint at all. It is O(n).
//!
//! Both return a [`Report`] holding the [`CollocationList`] and the non-fatal
//! advisories met on the way. Results keep the order of the input soundings.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rotcol::search::SearchParams;
//!
//! let params = SearchParams::builder()
//!     .time_tolerance(300.0)
//!     .spatial_tolerance(100_000.0)
//!     .build()
//!     .unwrap();
//! assert_eq!(params.time_tolerance, 300.0);
//! ```

pub mod brute_force;
pub mod nadir_frame;
pub mod rotation;

use std::cmp::Ordering::Greater;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collocation::collocation_list::CollocationList;
use crate::constants::{Meter, Seconds};
use crate::instruments::NadirInstrument;
use crate::occultation::Occultation;
use crate::report::Report;
use crate::rotcol_errors::RotcolError;
use crate::time::time_system::TimeSystem;

/// Matching tolerances of a search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Largest time separation between a sounding and a footprint, seconds.
    pub time_tolerance: Seconds,
    /// Largest distance between a sounding and a footprint, meters.
    pub spatial_tolerance: Meter,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            time_tolerance: 600.0,
            spatial_tolerance: 150_000.0,
        }
    }
}

impl SearchParams {
    pub fn builder() -> SearchParamsBuilder {
        SearchParamsBuilder::new()
    }
}

#[derive(Debug, Clone)]
pub struct SearchParamsBuilder {
    params: SearchParams,
}

impl Default for SearchParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: SearchParams::default(),
        }
    }

    pub fn time_tolerance(mut self, v: Seconds) -> Self {
        self.params.time_tolerance = v;
        self
    }

    pub fn spatial_tolerance(mut self, v: Meter) -> Self {
        self.params.spatial_tolerance = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Validate and return the parameters.
    ///
    /// Return
    /// ----------
    /// * `Err(RotcolError::InvalidArgument)` unless both tolerances are finite and
    ///   strictly positive.
    pub fn build(self) -> Result<SearchParams, RotcolError> {
        let p = &self.params;

        if !Self::gt0(p.time_tolerance) || !p.time_tolerance.is_finite() {
            return Err(RotcolError::InvalidArgument(format!(
                "time tolerance must be a positive number of seconds, got {}",
                p.time_tolerance
            )));
        }
        if !Self::gt0(p.spatial_tolerance) || !p.spatial_tolerance.is_finite() {
            return Err(RotcolError::InvalidArgument(format!(
                "spatial tolerance must be a positive number of meters, got {}",
                p.spatial_tolerance
            )));
        }

        Ok(self.params)
    }
}

/// A collocation-finding strategy.
pub trait CollocationSearch {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Find the collocations of `soundings` with the footprints of `instrument`.
    ///
    /// Arguments
    /// ---------
    /// * `instrument`: nadir scanner to match against.
    /// * `soundings`: RO soundings; the output keeps their order.
    /// * `params`: time and spatial tolerances.
    /// * `time_system`: leap-second aware conversions.
    ///
    /// Return
    /// ----------
    /// * The collocations found, with advisories for soundings that could not be
    ///   evaluated. Contract violations and batch-level failures are errors.
    fn search(
        &self,
        instrument: &Arc<dyn NadirInstrument>,
        soundings: &[Occultation],
        params: &SearchParams,
        time_system: &TimeSystem,
    ) -> Result<Report<CollocationList>, RotcolError>;
}

/// Reject soundings with invalid geolocation before any work is done.
pub(crate) fn validate_soundings(soundings: &[Occultation]) -> Result<(), RotcolError> {
    soundings.iter().try_for_each(Occultation::validate)
}
