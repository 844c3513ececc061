//! Exhaustive collocation search.
//!
//! Every footprint whose scan mid time lies inside the time window of a sounding is
//! compared with it. Slow, but exact up to the footprint grid, which makes it the
//! reference the rotation search is validated against.

use std::sync::Arc;

use itertools::{Itertools, MinMaxResult};
use log::{debug, info, warn};

use crate::collocation::collocation_list::CollocationList;
use crate::collocation::Collocation;
use crate::instruments::scan_swath::ScanSwathIndex;
use crate::instruments::NadirInstrument;
use crate::occultation::Occultation;
use crate::ref_system::{angular_distance, spatial_tolerance_angle};
use crate::report::{AdvisoryKind, Report};
use crate::rotcol_errors::RotcolError;
use crate::search::{validate_soundings, CollocationSearch, SearchParams};
use crate::time::time_system::TimeSystem;

/// Nearest-footprint search over the whole swath.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce;

/// Closest footprint to a sounding among the scans `candidates`, first in
/// (scan, footprint) order on ties.
fn nearest_footprint(
    swath: &ScanSwathIndex,
    candidates: &[usize],
    sounding: &Occultation,
) -> Option<((usize, usize), f64)> {
    let target = sounding.unit_vector();
    candidates
        .iter()
        .flat_map(|&scan| (0..swath.footprints_per_scan()).map(move |fp| (scan, fp)))
        .map(|(scan, fp)| {
            let distance = angular_distance(&swath.footprint_vector(scan, fp), &target);
            ((scan, fp), distance)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

impl CollocationSearch for BruteForce {
    fn name(&self) -> &'static str {
        "brute force"
    }

    fn search(
        &self,
        instrument: &Arc<dyn NadirInstrument>,
        soundings: &[Occultation],
        params: &SearchParams,
        _time_system: &TimeSystem,
    ) -> Result<Report<CollocationList>, RotcolError> {
        validate_soundings(soundings)?;
        let mut report = Report::new(CollocationList::default());

        let (first, last) = match soundings.iter().map(|s| s.time).minmax() {
            MinMaxResult::NoElements => {
                warn!("Brute force collocation called without any sounding");
                report.push(AdvisoryKind::EmptyBatch, "no sounding to collocate");
                return Ok(report);
            }
            MinMaxResult::OneElement(t) => (t, t),
            MinMaxResult::MinMax(first, last) => (first, last),
        };

        let tol = params.time_tolerance;
        let swath = Arc::new(instrument.get_geolocations(first - tol, last + tol)?);
        debug!(
            "{} scans of {} loaded for {} sounding(s)",
            swath.len(),
            instrument.label(),
            soundings.len()
        );

        for sounding in soundings {
            let candidates = swath.scans_within(sounding.time - tol, sounding.time + tol);
            if candidates.is_empty() {
                report.push(
                    AdvisoryKind::NoCandidateScans,
                    format!(
                        "{}: no scan of {} within {tol} s",
                        sounding.occid,
                        instrument.label()
                    ),
                );
                continue;
            }

            let Some(((scan, fp), distance)) = nearest_footprint(&swath, &candidates, sounding)
            else {
                continue;
            };
            let Some((_, fp_latitude)) = swath.geolocation(scan, fp) else {
                continue;
            };

            let mean_latitude = 0.5 * (sounding.latitude_rad() + fp_latitude);
            if distance > spatial_tolerance_angle(params.spatial_tolerance, mean_latitude) {
                debug!(
                    "{}: nearest footprint ({scan}, {fp}) is {distance:.5} rad away",
                    sounding.occid
                );
                continue;
            }

            report.data.push(Collocation::exact(
                sounding.clone(),
                Arc::clone(instrument),
                Arc::clone(&swath),
                scan,
                fp,
            )?);
        }

        info!(
            "Brute force collocation: {} of {} sounding(s) collocated with {}",
            report.data.len(),
            soundings.len(),
            instrument.label()
        );
        Ok(report)
    }
}
