//! # rotcol
//!
//! Collocation of radio-occultation (RO) soundings with the footprints of
//! cross-track scanning nadir instruments (AMSU-A, ATMS, AIRS).
//!
//! Two searches share the [`CollocationSearch`](search::CollocationSearch) contract:
//! an exhaustive [`BruteForce`](search::brute_force::BruteForce) comparison with every
//! footprint, and the [`RotationCollocation`](search::rotation::RotationCollocation)
//! which moves each sounding into the orbital frame of the scanner and only needs
//! its element set. Results are [`CollocationList`](collocation::collocation_list::CollocationList)s,
//! which support set algebra and a refinement step that resolves the exact footprint.

pub mod collocation;
pub mod constants;
pub mod instruments;
pub mod occultation;
pub mod orbit;
pub mod ref_system;
pub mod report;
pub mod rotcol_errors;
pub mod search;
pub mod time;
