mod common;

use std::sync::Arc;

use approx::assert_relative_eq;
use common::{cross_track_angle, OrbitScanner};

use rotcol::collocation::collocation_list::{CollocationList, ConfusionMatrix, SortOrder};
use rotcol::collocation::CollocationStatus;
use rotcol::instruments::scan_swath::FileHandleCache;
use rotcol::instruments::NadirInstrument;
use rotcol::occultation::Occultation;
use rotcol::report::AdvisoryKind;
use rotcol::rotcol_errors::RotcolError;
use rotcol::search::brute_force::BruteForce;
use rotcol::search::rotation::RotationCollocation;
use rotcol::search::{CollocationSearch, SearchParams};

fn params() -> SearchParams {
    SearchParams::builder()
        .time_tolerance(300.0)
        .spatial_tolerance(50_000.0)
        .build()
        .unwrap()
}

/// Soundings on footprints of the scanner, and soundings far outside its swath.
fn soundings(scanner: &OrbitScanner) -> (Vec<Occultation>, Vec<&'static str>) {
    let on_footprint = [
        ("occ-a", 30, 10),
        ("occ-b", 45, 0),
        ("occ-c", 60, 20),
        ("occ-d", 90, 4),
        ("occ-e", 110, 17),
    ];
    let off_track = [("occ-x", 50, 0.4), ("occ-y", 80, -0.5), ("occ-z", 100, 0.9)];

    let mut all: Vec<Occultation> = on_footprint
        .iter()
        .map(|&(id, scan, fp)| scanner.sounding_on_footprint(id, scan, fp))
        .collect();
    all.extend(
        off_track
            .iter()
            .map(|&(id, scan, angle)| scanner.sounding_off_track(id, scan, angle)),
    );
    (all, on_footprint.iter().map(|&(id, _, _)| id).collect())
}

#[test]
fn test_brute_force_and_rotation_agree() {
    let scanner = OrbitScanner::new(150);
    let (soundings, expected) = soundings(&scanner);
    let instrument: Arc<dyn NadirInstrument> = Arc::new(scanner);
    let ts = common::time_system();

    let brute = BruteForce
        .search(&instrument, &soundings, &params(), &ts)
        .unwrap();
    let rotation = RotationCollocation::default()
        .search(&instrument, &soundings, &params(), &ts)
        .unwrap();

    assert!(brute.advisories.is_empty());
    assert!(rotation.advisories.is_empty());
    assert_eq!(brute.data.occids(), expected);
    assert_eq!(rotation.data.occids(), expected);

    let confusion = ConfusionMatrix::compare(&brute.data, &rotation.data, soundings.len()).unwrap();
    assert_eq!(confusion.true_positive, expected.len());
    assert_eq!(confusion.false_positive, 0);
    assert_eq!(confusion.false_negative, 0);
    assert_eq!(confusion.true_negative, soundings.len() - expected.len());
}

#[test]
fn test_more_sub_occultations_find_the_same_collocations() {
    let scanner = OrbitScanner::new(150);
    let (soundings, expected) = soundings(&scanner);
    let instrument: Arc<dyn NadirInstrument> = Arc::new(scanner);
    let ts = common::time_system();

    for n_subocc in [2, 3, 5] {
        let report = RotationCollocation::new(n_subocc)
            .unwrap()
            .search(&instrument, &soundings, &params(), &ts)
            .unwrap();
        assert_eq!(report.data.occids(), expected, "n_subocc = {n_subocc}");
    }
}

#[test]
fn test_rotation_estimates_and_refinement() {
    let scanner = OrbitScanner::new(150);
    let (soundings, expected) = soundings(&scanner);
    let start = scanner.start;
    let instrument: Arc<dyn NadirInstrument> = Arc::new(scanner);
    let ts = common::time_system();

    let mut rotation = RotationCollocation::default()
        .search(&instrument, &soundings, &params(), &ts)
        .unwrap()
        .into_data();

    let brute = BruteForce
        .search(&instrument, &soundings, &params(), &ts)
        .unwrap()
        .into_data();

    for colloc in &rotation {
        assert!(!colloc.is_refined());
        let occ = colloc.occultation();
        // the estimate stays within one scan of the sounding time
        let dt = colloc.time().unwrap() - occ.time;
        assert!(dt.abs() < 8.0, "{}: time off by {dt} s", occ.occid);

        let reference = brute.get(&occ.occid).unwrap();
        let fp = reference.footprint_index().unwrap();
        assert_relative_eq!(
            colloc.scan_angle().unwrap(),
            cross_track_angle(fp),
            epsilon = 2e-3
        );
    }

    let advisories = rotation.refine_all().unwrap();
    assert!(advisories.is_empty());

    let mut cache = FileHandleCache::default();
    for (colloc, id) in rotation.iter().zip(&expected) {
        let reference = brute.get(id).unwrap();
        assert!(colloc.is_refined());
        assert_eq!(colloc.status(), CollocationStatus::Nominal);
        assert_eq!(colloc.footprint_index(), reference.footprint_index());
        assert_eq!(colloc.time(), reference.time());
        assert_relative_eq!(
            colloc.longitude().unwrap(),
            reference.longitude().unwrap(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            colloc.latitude().unwrap(),
            reference.latitude().unwrap(),
            epsilon = 1e-9
        );

        let record = colloc.get_data(&mut cache).unwrap();
        let scan = record.get("scan").unwrap()[0];
        let scan_time = start + 8.0 * scan;
        assert_eq!(Some(scan_time), reference.time());
        assert_eq!(
            record.get("footprint").unwrap()[0] as usize,
            reference.footprint_index().unwrap()
        );
    }
}

#[test]
fn test_set_algebra_of_search_results() {
    let scanner = OrbitScanner::new(150);
    let (soundings, _) = soundings(&scanner);
    let instrument: Arc<dyn NadirInstrument> = Arc::new(scanner);
    let ts = common::time_system();

    let brute = BruteForce
        .search(&instrument, &soundings[..3], &params(), &ts)
        .unwrap()
        .into_data();
    let rotation = RotationCollocation::default()
        .search(&instrument, &soundings[2..], &params(), &ts)
        .unwrap()
        .into_data();

    let ab = brute.union(&rotation);
    let ba = rotation.union(&brute);
    assert_eq!(ab.key_set(), ba.key_set());
    assert_eq!(
        ab.occids(),
        vec!["occ-a", "occ-b", "occ-c", "occ-d", "occ-e"]
    );

    // the colliding key keeps the exact collocation of the left operand
    assert!(ab.get("occ-c").unwrap().is_refined());
    assert!(!ba.get("occ-c").unwrap().is_refined());

    assert_eq!(brute.intersection(&brute).key_set(), brute.key_set());
    assert_eq!(
        brute.union(&brute.intersection(&rotation)).key_set(),
        brute.key_set()
    );
    assert_eq!(brute.intersection(&rotation).occids(), vec!["occ-c"]);

    let by_time = ab.sorted(SortOrder::OccTime, &ts).unwrap();
    assert_eq!(
        by_time.occids(),
        vec!["occ-a", "occ-b", "occ-c", "occ-d", "occ-e"]
    );

    let empty = CollocationList::default();
    assert_eq!(empty.union(&brute).key_set(), brute.key_set());
    assert!(empty.intersection(&brute).is_empty());
}

#[test]
fn test_missing_orbit_data_fails_only_the_rotation_batch() {
    let scanner = OrbitScanner::new(150);
    let ts = common::time_system();
    let late = scanner.start + 3.0 * 86_400.0;
    let instrument: Arc<dyn NadirInstrument> = Arc::new(scanner);

    let soundings = vec![
        Occultation::new("late-1", 20.0, 10.0, late).unwrap(),
        Occultation::new("late-2", -20.0, -10.0, late + 60.0).unwrap(),
    ];

    assert!(matches!(
        RotationCollocation::default().search(&instrument, &soundings, &params(), &ts),
        Err(RotcolError::MissingOrbitData(_))
    ));

    let brute = BruteForce
        .search(&instrument, &soundings, &params(), &ts)
        .unwrap();
    assert!(brute.data.is_empty());
    assert_eq!(brute.count(AdvisoryKind::NoCandidateScans), 2);
}

#[test]
fn test_contract_violations() {
    let scanner = OrbitScanner::new(10);
    let ts = common::time_system();
    let t = scanner.start;
    let instrument: Arc<dyn NadirInstrument> = Arc::new(scanner);

    assert!(matches!(
        RotationCollocation::new(1),
        Err(RotcolError::InvalidArgument(_))
    ));

    let bad = Occultation {
        occid: "bad".into(),
        longitude: 0.0,
        latitude: 123.0,
        time: t,
    };
    let rotation = RotationCollocation::default();
    let searches: [&dyn CollocationSearch; 2] = [&BruteForce, &rotation];
    for search in searches {
        assert!(matches!(
            search.search(&instrument, &[bad.clone()], &params(), &ts),
            Err(RotcolError::InvalidArgument(_))
        ));

        let report = search.search(&instrument, &[], &params(), &ts).unwrap();
        assert!(report.data.is_empty());
        assert_eq!(report.count(AdvisoryKind::EmptyBatch), 1, "{}", search.name());
    }
}

#[test]
fn test_wider_tolerance_never_loses_collocations() {
    let scanner = OrbitScanner::new(150);
    let ts = common::time_system();
    let soundings: Vec<Occultation> = [0.085, 0.09, 0.1, 0.12, 0.15]
        .iter()
        .enumerate()
        .map(|(i, &angle)| scanner.sounding_off_track(&format!("edge-{i}"), 40 + 10 * i, angle))
        .collect();
    let instrument: Arc<dyn NadirInstrument> = Arc::new(scanner);

    let mut previous = 0;
    for km in [10.0, 50.0, 100.0, 200.0, 400.0, 500.0] {
        let params = SearchParams::builder()
            .time_tolerance(300.0)
            .spatial_tolerance(km * 1_000.0)
            .build()
            .unwrap();
        let found = BruteForce
            .search(&instrument, &soundings, &params, &ts)
            .unwrap()
            .data
            .len();
        assert!(found >= previous, "{found} < {previous} at {km} km");
        previous = found;
    }
    assert_eq!(previous, soundings.len());
}
