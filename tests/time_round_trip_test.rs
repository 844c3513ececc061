use approx::assert_abs_diff_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rotcol::time::calendar::Calendar;
use rotcol::time::time_system::{TimeSystem, UtcConvention};
use rotcol::time::Instant;

/// Random UTC date away from any leap-second insertion (never the last minute of a day).
fn random_utc(rng: &mut StdRng) -> Calendar {
    Calendar::new(
        rng.random_range(1980..2030),
        rng.random_range(1..=12),
        rng.random_range(1..=28),
        rng.random_range(0..24),
        rng.random_range(0..59),
        rng.random_range(0.0..60.0),
    )
    .unwrap()
}

fn assert_same_fields(a: &Calendar, b: &Calendar) {
    assert_eq!(
        (a.year, a.month, a.day, a.hour, a.minute),
        (b.year, b.month, b.day, b.hour, b.minute)
    );
    assert_abs_diff_eq!(a.second, b.second, epsilon = 1e-6);
}

#[test]
fn test_round_trip_through_tai() {
    let mut rng = StdRng::seed_from_u64(42);

    for convention in [UtcConvention::System1, UtcConvention::System2] {
        let ts = TimeSystem::builtin(convention).unwrap();
        for _ in 0..500 {
            let utc = random_utc(&mut rng);
            let t = Instant::builder().utc(utc).build(&ts).unwrap();

            let tai = t.to(&ts, "tai").unwrap();
            let back = Instant::builder().tai(tai).build(&ts).unwrap();
            assert_abs_diff_eq!(back - t, 0.0, epsilon = 1e-6);
            assert_same_fields(&back.to(&ts, "utc").unwrap(), &utc);

            let gps = t.to(&ts, "gps").unwrap();
            let from_gps = Instant::builder().gps(gps).build(&ts).unwrap();
            assert_same_fields(&from_gps.to(&ts, "utc").unwrap(), &utc);
        }
    }
}

#[test]
fn test_leap_second_boundaries() {
    let ts = TimeSystem::builtin(UtcConvention::System2).unwrap();

    for (year, month, offset) in [(1998, 12, 31.0), (2012, 6, 34.0), (2016, 12, 36.0)] {
        let next = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let midnight = ts.from_utc(&Calendar::date(next.0, next.1, 1).unwrap()).unwrap();

        let before = ts.tai_minus_utc(midnight - 2.0);
        let after = ts.tai_minus_utc(midnight + 1e-3);
        assert_abs_diff_eq!(before, offset, epsilon = 1e-9);
        assert_abs_diff_eq!(after - before, 1.0, epsilon = 1e-9);

        // the inserted second exists, a minute later everything is regular again
        let inside = ts.to(midnight - 0.5, "utc").unwrap();
        assert_abs_diff_eq!(inside.second, 60.5, epsilon = 1e-6);
        let later = ts.to(midnight + 60.0, "utc").unwrap();
        assert_eq!((later.hour, later.minute), (0, 1));
    }

    let t = ts.from_utc(&Calendar::date(2020, 1, 1).unwrap()).unwrap();
    assert!(ts.to(t, "ut1").is_err());
}
