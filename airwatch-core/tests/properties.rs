//! Property tests for the evaluator invariants
//!
//! - sparse windows never produce a score
//! - excluding contaminated readings never lowers the median
//! - calibration never writes an under-powered season
//! - a persisting outage alerts once
//! - a persisting spike alerts once per cooldown

mod common;

use airwatch_core::{
    calibration::SeasonOutcome,
    config::CalibrationConfig,
    stats,
    store::StateStore,
    CalendarSeasons, EfficiencyEvaluator, EfficiencyThresholds, Evaluation, IndoorSpikeDetector,
    LivenessMonitor, MemoryStore, Reading, SeasonalCalibrator, SeasonalThresholds,
};
use chrono::Duration;
use proptest::prelude::*;

use common::{bedroom, now};

/// (outdoor, indoor) pairs that always qualify under default thresholds
fn clean_pair() -> impl Strategy<Value = (f64, f64)> {
    (10.0f64..60.0).prop_flat_map(|outdoor| (Just(outdoor), 0.0..=outdoor))
}

fn rows_from(pairs: &[(f64, f64)]) -> Vec<Reading> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, (outdoor, indoor))| bedroom(5 * i as i64).with_pm25(*indoor, *outdoor))
        .collect()
}

proptest! {
    #[test]
    fn fewer_than_five_qualifying_is_insufficient(
        qualifying in prop::collection::vec(clean_pair(), 0..5),
        clean_air in prop::collection::vec((0.0f64..9.99, 0.0f64..9.99), 0..40),
    ) {
        let mut pairs = qualifying;
        pairs.extend(clean_air);
        let evaluation = EfficiencyEvaluator::default()
            .evaluate(&rows_from(&pairs), &EfficiencyThresholds::default());
        let is_insufficient = matches!(evaluation, Evaluation::InsufficientData { .. });
        prop_assert!(is_insufficient);
    }

    #[test]
    fn contamination_exclusion_never_lowers_median(
        clean in prop::collection::vec(clean_pair(), 5..30),
        contaminated in prop::collection::vec(
            (10.0f64..60.0).prop_flat_map(|o| (Just(o), (o + 0.1)..(o + 80.0))),
            1..15,
        ),
    ) {
        let thresholds = EfficiencyThresholds::default();
        let clean_rows = rows_from(&clean);
        let mut all_rows = clean_rows.clone();
        all_rows.extend(rows_from(&contaminated));

        let Evaluation::Scored(reported) = EfficiencyEvaluator::default().evaluate(&all_rows, &thresholds) else {
            return Err(TestCaseError::fail("clean rows alone qualify"));
        };

        // Naive median over every row with outdoor above the cutoff.
        let naive: Vec<f64> = all_rows.iter().filter_map(|r| r.efficiency()).collect();
        let naive_median = stats::median(&naive).unwrap();
        prop_assert!(reported.median_efficiency >= naive_median);
        prop_assert_eq!(reported.sample_count, clean.len());
    }

    #[test]
    fn sparse_seasons_are_never_overwritten(count in 0usize..500) {
        let rows: Vec<Reading> = (0..count)
            .map(|i| bedroom(10 * i as i64).with_pm25(2.0, 20.0))
            .collect();
        let calibrator = SeasonalCalibrator::new(CalibrationConfig::default());
        let report = calibrator.calibrate(&rows, &SeasonalThresholds::default(), &CalendarSeasons, now());
        let all_skipped = report.values().all(|o| matches!(o, SeasonOutcome::Skipped { .. }));
        prop_assert!(all_skipped);

        let mut store = MemoryStore::new();
        let written = calibrator.persist(&report, &mut store).unwrap();
        prop_assert!(written.is_empty());
        prop_assert!(store.is_empty());
    }

    #[test]
    fn persisting_outage_alerts_once(gap_minutes in 121i64..230, checks in 1usize..24) {
        let rows = vec![bedroom(gap_minutes)];
        let monitor = LivenessMonitor::default();
        let mut store = MemoryStore::new();

        let mut stopped = 0;
        let mut resumed = 0;
        for n in 0..checks {
            let at = now() + Duration::minutes(10 * n as i64);
            let report = monitor.check(&rows, &mut store, at);
            stopped += report.stopped.len();
            resumed += report.resumed.len();
        }
        prop_assert_eq!(stopped, 1);
        prop_assert_eq!(resumed, 0);
        prop_assert!(store.get("liveness.airthings_master_bedroom").unwrap().is_some());
    }

    #[test]
    fn spike_alerts_once_per_cooldown(step in 1i64..15, delta in 5.0f64..80.0) {
        let detector = IndoorSpikeDetector::default();
        let mut store = MemoryStore::new();
        let mut alerts = 0;
        let mut minute = 0;
        while minute < 60 {
            let at = now() + Duration::minutes(minute);
            let reading = bedroom(0).with_pm25(10.0 + delta, 10.0);
            if detector.check(&reading, &mut store, at).unwrap().is_some() {
                alerts += 1;
            }
            minute += step;
        }
        prop_assert_eq!(alerts, 1);

        let quiet = bedroom(0).with_pm25(10.0, 10.0);
        detector.check(&quiet, &mut store, now() + Duration::minutes(minute)).unwrap();
        let recurred = bedroom(0).with_pm25(10.0 + delta, 10.0);
        let again = detector.check(&recurred, &mut store, now() + Duration::minutes(minute + 1)).unwrap();
        prop_assert!(again.is_some());
    }
}
