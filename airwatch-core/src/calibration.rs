//! Seasonal Calibrator
//!
//! ## Overview
//!
//! Once a month the full reading history is partitioned by season and each
//! season's thresholds are re-derived from how this particular filter and HVAC
//! system has actually performed:
//!
//! ```text
//! warn_pct     = P10 of qualifying efficiency
//! critical_pct = P5  of qualifying efficiency
//! ```
//!
//! ## Sample Floor
//!
//! A season with fewer than 500 qualifying readings is skipped outright and
//! keeps its current thresholds. Percentiles from a few hundred clean-air
//! readings are dominated by noise; stale defaults are the lesser evil.
//!
//! ## Atomicity
//!
//! [`SeasonalCalibrator::calibrate`] is pure. [`SeasonalCalibrator::persist`]
//! writes each calibrated season as one record with one store write, so a
//! run interrupted between seasons leaves every season either fully old or
//! fully new.
//!
//! Running calibration twice over the same history yields the same records:
//! the confidence cutoff that selected the sample is carried forward as is.

use log::{info, warn};
use std::collections::BTreeMap;

use crate::config::CalibrationConfig;
use crate::confidence::qualifies;
use crate::errors::EngineResult;
use crate::reading::Reading;
use crate::season::{Season, SeasonRule};
use crate::stats;
use crate::store::StateStore;
use crate::thresholds::{store_season, EfficiencyThresholds, SeasonalThresholds, StoredThresholds};
use crate::time::Timestamp;

/// Result of calibrating one season
#[derive(Debug, Clone, PartialEq)]
pub enum SeasonOutcome {
    Calibrated(StoredThresholds),
    /// Not enough qualifying readings; current thresholds stay
    Skipped { qualifying: usize, required: usize },
}

impl SeasonOutcome {
    pub fn is_calibrated(&self) -> bool {
        matches!(self, SeasonOutcome::Calibrated(_))
    }
}

/// Outcome for every season
pub type CalibrationReport = BTreeMap<Season, SeasonOutcome>;

/// Derives per-season thresholds from history
#[derive(Debug, Clone)]
pub struct SeasonalCalibrator {
    config: CalibrationConfig,
}

impl Default for SeasonalCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}

impl SeasonalCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Calibrate every season against its current thresholds
    pub fn calibrate(
        &self,
        readings: &[Reading],
        current: &SeasonalThresholds,
        seasons: &dyn SeasonRule,
        now: Timestamp,
    ) -> CalibrationReport {
        let mut samples: BTreeMap<Season, Vec<f64>> =
            Season::ALL.iter().map(|s| (*s, Vec::new())).collect();

        for reading in readings {
            let season = seasons.season_of(reading.timestamp);
            if let Some(efficiency) = qualifies(reading, &current.get(season)) {
                samples.entry(season).or_default().push(efficiency);
            }
        }

        samples
            .into_iter()
            .map(|(season, values)| {
                let outcome = self.calibrate_season(&values, &current.get(season), now);
                (season, outcome)
            })
            .collect()
    }

    fn calibrate_season(
        &self,
        efficiencies: &[f64],
        current: &EfficiencyThresholds,
        now: Timestamp,
    ) -> SeasonOutcome {
        let required = self.config.min_samples;
        if efficiencies.len() < required {
            return SeasonOutcome::Skipped {
                qualifying: efficiencies.len(),
                required,
            };
        }

        let warn_pct = stats::percentile(efficiencies, self.config.warn_percentile);
        let critical_pct = stats::percentile(efficiencies, self.config.critical_percentile);
        match (warn_pct, critical_pct) {
            (Some(warn_pct), Some(critical_pct)) => SeasonOutcome::Calibrated(StoredThresholds {
                thresholds: EfficiencyThresholds::new(
                    stats::round_to(warn_pct, 2),
                    stats::round_to(critical_pct, 2),
                    current.min_outdoor_pm25,
                ),
                calibrated_at: Some(now),
                sample_count: efficiencies.len(),
            }),
            _ => SeasonOutcome::Skipped {
                qualifying: efficiencies.len(),
                required,
            },
        }
    }

    /// Write every calibrated season; skipped seasons are left untouched
    ///
    /// Returns the seasons written.
    pub fn persist(
        &self,
        report: &CalibrationReport,
        store: &mut dyn StateStore,
    ) -> EngineResult<Vec<Season>> {
        let mut written = Vec::new();
        for (season, outcome) in report {
            match outcome {
                SeasonOutcome::Calibrated(record) => {
                    store_season(store, *season, record)?;
                    info!(
                        "Calibrated {}: warn {:.1}%, critical {:.1}% from {} readings",
                        season,
                        record.thresholds.warn_pct,
                        record.thresholds.critical_pct,
                        record.sample_count
                    );
                    written.push(*season);
                }
                SeasonOutcome::Skipped { qualifying, required } => {
                    warn!(
                        "Skipping {} calibration: {} qualifying readings, need {}",
                        season, qualifying, required
                    );
                }
            }
        }
        store.flush()?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::CalendarSeasons;
    use crate::store::MemoryStore;
    use crate::thresholds::load_season;
    use chrono::{Duration, TimeZone, Utc};

    fn winter_readings(count: usize) -> Vec<Reading> {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        (0..count)
            .map(|i| {
                Reading::new(start + Duration::minutes(10 * i as i64), "airthings_1", "office", "airthings")
                    .with_pm25(2.0, 15.0)
                    .with_efficiency(60.0 + (i % 41) as f64)
            })
            .collect()
    }

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 3, 1, 3, 0, 0).unwrap()
    }

    #[test]
    fn sparse_seasons_skipped() {
        let report = SeasonalCalibrator::default().calibrate(
            &winter_readings(499),
            &SeasonalThresholds::default(),
            &CalendarSeasons,
            now(),
        );
        assert_eq!(
            report[&Season::Winter],
            SeasonOutcome::Skipped { qualifying: 499, required: 500 }
        );
        assert!(!report[&Season::Summer].is_calibrated());
    }

    #[test]
    fn percentiles_become_thresholds() {
        let report = SeasonalCalibrator::default().calibrate(
            &winter_readings(820),
            &SeasonalThresholds::default(),
            &CalendarSeasons,
            now(),
        );
        let SeasonOutcome::Calibrated(record) = &report[&Season::Winter] else {
            panic!("winter should calibrate");
        };
        assert_eq!(record.sample_count, 820);
        assert!(record.thresholds.critical_pct <= record.thresholds.warn_pct);
        assert!(record.thresholds.warn_pct >= 60.0 && record.thresholds.warn_pct < 70.0);
        assert_eq!(record.thresholds.min_outdoor_pm25, 10.0);
        assert_eq!(record.calibrated_at, Some(now()));
    }

    #[test]
    fn low_outdoor_readings_do_not_count() {
        let mut readings = winter_readings(400);
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        readings.extend((0..300).map(|i| {
            Reading::new(start + Duration::minutes(i), "airthings_1", "office", "airthings")
                .with_pm25(1.0, 4.0)
                .with_efficiency(75.0)
        }));
        let report = SeasonalCalibrator::default().calibrate(
            &readings,
            &SeasonalThresholds::default(),
            &CalendarSeasons,
            now(),
        );
        assert_eq!(
            report[&Season::Winter],
            SeasonOutcome::Skipped { qualifying: 400, required: 500 }
        );
    }

    #[test]
    fn persist_writes_only_calibrated() {
        let calibrator = SeasonalCalibrator::default();
        let report = calibrator.calibrate(
            &winter_readings(600),
            &SeasonalThresholds::default(),
            &CalendarSeasons,
            now(),
        );
        let mut store = MemoryStore::new();
        let written = calibrator.persist(&report, &mut store).unwrap();

        assert_eq!(written, vec![Season::Winter]);
        assert_eq!(store.len(), 1);
        assert!(load_season(&store, Season::Winter).is_some());
        assert!(load_season(&store, Season::Summer).is_none());
    }

    #[test]
    fn calibration_is_idempotent() {
        let calibrator = SeasonalCalibrator::default();
        let readings = winter_readings(700);
        let first = calibrator.calibrate(&readings, &SeasonalThresholds::default(), &CalendarSeasons, now());

        let mut current = SeasonalThresholds::default();
        if let SeasonOutcome::Calibrated(record) = &first[&Season::Winter] {
            current.set(Season::Winter, record.thresholds);
        }
        let second = calibrator.calibrate(&readings, &current, &CalendarSeasons, now());
        assert_eq!(first, second);
    }
}
