//! Efficiency Evaluator
//!
//! Reduces a trailing window of readings to one robust filter-efficiency score
//! and classifies it against the season's thresholds.
//!
//! ## Algorithm
//!
//! 1. Keep readings that pass [`qualifies`]: outdoor PM2.5 at or above the
//!    confidence cutoff and indoor not above outdoor.
//! 2. Fewer than five left: no score. Nothing is estimated from less.
//! 3. Median of the remaining efficiencies.
//! 4. `CRITICAL` below `critical_pct`, `WARNING` below `warn_pct`, else `OK`.
//!
//! The evaluator is pure. Turning a status into an alert, and not repeating
//! that alert every hour, is [`EfficiencyAlertGate`]'s job.

use chrono::Duration;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::alerts::{Alert, AlertKind, AlertLevel};
use crate::confidence::qualifies;
use crate::constants::MIN_QUALIFYING_READINGS;
use crate::errors::EngineResult;
use crate::reading::Reading;
use crate::stats;
use crate::store::{keys, load_state, save_state, StateStore};
use crate::thresholds::EfficiencyThresholds;
use crate::time::{elapsed_since, Timestamp};

/// Classification of a median efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EfficiencyStatus {
    Ok,
    Warning,
    Critical,
}

impl EfficiencyStatus {
    pub fn classify(median: f64, thresholds: &EfficiencyThresholds) -> Self {
        if median < thresholds.critical_pct {
            EfficiencyStatus::Critical
        } else if median < thresholds.warn_pct {
            EfficiencyStatus::Warning
        } else {
            EfficiencyStatus::Ok
        }
    }

    pub fn alert_level(&self) -> Option<AlertLevel> {
        match self {
            EfficiencyStatus::Ok => None,
            EfficiencyStatus::Warning => Some(AlertLevel::Warning),
            EfficiencyStatus::Critical => Some(AlertLevel::Critical),
        }
    }
}

/// A computed efficiency score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyScore {
    pub median_efficiency: f64,
    pub sample_count: usize,
    pub status: EfficiencyStatus,
    pub thresholds: EfficiencyThresholds,
}

/// Result of one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    Scored(EfficiencyScore),
    /// Too few qualifying readings; callers raise no alert
    InsufficientData { available: usize, required: usize },
}

impl Evaluation {
    pub fn score(&self) -> Option<&EfficiencyScore> {
        match self {
            Evaluation::Scored(score) => Some(score),
            Evaluation::InsufficientData { .. } => None,
        }
    }
}

/// Median-of-qualifying-readings efficiency evaluator
#[derive(Debug, Clone, Copy)]
pub struct EfficiencyEvaluator {
    min_readings: usize,
}

impl Default for EfficiencyEvaluator {
    fn default() -> Self {
        Self {
            min_readings: MIN_QUALIFYING_READINGS,
        }
    }
}

impl EfficiencyEvaluator {
    pub fn new(min_readings: usize) -> Self {
        Self {
            min_readings: min_readings.max(1),
        }
    }

    pub fn evaluate(&self, readings: &[Reading], thresholds: &EfficiencyThresholds) -> Evaluation {
        let efficiencies: Vec<f64> = readings
            .iter()
            .filter_map(|r| qualifies(r, thresholds))
            .collect();

        if efficiencies.len() < self.min_readings {
            debug!(
                "Efficiency: {} of {} readings qualify, need {}",
                efficiencies.len(),
                readings.len(),
                self.min_readings
            );
            return Evaluation::InsufficientData {
                available: efficiencies.len(),
                required: self.min_readings,
            };
        }

        match stats::median(&efficiencies) {
            Some(median) => Evaluation::Scored(EfficiencyScore {
                median_efficiency: median,
                sample_count: efficiencies.len(),
                status: EfficiencyStatus::classify(median, thresholds),
                thresholds: *thresholds,
            }),
            None => Evaluation::InsufficientData {
                available: 0,
                required: self.min_readings,
            },
        }
    }
}

/// Last efficiency alert, persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastEfficiencyAlert {
    pub status: EfficiencyStatus,
    pub at: Timestamp,
}

/// Dampens repeated efficiency alerts
///
/// Fires on escalation or once the cooldown has passed; an `OK` status
/// clears the record so the next degradation alerts immediately.
#[derive(Debug, Clone, Copy)]
pub struct EfficiencyAlertGate {
    cooldown: Duration,
}

impl EfficiencyAlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn check(
        &self,
        score: &EfficiencyScore,
        store: &mut dyn StateStore,
        now: Timestamp,
    ) -> EngineResult<Option<Alert>> {
        let Some(level) = score.status.alert_level() else {
            store.remove(keys::EFFICIENCY_ALERT)?;
            return Ok(None);
        };

        let last: Option<LastEfficiencyAlert> = load_state(store, keys::EFFICIENCY_ALERT)?;
        let due = match last {
            None => true,
            Some(last) => score.status > last.status || elapsed_since(last.at, now) >= self.cooldown,
        };
        if !due {
            debug!("Efficiency {:?} already alerted, cooldown active", score.status);
            return Ok(None);
        }

        save_state(
            store,
            keys::EFFICIENCY_ALERT,
            &LastEfficiencyAlert {
                status: score.status,
                at: now,
            },
        )?;
        Ok(Some(Alert::new(level, AlertKind::Efficiency, describe(score), now)))
    }
}

fn describe(score: &EfficiencyScore) -> String {
    let action = match score.status {
        EfficiencyStatus::Critical => "Replace the HVAC filter now.",
        _ => "Plan a filter replacement soon.",
    };
    format!(
        "Filter efficiency is {:.1}% (median of {} high-confidence readings; warn < {:.1}%, critical < {:.1}%). {}",
        score.median_efficiency,
        score.sample_count,
        score.thresholds.warn_pct,
        score.thresholds.critical_pct,
        action
    )
}
