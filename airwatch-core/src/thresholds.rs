//! Efficiency thresholds per season
//!
//! Lifecycle of an [`EfficiencyThresholds`] record:
//!
//! ```text
//! hard-coded default ──► calibrated monthly (≥ 500 qualifying readings)
//!        ▲                         │
//!        │                         ▼
//!   missing/unreadable ◄── persisted under thresholds.<season>
//! ```
//!
//! Loading never fails: a missing or corrupt record falls back to the
//! season's default and the problem is logged.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::{DEFAULT_CRITICAL_PCT, DEFAULT_MIN_OUTDOOR_PM25, DEFAULT_WARN_PCT};
use crate::errors::{EngineError, EngineResult};
use crate::season::Season;
use crate::store::{keys, load_state, save_state, StateStore};

/// Warn/critical efficiency levels and the confidence cutoff for one season
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EfficiencyThresholds {
    /// Median efficiency below this is a warning (%)
    pub warn_pct: f64,
    /// Median efficiency below this is critical (%)
    pub critical_pct: f64,
    /// Outdoor PM2.5 below this is too low for a meaningful efficiency (μg/m³)
    pub min_outdoor_pm25: f64,
}

impl Default for EfficiencyThresholds {
    fn default() -> Self {
        Self {
            warn_pct: DEFAULT_WARN_PCT,
            critical_pct: DEFAULT_CRITICAL_PCT,
            min_outdoor_pm25: DEFAULT_MIN_OUTDOOR_PM25,
        }
    }
}

impl EfficiencyThresholds {
    pub fn new(warn_pct: f64, critical_pct: f64, min_outdoor_pm25: f64) -> Self {
        Self {
            warn_pct,
            critical_pct,
            min_outdoor_pm25,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        let finite = self.warn_pct.is_finite()
            && self.critical_pct.is_finite()
            && self.min_outdoor_pm25.is_finite();
        if !finite {
            return Err(EngineError::Config("thresholds must be finite".into()));
        }
        if self.critical_pct > self.warn_pct {
            return Err(EngineError::Config(format!(
                "critical threshold {} exceeds warning threshold {}",
                self.critical_pct, self.warn_pct
            )));
        }
        if self.min_outdoor_pm25 <= 0.0 {
            return Err(EngineError::Config(format!(
                "confidence cutoff must be positive, got {}",
                self.min_outdoor_pm25
            )));
        }
        Ok(())
    }
}

/// Persisted form of a season's thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredThresholds {
    pub thresholds: EfficiencyThresholds,
    /// When the record was calibrated, `None` for a seeded default
    pub calibrated_at: Option<DateTime<Utc>>,
    /// Qualifying readings the calibration used
    pub sample_count: usize,
}

/// Thresholds for every season
///
/// Seasons missing from a configured map use [`EfficiencyThresholds::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonalThresholds {
    by_season: BTreeMap<Season, EfficiencyThresholds>,
}

impl Default for SeasonalThresholds {
    fn default() -> Self {
        Self {
            by_season: Season::ALL
                .iter()
                .map(|s| (*s, EfficiencyThresholds::default()))
                .collect(),
        }
    }
}

impl SeasonalThresholds {
    pub fn get(&self, season: Season) -> EfficiencyThresholds {
        self.by_season
            .get(&season)
            .copied()
            .unwrap_or_default()
    }

    pub fn set(&mut self, season: Season, thresholds: EfficiencyThresholds) {
        self.by_season.insert(season, thresholds);
    }

    /// Load every season, falling back to defaults per season
    pub fn load(store: &dyn StateStore, defaults: &SeasonalThresholds) -> Self {
        let mut loaded = defaults.clone();
        for season in Season::ALL {
            if let Some(stored) = load_season(store, season) {
                loaded.set(season, stored.thresholds);
            }
        }
        loaded
    }
}

/// Stored record for one season, `None` when missing or unusable
pub fn load_season(store: &dyn StateStore, season: Season) -> Option<StoredThresholds> {
    match load_state::<StoredThresholds>(store, &keys::thresholds(season)) {
        Ok(Some(stored)) => match stored.thresholds.validate() {
            Ok(()) => Some(stored),
            Err(err) => {
                warn!("Ignoring stored {} thresholds: {}", season, err);
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            warn!("Could not read {} thresholds, using defaults: {}", season, err);
            None
        }
    }
}

/// Persist one season's record with a single write
pub fn store_season(
    store: &mut dyn StateStore,
    season: Season,
    record: &StoredThresholds,
) -> EngineResult<()> {
    save_state(store, &keys::thresholds(season), record)
}
