//! Engine configuration
//!
//! Every section derives `Deserialize` with `#[serde(default)]`, so a JSON
//! file only needs the values it changes:
//!
//! ```json
//! {
//!   "routing": { "primary": ["alex@example.com"], "extended": ["sam@example.com"] },
//!   "liveness": { "gap_hours": 3 },
//!   "filters": [{ "filter_type": "Fridge water", "interval_days": 180 }]
//! }
//! ```
//!
//! Defaults come from [`crate::constants`].

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::alerts::Routing;
use crate::constants::air::{CO2_COGNITIVE_LIMIT_PPM, PM25_DAILY_GUIDELINE_UGM3};
use crate::constants::alerting::{
    CRITICAL_PERCENTILE, DEFAULT_OUTDOOR_SENSOR_KEY, MAX_OUTDOOR_FOR_HELP_UGM3, PRESSURE_DROP_HPA,
    SPIKE_DELTA_UGM3, WARN_PERCENTILE,
};
use crate::constants::time::{
    EFFICIENCY_ALERT_COOLDOWN_HOURS, EFFICIENCY_WINDOW_HOURS, LIVENESS_GAP_HOURS,
    LIVENESS_WINDOW_HOURS, PRESSURE_FETCH_TIMEOUT_SECS, PRESSURE_FORECAST_HOURS,
    PRESSURE_WINDOW_HOURS, REPORT_DAYS, RUN_BUDGET_SECS, SPIKE_COOLDOWN_MINUTES,
};
use crate::constants::{MIN_CALIBRATION_SAMPLES, MIN_QUALIFYING_READINGS};
use crate::errors::{EngineError, EngineResult};
use crate::thresholds::SeasonalThresholds;

/// Efficiency evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyConfig {
    pub window_hours: i64,
    pub min_readings: usize,
    /// Hours before an unchanged WARNING/CRITICAL is repeated
    pub alert_cooldown_hours: i64,
    /// Fallback thresholds when a season has no calibrated record
    pub defaults: SeasonalThresholds,
}

impl Default for EfficiencyConfig {
    fn default() -> Self {
        Self {
            window_hours: EFFICIENCY_WINDOW_HOURS,
            min_readings: MIN_QUALIFYING_READINGS,
            alert_cooldown_hours: EFFICIENCY_ALERT_COOLDOWN_HOURS,
            defaults: SeasonalThresholds::default(),
        }
    }
}

impl EfficiencyConfig {
    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }

    pub fn alert_cooldown(&self) -> Duration {
        Duration::hours(self.alert_cooldown_hours)
    }
}

/// Monthly calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub min_samples: usize,
    pub warn_percentile: f64,
    pub critical_percentile: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            min_samples: MIN_CALIBRATION_SAMPLES,
            warn_percentile: WARN_PERCENTILE,
            critical_percentile: CRITICAL_PERCENTILE,
        }
    }
}

/// Indoor-spike detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpikeConfig {
    /// Indoor minus outdoor PM2.5 that counts as a spike (μg/m³)
    pub delta_ugm3: f64,
    pub cooldown_minutes: i64,
    /// Outdoor PM2.5 at or below which ventilating helps (μg/m³)
    pub max_outdoor_for_help: f64,
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            delta_ugm3: SPIKE_DELTA_UGM3,
            cooldown_minutes: SPIKE_COOLDOWN_MINUTES,
            max_outdoor_for_help: MAX_OUTDOOR_FOR_HELP_UGM3,
        }
    }
}

impl SpikeConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes)
    }
}

/// Data liveness
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub gap_hours: i64,
    pub window_hours: i64,
    /// Key of the outdoor sensor fed through indoor rows, `None` to skip it
    pub outdoor_sensor_key: Option<String>,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            gap_hours: LIVENESS_GAP_HOURS,
            window_hours: LIVENESS_WINDOW_HOURS,
            outdoor_sensor_key: Some(DEFAULT_OUTDOOR_SENSOR_KEY.to_string()),
        }
    }
}

impl LivenessConfig {
    pub fn gap(&self) -> Duration {
        Duration::hours(self.gap_hours)
    }

    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }
}

/// Barometric pressure trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    pub enabled: bool,
    pub window_hours: i64,
    pub forecast_hours: i64,
    pub drop_hpa: f64,
    pub fetch_timeout_secs: u64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_hours: PRESSURE_WINDOW_HOURS,
            forecast_hours: PRESSURE_FORECAST_HOURS,
            drop_hpa: PRESSURE_DROP_HPA,
            fetch_timeout_secs: PRESSURE_FETCH_TIMEOUT_SECS,
        }
    }
}

impl PressureConfig {
    pub fn window(&self) -> Duration {
        Duration::hours(self.window_hours)
    }

    pub fn forecast(&self) -> Duration {
        Duration::hours(self.forecast_hours)
    }
}

/// Weekly report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub days: i64,
    pub pm25_guideline: f64,
    pub co2_limit: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            days: REPORT_DAYS,
            pm25_guideline: PM25_DAILY_GUIDELINE_UGM3,
            co2_limit: CO2_COGNITIVE_LIMIT_PPM,
        }
    }
}

/// Replacement schedule for one time-based filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterReminderRule {
    /// Matched case-insensitively against the log's filter type
    pub filter_type: String,
    /// Restricts the rule to one location when set
    #[serde(default)]
    pub location: Option<String>,
    pub interval_days: i64,
    /// Days before due that an INFO reminder starts
    #[serde(default = "default_lead_days")]
    pub lead_days: i64,
}

fn default_lead_days() -> i64 {
    14
}

impl FilterReminderRule {
    pub fn new(filter_type: impl Into<String>, interval_days: i64) -> Self {
        Self {
            filter_type: filter_type.into(),
            location: None,
            interval_days,
            lead_days: default_lead_days(),
        }
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn lead_days(mut self, days: i64) -> Self {
        self.lead_days = days;
        self
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub efficiency: EfficiencyConfig,
    pub calibration: CalibrationConfig,
    pub spike: SpikeConfig,
    pub liveness: LivenessConfig,
    pub pressure: PressureConfig,
    pub report: ReportConfig,
    pub filters: Vec<FilterReminderRule>,
    pub routing: Routing,
    pub run_budget_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            efficiency: EfficiencyConfig::default(),
            calibration: CalibrationConfig::default(),
            spike: SpikeConfig::default(),
            liveness: LivenessConfig::default(),
            pressure: PressureConfig::default(),
            report: ReportConfig::default(),
            filters: Vec::new(),
            routing: Routing::default(),
            run_budget_secs: RUN_BUDGET_SECS,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Primary recipients receive every alert kind
    pub fn with_primary_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.routing.primary.push(recipient.into());
        self
    }

    /// Extended recipients receive only the routing's extended kinds
    pub fn with_extended_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.routing.extended.push(recipient.into());
        self
    }

    pub fn with_filter_rule(mut self, rule: FilterReminderRule) -> Self {
        self.filters.push(rule);
        self
    }

    pub fn with_run_budget_secs(mut self, secs: u64) -> Self {
        self.run_budget_secs = secs;
        self
    }

    pub fn with_pressure_enabled(mut self, enabled: bool) -> Self {
        self.pressure.enabled = enabled;
        self
    }

    /// Reject values no run could use
    pub fn validate(&self) -> EngineResult<()> {
        if self.routing.primary.is_empty() {
            return Err(EngineError::Config("at least one primary recipient is required".into()));
        }
        if self.routing.primary.iter().chain(&self.routing.extended).any(|r| r.trim().is_empty()) {
            return Err(EngineError::Config("recipient addresses must not be blank".into()));
        }

        let windows = [
            ("efficiency.window_hours", self.efficiency.window_hours),
            ("efficiency.alert_cooldown_hours", self.efficiency.alert_cooldown_hours),
            ("liveness.gap_hours", self.liveness.gap_hours),
            ("liveness.window_hours", self.liveness.window_hours),
            ("pressure.window_hours", self.pressure.window_hours),
            ("pressure.forecast_hours", self.pressure.forecast_hours),
            ("report.days", self.report.days),
            ("spike.cooldown_minutes", self.spike.cooldown_minutes),
        ];
        for (name, value) in windows {
            if value <= 0 {
                return Err(EngineError::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if self.liveness.window_hours <= self.liveness.gap_hours {
            return Err(EngineError::Config(format!(
                "liveness window ({} h) must exceed the gap ({} h)",
                self.liveness.window_hours, self.liveness.gap_hours
            )));
        }
        if self.efficiency.min_readings == 0 || self.calibration.min_samples == 0 {
            return Err(EngineError::Config("sample floors must be positive".into()));
        }

        let c = &self.calibration;
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(c.warn_percentile) || !in_range(c.critical_percentile) {
            return Err(EngineError::Config("calibration percentiles must be within 0..=100".into()));
        }
        if c.critical_percentile > c.warn_percentile {
            return Err(EngineError::Config(format!(
                "critical percentile {} exceeds warning percentile {}",
                c.critical_percentile, c.warn_percentile
            )));
        }

        for season in crate::season::Season::ALL {
            self.efficiency.defaults.get(season).validate()?;
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.spike.delta_ugm3) || !positive(self.pressure.drop_hpa) {
            return Err(EngineError::Config("spike delta and pressure drop must be positive".into()));
        }
        for rule in &self.filters {
            if rule.interval_days <= 0 || rule.lead_days < 0 {
                return Err(EngineError::Config(format!(
                    "filter rule '{}' needs a positive interval and non-negative lead",
                    rule.filter_type
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::season::Season;

    #[test]
    fn defaults_carry_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.efficiency.min_readings, 5);
        assert_eq!(config.calibration.min_samples, 500);
        assert_eq!(config.spike.cooldown(), Duration::minutes(60));
        assert_eq!(config.liveness.gap(), Duration::hours(2));
        assert_eq!(config.liveness.outdoor_sensor_key.as_deref(), Some("airgradient_outdoor"));
        assert_eq!(config.pressure.drop_hpa, 6.0);
        assert_eq!(config.run_budget_secs, 300);
    }

    #[test]
    fn default_without_recipients_is_invalid() {
        assert!(matches!(EngineConfig::default().validate(), Err(EngineError::Config(_))));
        assert!(EngineConfig::default()
            .with_primary_recipient("alex@example.com")
            .validate()
            .is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{
                "routing": { "primary": ["alex@example.com"] },
                "liveness": { "gap_hours": 3 },
                "efficiency": { "defaults": { "winter": { "warn_pct": 80, "critical_pct": 70, "min_outdoor_pm25": 12 } } },
                "filters": [{ "filter_type": "Fridge water", "interval_days": 180 }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.liveness.gap_hours, 3);
        assert_eq!(config.liveness.window_hours, 4);
        assert_eq!(config.efficiency.defaults.get(Season::Winter).warn_pct, 80.0);
        assert_eq!(config.efficiency.defaults.get(Season::Summer).warn_pct, 75.0);
        assert_eq!(config.filters[0].lead_days, 14);
        assert_eq!(config.routing.extended_kinds.len(), 2);
    }

    #[test]
    fn nonsense_rejected() {
        let base = EngineConfig::default().with_primary_recipient("alex@example.com");

        let mut zero_window = base.clone();
        zero_window.efficiency.window_hours = 0;
        assert!(zero_window.validate().is_err());

        let mut short_liveness = base.clone();
        short_liveness.liveness.window_hours = 2;
        assert!(short_liveness.validate().is_err());

        let mut inverted = base.clone();
        inverted.calibration.critical_percentile = 20.0;
        assert!(inverted.validate().is_err());

        let bad_rule = base.with_filter_rule(FilterReminderRule::new("UV bulb", 0));
        assert!(bad_rule.validate().is_err());
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(EngineError::Serialization(_))
        ));
    }
}
