//! Typed Sensor Readings
//!
//! One [`Reading`] per (timestamp, sensor) row of the Reading Store. Every
//! numeric field is optional: a sensor without a NOx cell, a radon value the
//! collector could not read, or a cell that failed to parse are all `None`.
//! Statistics skip `None`; nothing here ever substitutes zero.
//!
//! Readings are immutable once built. The engine reads trailing windows of
//! them and never writes back.

use serde::{Deserialize, Serialize};

use crate::constants::air::{EFFICIENCY_CEILING_PCT, EFFICIENCY_FLOOR_PCT};
use crate::stats::round_to;
use crate::time::Timestamp;

/// One row of the Reading Store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: Timestamp,
    pub sensor_id: String,
    pub room: String,
    pub sensor_kind: String,

    /// Indoor PM2.5 (μg/m³)
    pub indoor_pm25: Option<f64>,
    /// Outdoor PM2.5 (μg/m³)
    pub outdoor_pm25: Option<f64>,
    /// Filter efficiency pre-computed by the collector (%)
    pub filter_efficiency: Option<f64>,

    /// Indoor CO2 (ppm)
    pub indoor_co2: Option<f64>,
    /// Indoor VOC (ppb or index, sensor dependent)
    pub indoor_voc: Option<f64>,
    /// Indoor NOx index
    pub indoor_nox: Option<f64>,
    /// Indoor temperature (°C)
    pub indoor_temp: Option<f64>,
    /// Indoor relative humidity (%)
    pub indoor_humidity: Option<f64>,
    /// Indoor radon short-term average (Bq/m³)
    pub indoor_radon: Option<f64>,

    /// Outdoor CO2 (ppm)
    pub outdoor_co2: Option<f64>,
    /// Outdoor temperature (°C)
    pub outdoor_temp: Option<f64>,
    /// Outdoor relative humidity (%)
    pub outdoor_humidity: Option<f64>,
    /// Outdoor VOC index
    pub outdoor_voc: Option<f64>,
    /// Outdoor NOx index
    pub outdoor_nox: Option<f64>,
}

impl Reading {
    /// Bare reading with every numeric field absent
    pub fn new(
        timestamp: Timestamp,
        sensor_id: impl Into<String>,
        room: impl Into<String>,
        sensor_kind: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            sensor_id: sensor_id.into(),
            room: room.into(),
            sensor_kind: sensor_kind.into(),
            indoor_pm25: None,
            outdoor_pm25: None,
            filter_efficiency: None,
            indoor_co2: None,
            indoor_voc: None,
            indoor_nox: None,
            indoor_temp: None,
            indoor_humidity: None,
            indoor_radon: None,
            outdoor_co2: None,
            outdoor_temp: None,
            outdoor_humidity: None,
            outdoor_voc: None,
            outdoor_nox: None,
        }
    }

    pub fn with_pm25(mut self, indoor: f64, outdoor: f64) -> Self {
        self.indoor_pm25 = Some(indoor);
        self.outdoor_pm25 = Some(outdoor);
        self
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.filter_efficiency = Some(efficiency);
        self
    }

    /// Efficiency from the collector, or derived from the PM2.5 pair
    pub fn efficiency(&self) -> Option<f64> {
        match self.filter_efficiency {
            Some(value) if value.is_finite() => Some(value),
            _ => match (self.indoor_pm25, self.outdoor_pm25) {
                (Some(indoor), Some(outdoor)) => compute_efficiency(indoor, outdoor),
                _ => None,
            },
        }
    }

    /// Indoor minus outdoor PM2.5 when both are present
    pub fn pm25_delta(&self) -> Option<f64> {
        match (self.indoor_pm25, self.outdoor_pm25) {
            (Some(indoor), Some(outdoor)) if indoor.is_finite() && outdoor.is_finite() => {
                Some(indoor - outdoor)
            }
            _ => None,
        }
    }

    /// Liveness key of the sensor that produced this row
    pub fn sensor_key(&self) -> String {
        sensor_key(&self.sensor_kind, &self.room)
    }
}

/// Lower-case `<kind>_<room>` liveness key
pub fn sensor_key(kind: &str, room: &str) -> String {
    format!("{}_{}", kind.trim(), room.trim()).to_lowercase()
}

/// Filter efficiency `(outdoor − indoor) / outdoor × 100`, clamped to [0, 100]
///
/// Returns `None` when outdoor is not positive; the ratio has no meaning there.
pub fn compute_efficiency(indoor: f64, outdoor: f64) -> Option<f64> {
    if !indoor.is_finite() || !outdoor.is_finite() || outdoor <= 0.0 {
        return None;
    }
    let efficiency = (outdoor - indoor) / outdoor * 100.0;
    Some(round_to(
        efficiency.clamp(EFFICIENCY_FLOOR_PCT, EFFICIENCY_CEILING_PCT),
        2,
    ))
}

/// Action recorded in the filter log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    /// Filter swapped for a new one; resets days in service
    Replaced,
    /// Filter inspected or cleaned; does not reset days in service
    Inspected,
    Other(String),
}

impl FilterAction {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "replaced" | "replace" | "installed" | "install" | "changed" | "change" | "new" => {
                FilterAction::Replaced
            }
            "inspected" | "inspect" | "checked" | "cleaned" => FilterAction::Inspected,
            other => FilterAction::Other(other.to_string()),
        }
    }

    pub fn resets_service(&self) -> bool {
        matches!(self, FilterAction::Replaced)
    }
}

/// One entry of the filter-change log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChangeRecord {
    pub date: chrono::NaiveDate,
    pub filter_type: String,
    pub location: String,
    pub action: FilterAction,
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn efficiency_formula() {
        assert_eq!(compute_efficiency(2.0, 12.0), Some(83.33));
        assert_eq!(compute_efficiency(20.0, 10.0), Some(0.0));
        assert_eq!(compute_efficiency(0.0, 10.0), Some(100.0));
        assert_eq!(compute_efficiency(1.0, 0.0), None);
    }

    #[test]
    fn efficiency_prefers_collector_value() {
        let reading = Reading::new(at(), "airthings_123456", "master_bedroom", "airthings")
            .with_pm25(2.0, 12.0)
            .with_efficiency(80.0);
        assert_eq!(reading.efficiency(), Some(80.0));
    }

    #[test]
    fn efficiency_derived_when_missing() {
        let reading = Reading::new(at(), "airthings_123456", "master_bedroom", "airthings")
            .with_pm25(3.0, 12.0);
        assert_eq!(reading.efficiency(), Some(75.0));

        let bare = Reading::new(at(), "airthings_123456", "master_bedroom", "airthings");
        assert_eq!(bare.efficiency(), None);
    }

    #[test]
    fn sensor_keys_are_normalized() {
        let reading = Reading::new(at(), "ag_1", "Outdoor", "AirGradient");
        assert_eq!(reading.sensor_key(), "airgradient_outdoor");
    }

    #[test]
    fn filter_actions() {
        assert!(FilterAction::parse("Replaced").resets_service());
        assert!(FilterAction::parse(" installed ").resets_service());
        assert!(!FilterAction::parse("inspected").resets_service());
        assert_eq!(FilterAction::parse("vacuumed"), FilterAction::Other("vacuumed".into()));
    }
}
