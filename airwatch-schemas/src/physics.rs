//! Plausibility limits for Reading Store columns
//!
//! A value outside its column's range is a sensor or transcription fault, not
//! a measurement. Such values are dropped to absent, never clamped.

use serde::Serialize;

use crate::columns::{Column, ColumnSet};

/// Inclusive range of physically plausible values for a column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlausibleRange {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

impl PlausibleRange {
    pub const PM25: Self = Self::new(0.0, 1000.0, "µg/m³");
    pub const CO2: Self = Self::new(250.0, 10_000.0, "ppm");
    pub const HUMIDITY: Self = Self::new(0.0, 100.0, "%");
    pub const TEMPERATURE: Self = Self::new(-60.0, 70.0, "°C");
    pub const EFFICIENCY: Self = Self::new(-100.0, 100.0, "%");
    pub const RADON: Self = Self::new(0.0, 10_000.0, "Bq/m³");
    /// AirThings reports TVOC in ppb
    pub const VOC: Self = Self::new(0.0, 60_000.0, "ppb");
    /// Sensirion NOx index
    pub const NOX: Self = Self::new(0.0, 500.0, "index");

    pub const fn new(min: f64, max: f64, unit: &'static str) -> Self {
        Self { min, max, unit }
    }

    /// Range for a numeric column, `None` for text columns
    pub fn for_column(column: Column) -> Option<Self> {
        let range = match column {
            Column::Timestamp | Column::SensorId | Column::Room | Column::SensorType => {
                return None
            }
            Column::IndoorPm25 | Column::OutdoorPm25 => Self::PM25,
            Column::FilterEfficiency => Self::EFFICIENCY,
            Column::IndoorCo2 | Column::OutdoorCo2 => Self::CO2,
            Column::IndoorVoc | Column::OutdoorVoc => Self::VOC,
            Column::IndoorNox | Column::OutdoorNox => Self::NOX,
            Column::IndoorTemp | Column::OutdoorTemp => Self::TEMPERATURE,
            Column::IndoorHumidity | Column::OutdoorHumidity => Self::HUMIDITY,
            Column::IndoorRadon => Self::RADON,
        };
        Some(range)
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// `value` if it is plausible for `column`
pub fn accept(column: Column, value: f64) -> Option<f64> {
    match PlausibleRange::for_column(column) {
        Some(range) if range.contains(value) => Some(value),
        Some(range) => {
            log::debug!(
                "{} value {} outside {}..={} {}, treated as absent",
                column.canonical(),
                value,
                range.min,
                range.max,
                range.unit
            );
            None
        }
        None => None,
    }
}
