//! Alerting Constants
//!
//! Thresholds and sample-size floors for every evaluator.

// ===== EFFICIENCY =====

/// Minimum qualifying readings before an efficiency score is produced.
pub const MIN_QUALIFYING_READINGS: usize = 5;

/// Default warning threshold for median filter efficiency (%).
pub const DEFAULT_WARN_PCT: f64 = 75.0;

/// Default critical threshold for median filter efficiency (%).
pub const DEFAULT_CRITICAL_PCT: f64 = 65.0;

/// Default confidence cutoff on outdoor PM2.5 (μg/m³).
///
/// Below ~10 μg/m³ a one-unit sensor error swings efficiency by 10+ points.
pub const DEFAULT_MIN_OUTDOOR_PM25: f64 = 10.0;

// ===== CALIBRATION =====

/// Qualifying readings a season needs before its thresholds are recalibrated.
pub const MIN_CALIBRATION_SAMPLES: usize = 500;

/// Percentile of qualifying efficiency used as the warning threshold.
pub const WARN_PERCENTILE: f64 = 10.0;

/// Percentile of qualifying efficiency used as the critical threshold.
pub const CRITICAL_PERCENTILE: f64 = 5.0;

// ===== INDOOR SPIKE =====

/// Indoor-minus-outdoor PM2.5 delta that counts as an indoor source (μg/m³).
pub const SPIKE_DELTA_UGM3: f64 = 5.0;

/// Outdoor PM2.5 at or below which ventilating is expected to help (μg/m³).
pub const MAX_OUTDOOR_FOR_HELP_UGM3: f64 = 25.0;

// ===== PRESSURE =====

/// Barometric drop that triggers a health alert (hPa).
pub const PRESSURE_DROP_HPA: f64 = 6.0;

// ===== LIVENESS =====

/// Liveness key of the outdoor sensor whose values arrive as columns of indoor rows.
pub const DEFAULT_OUTDOOR_SENSOR_KEY: &str = "airgradient_outdoor";

/// Liveness key tracking Reading Store availability.
pub const READING_STORE_KEY: &str = "reading_store";
