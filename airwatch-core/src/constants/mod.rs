//! Constants for AirWatch Core
//!
//! Centralized, documented defaults used throughout the engine. Every
//! configurable default in [`crate::config`] is backed by a constant here.
//!
//! ## Organization
//!
//! - **Air**: pollutant guidelines and the efficiency formula's operating limits
//! - **Alerting**: evaluator thresholds, sample-size floors and cooldowns
//! - **Time**: windows and durations
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Include units in names
//! 3. Reference the guideline or observation a value comes from

/// Air quality guidelines and sensor characteristics.
pub mod air;

/// Evaluator thresholds, sample-size floors and percentiles.
pub mod alerting;

/// Time windows and durations.
pub mod time;

pub use air::{CO2_COGNITIVE_LIMIT_PPM, PM25_DAILY_GUIDELINE_UGM3};
pub use alerting::{
    DEFAULT_CRITICAL_PCT, DEFAULT_MIN_OUTDOOR_PM25, DEFAULT_WARN_PCT,
    MIN_CALIBRATION_SAMPLES, MIN_QUALIFYING_READINGS,
};
