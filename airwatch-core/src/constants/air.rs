//! Air Quality Constants
//!
//! Guideline values and the limits of the filter-efficiency formula.

// ===== GUIDELINES =====

/// PM2.5 24-hour guideline (μg/m³).
///
/// Source: WHO Global Air Quality Guidelines (2021)
pub const PM25_DAILY_GUIDELINE_UGM3: f64 = 15.0;

/// Indoor CO2 level above which cognitive performance measurably drops (ppm).
///
/// Source: ASHRAE 62.1 ventilation practice, Satish et al. (2012)
pub const CO2_COGNITIVE_LIMIT_PPM: f64 = 1000.0;

// ===== EFFICIENCY FORMULA =====

/// Lower clamp for a derived efficiency value (%).
///
/// Indoor above outdoor yields a negative ratio; the collectors clamp it.
pub const EFFICIENCY_FLOOR_PCT: f64 = 0.0;

/// Upper clamp for a derived efficiency value (%).
pub const EFFICIENCY_CEILING_PCT: f64 = 100.0;

/// Multiplier between the confidence cutoff and the HIGH-confidence level.
///
/// At twice the cutoff a 1 μg/m³ sensor error moves efficiency by at most
/// half as much as at the cutoff itself.
pub const HIGH_CONFIDENCE_FACTOR: f64 = 2.0;
