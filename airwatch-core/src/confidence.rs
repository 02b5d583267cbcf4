//! Confidence Filter for the Efficiency Formula
//!
//! ## Why a Confidence Filter?
//!
//! Filter efficiency is estimated as
//!
//! ```text
//! efficiency = (outdoor − indoor) / outdoor × 100
//! ```
//!
//! The formula divides by outdoor PM2.5. Consumer particle sensors carry
//! roughly ±1 μg/m³ of noise, so the error in efficiency is about
//! `100 / outdoor` percentage points per unit of sensor error:
//!
//! ```text
//! outdoor   error from ±1 μg/m³
//! -------   -------------------
//!   2           ±50 points
//!   5           ±20 points
//!  10           ±10 points
//!  20            ±5 points
//! ```
//!
//! On a clean-air day the computed efficiency is mostly noise. Down-weighting
//! such readings still lets them dominate when they are the majority, so they
//! are excluded outright: only readings at or above the season's cutoff count.
//!
//! ## Levels
//!
//! - **High**: outdoor ≥ 2 × cutoff, error at most half of the cutoff case
//! - **Medium**: outdoor ≥ cutoff
//! - **Low**: below cutoff, or outdoor missing
//!
//! ## Contamination Exclusion
//!
//! A reading where indoor exceeds outdoor has an indoor source (cooking,
//! candles, cleaning). It says nothing about the filter and would drag the
//! efficiency estimate down, so [`qualifies`] rejects it as well. The same
//! predicate feeds both the evaluator and the calibrator.

use serde::{Deserialize, Serialize};

use crate::constants::air::HIGH_CONFIDENCE_FACTOR;
use crate::reading::Reading;
use crate::thresholds::EfficiencyThresholds;

/// Reliability of a reading for the efficiency formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

/// Classify outdoor PM2.5 against a confidence cutoff
pub fn classify(outdoor_pm25: Option<f64>, thresholds: &EfficiencyThresholds) -> ConfidenceLevel {
    let Some(outdoor) = outdoor_pm25.filter(|v| v.is_finite()) else {
        return ConfidenceLevel::Low;
    };
    let cutoff = thresholds.min_outdoor_pm25;
    if outdoor >= cutoff * HIGH_CONFIDENCE_FACTOR {
        ConfidenceLevel::High
    } else if outdoor >= cutoff {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Efficiency of a reading that can be trusted for filter decisions
///
/// `Some` only when outdoor meets the cutoff, indoor does not exceed outdoor,
/// and an efficiency value exists (collected or derived).
pub fn qualifies(reading: &Reading, thresholds: &EfficiencyThresholds) -> Option<f64> {
    if classify(reading.outdoor_pm25, thresholds) == ConfidenceLevel::Low {
        return None;
    }
    match reading.pm25_delta() {
        Some(delta) if delta <= 0.0 => reading.efficiency(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(indoor: f64, outdoor: f64, efficiency: f64) -> Reading {
        Reading::new(
            Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap(),
            "airthings_1",
            "master_bedroom",
            "airthings",
        )
        .with_pm25(indoor, outdoor)
        .with_efficiency(efficiency)
    }

    #[test]
    fn levels_follow_cutoff() {
        let t = EfficiencyThresholds::default();
        assert_eq!(classify(Some(25.0), &t), ConfidenceLevel::High);
        assert_eq!(classify(Some(20.0), &t), ConfidenceLevel::High);
        assert_eq!(classify(Some(19.9), &t), ConfidenceLevel::Medium);
        assert_eq!(classify(Some(10.0), &t), ConfidenceLevel::Medium);
        assert_eq!(classify(Some(9.9), &t), ConfidenceLevel::Low);
        assert_eq!(classify(None, &t), ConfidenceLevel::Low);
        assert_eq!(classify(Some(f64::NAN), &t), ConfidenceLevel::Low);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(ConfidenceLevel::High > ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Medium > ConfidenceLevel::Low);
    }

    #[test]
    fn contamination_excluded() {
        let t = EfficiencyThresholds::default();
        assert_eq!(qualifies(&reading(2.0, 12.0, 83.0), &t), Some(83.0));
        assert_eq!(qualifies(&reading(12.0, 12.0, 0.0), &t), Some(0.0));
        assert_eq!(qualifies(&reading(15.0, 12.0, 0.0), &t), None);
    }

    #[test]
    fn low_outdoor_excluded() {
        let t = EfficiencyThresholds::default();
        assert_eq!(qualifies(&reading(1.0, 3.0, 66.0), &t), None);
    }
}
