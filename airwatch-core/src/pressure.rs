//! Barometric pressure trend monitor
//!
//! Rapid pressure drops are a migraine and joint-pain trigger, so the household
//! wants to hear about them whether or not they were mentioned an hour ago.
//! The check is level-triggered and keeps no state between runs.
//!
//! ```text
//!          past window            forecast window
//!   ├──────────────────────┤now├─────────────────────────┤
//!   past_drop     = max(past) − current
//!   forecast_drop = current − min(forecast)
//! ```
//!
//! `current` is the latest sample at or before `now`. The two checks are
//! independent and may both fire.

use chrono::Duration;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::alerts::{Alert, AlertKind};
use crate::config::PressureConfig;
use crate::time::Timestamp;

/// One pressure observation or forecast point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PressureSample {
    pub timestamp: Timestamp,
    /// Surface pressure (hPa)
    pub hpa: f64,
}

impl PressureSample {
    pub fn new(timestamp: Timestamp, hpa: f64) -> Self {
        Self { timestamp, hpa }
    }
}

/// Computed drops, `None` where a side of the series was missing
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PressureTrend {
    pub current: Option<f64>,
    pub past_drop: Option<f64>,
    pub forecast_drop: Option<f64>,
}

/// Stateless drop detector
#[derive(Debug, Clone)]
pub struct PressureTrendMonitor {
    window: Duration,
    forecast: Duration,
    drop_hpa: f64,
}

impl Default for PressureTrendMonitor {
    fn default() -> Self {
        Self::new(&PressureConfig::default())
    }
}

impl PressureTrendMonitor {
    pub fn new(config: &PressureConfig) -> Self {
        Self {
            window: config.window(),
            forecast: config.forecast(),
            drop_hpa: config.drop_hpa,
        }
    }

    pub fn trend(&self, samples: &[PressureSample], now: Timestamp) -> PressureTrend {
        let usable = samples.iter().filter(|s| s.hpa.is_finite());

        let past_start = now - self.window;
        let forecast_end = now + self.forecast;

        let mut current: Option<PressureSample> = None;
        let mut past_max: Option<f64> = None;
        let mut forecast_min: Option<f64> = None;

        for sample in usable {
            if sample.timestamp <= now {
                if current.map_or(true, |c| sample.timestamp >= c.timestamp) {
                    current = Some(*sample);
                }
                if sample.timestamp >= past_start {
                    past_max = Some(past_max.map_or(sample.hpa, |m: f64| m.max(sample.hpa)));
                }
            } else if sample.timestamp <= forecast_end {
                forecast_min = Some(forecast_min.map_or(sample.hpa, |m: f64| m.min(sample.hpa)));
            }
        }

        let Some(current) = current.map(|c| c.hpa) else {
            return PressureTrend::default();
        };
        PressureTrend {
            current: Some(current),
            past_drop: past_max.map(|max| max - current),
            forecast_drop: forecast_min.map(|min| current - min),
        }
    }

    pub fn check(&self, samples: &[PressureSample], now: Timestamp) -> Vec<Alert> {
        let trend = self.trend(samples, now);
        debug!(
            "Pressure: current {:?}, past drop {:?}, forecast drop {:?}",
            trend.current, trend.past_drop, trend.forecast_drop
        );

        let mut alerts = Vec::new();
        if let (Some(current), Some(drop)) = (trend.current, trend.past_drop) {
            if drop >= self.drop_hpa {
                alerts.push(Alert::warning(
                    AlertKind::Pressure,
                    format!(
                        "Barometric pressure fell {:.1} hPa over the last {} hours (now {:.1} hPa).",
                        drop,
                        self.window.num_hours(),
                        current
                    ),
                    now,
                ));
            }
        }
        if let (Some(current), Some(drop)) = (trend.current, trend.forecast_drop) {
            if drop >= self.drop_hpa {
                alerts.push(Alert::warning(
                    AlertKind::Pressure,
                    format!(
                        "Barometric pressure is forecast to fall {:.1} hPa within {} hours (now {:.1} hPa).",
                        drop,
                        self.forecast.num_hours(),
                        current
                    ),
                    now,
                ));
            }
        }
        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 11, 4, 12, 0, 0).unwrap()
    }

    fn series(points: &[(i64, f64)]) -> Vec<PressureSample> {
        points
            .iter()
            .map(|(h, hpa)| PressureSample::new(now() + Duration::hours(*h), *hpa))
            .collect()
    }

    #[test]
    fn steady_pressure_is_quiet() {
        let samples = series(&[(-6, 1013.0), (-3, 1012.5), (0, 1012.0), (6, 1011.0), (12, 1010.0)]);
        assert!(PressureTrendMonitor::default().check(&samples, now()).is_empty());
    }

    #[test]
    fn past_and_forecast_fire_independently() {
        let samples = series(&[(-6, 1015.0), (-3, 1012.0), (0, 1008.0), (6, 1004.0), (12, 1001.0)]);
        let monitor = PressureTrendMonitor::default();

        let trend = monitor.trend(&samples, now());
        assert_eq!(trend.past_drop, Some(7.0));
        assert_eq!(trend.forecast_drop, Some(7.0));
        assert_eq!(monitor.check(&samples, now()).len(), 2);
    }

    #[test]
    fn only_forecast_drop() {
        let samples = series(&[(-6, 1010.0), (0, 1010.0), (3, 1007.0), (11, 1003.5)]);
        let alerts = PressureTrendMonitor::default().check(&samples, now());
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.contains("forecast"));
    }

    #[test]
    fn samples_outside_windows_ignored() {
        let samples = series(&[(-9, 1030.0), (0, 1010.0), (13, 990.0)]);
        let trend = PressureTrendMonitor::default().trend(&samples, now());
        assert_eq!(trend.past_drop, Some(0.0));
        assert_eq!(trend.forecast_drop, None);
    }

    #[test]
    fn missing_values_and_empty_series() {
        let monitor = PressureTrendMonitor::default();
        assert!(monitor.check(&[], now()).is_empty());

        let samples = series(&[(-6, f64::NAN), (0, 1010.0), (6, f64::NAN)]);
        let trend = monitor.trend(&samples, now());
        assert_eq!(trend.current, Some(1010.0));
        assert_eq!(trend.forecast_drop, None);
    }

    #[test]
    fn only_forecast_samples_skip_everything() {
        let samples = series(&[(3, 1000.0), (6, 990.0)]);
        assert!(PressureTrendMonitor::default().check(&samples, now()).is_empty());
    }
}
