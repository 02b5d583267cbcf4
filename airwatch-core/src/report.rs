//! Weekly air-quality report
//!
//! A once-a-week summary per room, sent as a single INFO alert. Every figure
//! comes from [`crate::stats`]; absent cells are skipped, so a room without a
//! CO2 sensor shows "n/a" rather than 0 ppm.

use chrono::Duration;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::alerts::{Alert, AlertKind};
use crate::config::ReportConfig;
use crate::efficiency::Evaluation;
use crate::reading::Reading;
use crate::stats;
use crate::time::Timestamp;

/// Figures for one room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummary {
    pub room: String,
    pub readings: usize,
    pub pm25_median: Option<f64>,
    pub pm25_trimmed_mean: Option<f64>,
    /// Share of readings above the PM2.5 guideline, 0..=1
    pub pm25_over_guideline: Option<f64>,
    pub co2_trimmed_mean: Option<f64>,
    pub co2_over_limit: Option<f64>,
    pub temp_trimmed_mean: Option<f64>,
    pub humidity_trimmed_mean: Option<f64>,
}

impl RoomSummary {
    fn from_readings(room: &str, readings: &[&Reading], config: &ReportConfig) -> Self {
        let pm25 = stats::present(readings.iter().map(|r| r.indoor_pm25));
        let co2 = stats::present(readings.iter().map(|r| r.indoor_co2));
        let temp = stats::present(readings.iter().map(|r| r.indoor_temp));
        let humidity = stats::present(readings.iter().map(|r| r.indoor_humidity));

        Self {
            room: room.to_string(),
            readings: readings.len(),
            pm25_median: stats::median(&pm25),
            pm25_trimmed_mean: stats::trimmed_mean(&pm25),
            pm25_over_guideline: stats::fraction_above(&pm25, config.pm25_guideline),
            co2_trimmed_mean: stats::trimmed_mean(&co2),
            co2_over_limit: stats::fraction_above(&co2, config.co2_limit),
            temp_trimmed_mean: stats::trimmed_mean(&temp),
            humidity_trimmed_mean: stats::trimmed_mean(&humidity),
        }
    }
}

/// Summary of one reporting period
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub rooms: Vec<RoomSummary>,
    pub efficiency: Evaluation,
    pm25_guideline: f64,
    co2_limit: f64,
}

fn fmt_value(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "n/a".to_string(),
    }
}

fn fmt_share(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.0}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

impl WeeklyReport {
    /// Summarise readings within `days` before `now`, one entry per room
    pub fn build(readings: &[Reading], efficiency: Evaluation, config: &ReportConfig, now: Timestamp) -> Self {
        let period_start = now - Duration::days(config.days);
        let mut by_room: BTreeMap<&str, Vec<&Reading>> = BTreeMap::new();
        for reading in readings
            .iter()
            .filter(|r| r.timestamp >= period_start && r.timestamp <= now)
        {
            by_room.entry(reading.room.as_str()).or_default().push(reading);
        }

        Self {
            period_start,
            period_end: now,
            rooms: by_room
                .into_iter()
                .map(|(room, readings)| RoomSummary::from_readings(room, &readings, config))
                .collect(),
            efficiency,
            pm25_guideline: config.pm25_guideline,
            co2_limit: config.co2_limit,
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!(
            "Weekly air quality report, {} to {}\n",
            self.period_start.format("%Y-%m-%d"),
            self.period_end.format("%Y-%m-%d")
        );

        match &self.efficiency {
            Evaluation::Scored(score) => {
                let _ = writeln!(
                    out,
                    "Filter efficiency: {:.1}% ({:?}, {} qualifying readings)",
                    score.median_efficiency, score.status, score.sample_count
                );
            }
            Evaluation::InsufficientData { available, required } => {
                let _ = writeln!(
                    out,
                    "Filter efficiency: not enough polluted-air readings ({} of {} needed)",
                    available, required
                );
            }
        }

        if self.rooms.is_empty() {
            out.push_str("No readings this period.\n");
        }
        for room in &self.rooms {
            let _ = write!(
                out,
                "\n{} ({} readings)\n  PM2.5 median {}, mean {}, above {:.0} μg/m³ {}\n  CO2 mean {}, above {:.0} ppm {}\n  Temperature {}, humidity {}\n",
                room.room,
                room.readings,
                fmt_value(room.pm25_median, " μg/m³"),
                fmt_value(room.pm25_trimmed_mean, " μg/m³"),
                self.pm25_guideline,
                fmt_share(room.pm25_over_guideline),
                fmt_value(room.co2_trimmed_mean, " ppm"),
                self.co2_limit,
                fmt_share(room.co2_over_limit),
                fmt_value(room.temp_trimmed_mean, " °C"),
                fmt_value(room.humidity_trimmed_mean, "%"),
            );
        }
        out
    }

    pub fn to_alert(&self) -> Alert {
        Alert::info(AlertKind::WeeklyReport, self.render(), self.period_end)
    }
}
