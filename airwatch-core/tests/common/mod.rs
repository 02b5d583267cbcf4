//! Common test utilities for integration tests
//!
//! This module provides:
//! - Reading generators for efficiency, liveness and spike scenarios
//! - The documented scenario windows
//! - An engine harness over in-memory collaborators

#![allow(dead_code)]

use airwatch_core::{
    Engine, EngineConfig, FixedClock, MemoryReadings, MemoryStore, PressureSample, RecordingTransport,
    Reading, StaticPressure, Timestamp,
};
use chrono::{Duration, TimeZone, Utc};

pub const PRIMARY: &str = "alex@example.com";
pub const EXTENDED: &str = "sam@example.com";

/// A shoulder-season morning, fixed so season lookups are stable
pub fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 10, 2, 12, 0, 0).unwrap()
}

/// Indoor row for the master bedroom AirThings, `minutes_ago` before [`now`]
pub fn bedroom(minutes_ago: i64) -> Reading {
    Reading::new(
        now() - Duration::minutes(minutes_ago),
        "airthings_123456",
        "master_bedroom",
        "airthings",
    )
}

/// Rows every ten minutes ending at `now`, one per (outdoor, indoor, efficiency)
pub fn window(outdoor: &[f64], indoor: &[f64], efficiency: &[f64]) -> Vec<Reading> {
    let n = outdoor.len() as i64;
    outdoor
        .iter()
        .zip(indoor)
        .zip(efficiency)
        .enumerate()
        .map(|(i, ((o, n_in), e))| {
            bedroom(10 * (n - 1 - i as i64))
                .with_pm25(*n_in, *o)
                .with_efficiency(*e)
        })
        .collect()
}

pub fn scenario_a() -> Vec<Reading> {
    window(
        &[12.0, 13.0, 11.0, 14.0, 12.0, 13.0],
        &[2.0, 2.0, 3.0, 2.0, 2.0, 3.0],
        &[83.0, 85.0, 73.0, 86.0, 83.0, 77.0],
    )
}

pub fn scenario_b() -> Vec<Reading> {
    window(
        &[12.0, 13.0, 11.0, 14.0, 12.0, 13.0],
        &[2.0, 2.0, 3.0, 2.0, 2.0, 3.0],
        &[60.0, 58.0, 55.0, 59.0, 57.0, 56.0],
    )
}

pub fn scenario_c() -> Vec<Reading> {
    window(&[3.0; 6], &[1.0; 6], &[66.0, 70.0, 90.0, 10.0, 50.0, 80.0])
}

/// Deterministic pseudo-random generator (LCG) for bulk fixtures
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

/// A year of ten-minute readings with realistic outdoor variation
pub fn history(days: i64, seed: u64) -> Vec<Reading> {
    let mut rng = Lcg::new(seed);
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    (0..days * 144)
        .map(|i| {
            let outdoor = rng.range(2.0, 35.0);
            let efficiency = rng.range(55.0, 95.0);
            let indoor = outdoor * (1.0 - efficiency / 100.0);
            Reading::new(start + Duration::minutes(10 * i), "airthings_1", "office", "airthings")
                .with_pm25(indoor, outdoor)
                .with_efficiency(efficiency)
        })
        .collect()
}

pub fn config() -> EngineConfig {
    EngineConfig::default()
        .with_primary_recipient(PRIMARY)
        .with_extended_recipient(EXTENDED)
}

/// Engine over in-memory collaborators with no pressure source
pub fn engine(readings: Vec<Reading>) -> Engine {
    engine_with(readings, config(), None)
}

pub fn engine_with(readings: Vec<Reading>, config: EngineConfig, pressure: Option<Vec<PressureSample>>) -> Engine {
    let builder = Engine::builder(config)
        .clock(FixedClock::new(now()))
        .store(MemoryStore::new())
        .readings(MemoryReadings::new(readings))
        .transport(RecordingTransport::new());
    let builder = match pressure {
        Some(samples) => builder.pressure(StaticPressure::new(samples)),
        None => builder,
    };
    builder.build().unwrap()
}
