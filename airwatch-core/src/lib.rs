//! Alert-decision engine for AirWatch
//!
//! Turns noisy home air-quality readings into a small number of useful alerts:
//! a worn HVAC filter, an indoor pollution source, a sensor that went quiet,
//! a sharp barometric drop.
//!
//! Key properties:
//! - Efficiency is estimated only from readings where the formula is
//!   numerically meaningful (outdoor PM2.5 above a seasonal cutoff)
//! - Thresholds recalibrate monthly per season from the household's own history
//! - Stateful checks alert once per transition or episode, never per run
//! - All I/O goes through traits; see `airwatch-connectors` for implementations
//!
//! ```no_run
//! use airwatch_core::{Engine, EngineConfig, MemoryReadings, RecordingTransport};
//!
//! let config = EngineConfig::default().with_primary_recipient("alex@example.com");
//! let mut engine = Engine::builder(config)
//!     .readings(MemoryReadings::default())
//!     .transport(RecordingTransport::new())
//!     .build()?;
//!
//! let summary = engine.run_evaluation()?;
//! println!("{} alerts", summary.alerts.len());
//! # Ok::<(), airwatch_core::EngineError>(())
//! ```

#![deny(unsafe_code)]

pub mod alerts;
pub mod calibration;
pub mod confidence;
pub mod config;
pub mod constants;
pub mod efficiency;
pub mod engine;
pub mod errors;
pub mod filters;
pub mod liveness;
pub mod memory;
pub mod pressure;
pub mod reading;
pub mod report;
pub mod season;
pub mod spike;
pub mod stats;
pub mod store;
pub mod thresholds;
pub mod time;
pub mod traits;

// Public API
pub use alerts::{Alert, AlertDispatcher, AlertKind, AlertLevel, Digest, DispatchReport, Routing};
pub use calibration::{CalibrationReport, SeasonOutcome, SeasonalCalibrator};
pub use confidence::{classify, qualifies, ConfidenceLevel};
pub use config::{EngineConfig, FilterReminderRule};
pub use efficiency::{EfficiencyEvaluator, EfficiencyScore, EfficiencyStatus, Evaluation};
pub use engine::{Engine, EngineBuilder, RunKind, RunSummary, Stage};
pub use errors::{EngineError, EngineResult};
pub use liveness::{LivenessMonitor, LivenessReport, LivenessState};
pub use memory::{MemoryFilterLog, MemoryReadings, RecordingTransport, StaticPressure};
pub use pressure::{PressureSample, PressureTrendMonitor};
pub use reading::{FilterAction, FilterChangeRecord, Reading};
pub use season::{CalendarSeasons, Season, SeasonRule};
pub use spike::IndoorSpikeDetector;
pub use store::{MemoryStore, StateStore};
pub use thresholds::{EfficiencyThresholds, SeasonalThresholds, StoredThresholds};
pub use time::{FixedClock, SystemClock, TimeSource, Timestamp};
pub use traits::{AlertTransport, FilterLog, PressureSource, ReadingSource};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_exists() {
        assert!(!VERSION.is_empty());
    }
}
