//! Indoor-spike detector
//!
//! Flags an indoor particulate source (cooking, candles, a vacuum with a
//! leaky bag) from the latest reading: indoor PM2.5 above outdoor by at least
//! the spike delta.
//!
//! ## Debounce
//!
//! One alert per episode, not per reading:
//!
//! ```text
//! delta ≥ 5 ──► cooldown active? ──yes──► suppress
//!                     │ no
//!                     ▼
//!                  alert, last_alerted_at = now
//! delta < 5 ──► clear last_alerted_at
//! ```
//!
//! Clearing on the first quiet reading means a second episode right after the
//! first one ends alerts again immediately.
//!
//! The cooldown is household-wide: the input is the newest complete reading
//! from any room, so a quiet room reporting last clears it for every room.

use chrono::Duration;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::alerts::{Alert, AlertKind, AlertLevel};
use crate::config::SpikeConfig;
use crate::errors::EngineResult;
use crate::reading::Reading;
use crate::store::{keys, load_state, save_state, StateStore};
use crate::time::{elapsed_since, Timestamp};

/// Persisted spike cooldown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndoorSpikeState {
    pub last_alerted_at: Timestamp,
}

/// Debounced indoor-source detector
#[derive(Debug, Clone)]
pub struct IndoorSpikeDetector {
    delta_ugm3: f64,
    cooldown: Duration,
    max_outdoor_for_help: f64,
}

impl Default for IndoorSpikeDetector {
    fn default() -> Self {
        Self::new(&SpikeConfig::default())
    }
}

impl IndoorSpikeDetector {
    pub fn new(config: &SpikeConfig) -> Self {
        Self {
            delta_ugm3: config.delta_ugm3,
            cooldown: config.cooldown(),
            max_outdoor_for_help: config.max_outdoor_for_help,
        }
    }

    /// Most recent reading carrying both PM2.5 values
    pub fn latest<'a>(readings: &'a [Reading]) -> Option<&'a Reading> {
        readings
            .iter()
            .filter(|r| r.pm25_delta().is_some())
            .max_by_key(|r| r.timestamp)
    }

    pub fn check(
        &self,
        latest: &Reading,
        store: &mut dyn StateStore,
        now: Timestamp,
    ) -> EngineResult<Option<Alert>> {
        let (Some(delta), Some(indoor), Some(outdoor)) =
            (latest.pm25_delta(), latest.indoor_pm25, latest.outdoor_pm25)
        else {
            return Ok(None);
        };

        if delta < self.delta_ugm3 {
            store.remove(keys::SPIKE_COOLDOWN)?;
            return Ok(None);
        }

        if let Some(state) = load_state::<IndoorSpikeState>(store, keys::SPIKE_COOLDOWN)? {
            if elapsed_since(state.last_alerted_at, now) < self.cooldown {
                debug!("Indoor spike (+{:.1}) suppressed, cooldown active", delta);
                return Ok(None);
            }
        }

        save_state(store, keys::SPIKE_COOLDOWN, &IndoorSpikeState { last_alerted_at: now })?;

        let alert = if outdoor <= self.max_outdoor_for_help {
            Alert::new(
                AlertLevel::Warning,
                AlertKind::IndoorSpike,
                format!(
                    "Indoor PM2.5 in the {} is {:.1} μg/m³, {:.1} above outdoor ({:.1}). \
                     Outdoor air is clean: open windows or raise ventilation.",
                    latest.room, indoor, delta, outdoor
                ),
                now,
            )
        } else {
            Alert::new(
                AlertLevel::Critical,
                AlertKind::IndoorSpike,
                format!(
                    "Indoor PM2.5 in the {} is {:.1} μg/m³, {:.1} above outdoor ({:.1}). \
                     Outdoor air is polluted too: keep windows closed and run purifiers.",
                    latest.room, indoor, delta, outdoor
                ),
                now,
            )
        };
        Ok(Some(alert))
    }
}
