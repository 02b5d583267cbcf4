//! Data-Liveness Monitor
//!
//! ## Overview
//!
//! One edge-triggered state machine per sensor key:
//!
//! ```text
//!            gap > threshold
//!    UP ─────────────────────► DOWN     emits one "stopped" alert
//!     ▲                          │
//!     └──────────────────────────┘
//!            gap ≤ threshold            emits one "resumed" alert
//! ```
//!
//! Repeated checks in the same state emit nothing, so an outage lasting a
//! week produces two alerts, not 168.
//!
//! ## Keys
//!
//! - `<sensor_kind>_<room>` for every pair seen in the trailing window
//! - the outdoor key (`airgradient_outdoor` by default), seen by any row
//!   carrying an outdoor PM2.5 value
//! - `reading_store`, driven by the success or failure of the snapshot read
//!
//! A sensor absent from the whole trailing window is not evaluated: with a
//! short lookback "never existed" and "long dead" look the same.

use chrono::Duration;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::alerts::{Alert, AlertKind};
use crate::config::LivenessConfig;
use crate::constants::alerting::READING_STORE_KEY;
use crate::errors::{EngineError, EngineResult};
use crate::reading::Reading;
use crate::store::{keys, load_state, save_state, StateStore};
use crate::time::{elapsed_since, Timestamp};

/// Persisted liveness flag for one key
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LivenessState {
    /// Latest reading seen at the last transition
    pub last_seen_at: Option<Timestamp>,
    pub is_down: bool,
}

/// Transitions found by one check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LivenessReport {
    pub stopped: Vec<String>,
    pub resumed: Vec<String>,
    pub alerts: Vec<Alert>,
    /// Keys whose state could not be loaded or saved this run
    pub failed: Vec<String>,
}

impl LivenessReport {
    pub fn is_quiet(&self) -> bool {
        self.stopped.is_empty() && self.resumed.is_empty()
    }
}

/// Edge-triggered per-sensor liveness tracking
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    gap: Duration,
    outdoor_key: Option<String>,
}

impl Default for LivenessMonitor {
    fn default() -> Self {
        Self::new(&LivenessConfig::default())
    }
}

impl LivenessMonitor {
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            gap: config.gap(),
            outdoor_key: config.outdoor_sensor_key.as_ref().map(|k| k.to_lowercase()),
        }
    }

    /// Latest timestamp per sensor key in the window
    pub fn last_seen(&self, rows: &[Reading]) -> BTreeMap<String, Timestamp> {
        let mut seen: BTreeMap<String, Timestamp> = BTreeMap::new();
        let mut mark = |key: String, at: Timestamp| {
            let entry = seen.entry(key).or_insert(at);
            if at > *entry {
                *entry = at;
            }
        };
        for row in rows {
            mark(row.sensor_key(), row.timestamp);
            if let Some(outdoor_key) = &self.outdoor_key {
                if row.outdoor_pm25.is_some() {
                    mark(outdoor_key.clone(), row.timestamp);
                }
            }
        }
        seen
    }

    /// Compare each key's latest reading with its stored flag
    ///
    /// A key whose flag cannot be read or written is logged and left for the
    /// next run; transitions already recorded keep their alerts.
    pub fn check(&self, rows: &[Reading], store: &mut dyn StateStore, now: Timestamp) -> LivenessReport {
        let mut report = LivenessReport::default();

        for (key, last) in self.last_seen(rows) {
            let state_key = keys::liveness(&key);
            let state: LivenessState = match load_state(store, &state_key) {
                Ok(state) => state.unwrap_or_default(),
                Err(err) => {
                    warn!("Liveness state for {} unreadable: {}", key, err);
                    report.failed.push(key);
                    continue;
                }
            };
            let gap = elapsed_since(last, now);

            let (is_down, alert) = if gap > self.gap && !state.is_down {
                let alert = Alert::warning(
                    AlertKind::SensorLiveness,
                    format!(
                        "Sensor {} has not reported for {:.1} hours (last reading {}).",
                        key,
                        gap.num_minutes() as f64 / 60.0,
                        last.format("%Y-%m-%d %H:%M UTC")
                    ),
                    now,
                );
                (true, alert)
            } else if gap <= self.gap && state.is_down {
                let alert = Alert::info(
                    AlertKind::SensorLiveness,
                    format!("Sensor {} is reporting again (latest reading {}).", key, last.format("%Y-%m-%d %H:%M UTC")),
                    now,
                );
                (false, alert)
            } else {
                continue;
            };

            let next = LivenessState { last_seen_at: Some(last), is_down };
            if let Err(err) = save_state(store, &state_key, &next) {
                warn!("Liveness transition for {} not recorded: {}", key, err);
                report.failed.push(key);
                continue;
            }
            report.alerts.push(alert);
            if is_down {
                warn!("Sensor {} stopped reporting ({} min)", key, gap.num_minutes());
                report.stopped.push(key);
            } else {
                info!("Sensor {} resumed reporting", key);
                report.resumed.push(key);
            }
        }
        report
    }

    /// Record a failed Reading Store read, alerting on the first failure only
    pub fn record_store_failure(
        &self,
        error: &EngineError,
        store: &mut dyn StateStore,
        now: Timestamp,
    ) -> EngineResult<Option<Alert>> {
        let state_key = keys::liveness(READING_STORE_KEY);
        let state: LivenessState = load_state(store, &state_key)?.unwrap_or_default();
        if state.is_down {
            return Ok(None);
        }
        save_state(store, &state_key, &LivenessState { last_seen_at: state.last_seen_at, is_down: true })?;
        Ok(Some(Alert::critical(
            AlertKind::ReadingStore,
            format!("Reading Store could not be read; evaluations are paused: {}", error),
            now,
        )))
    }

    /// Record a successful Reading Store read, alerting on recovery only
    pub fn record_store_success(
        &self,
        store: &mut dyn StateStore,
        now: Timestamp,
    ) -> EngineResult<Option<Alert>> {
        let state_key = keys::liveness(READING_STORE_KEY);
        let state: Option<LivenessState> = load_state(store, &state_key)?;
        match state {
            Some(state) if state.is_down => {
                save_state(store, &state_key, &LivenessState { last_seen_at: Some(now), is_down: false })?;
                Ok(Some(Alert::info(
                    AlertKind::ReadingStore,
                    "Reading Store is readable again; evaluations resumed.",
                    now,
                )))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertLevel;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use chrono::Utc;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2025, 10, 20, 12, 0, 0).unwrap()
    }

    fn row(minutes_ago: i64, kind: &str, room: &str) -> Reading {
        Reading::new(t0() - Duration::minutes(minutes_ago), "id", room, kind)
    }

    #[test]
    fn keys_include_outdoor_sensor() {
        let mut with_outdoor = row(30, "AirThings", "Master_Bedroom");
        with_outdoor.outdoor_pm25 = Some(8.0);
        let seen = LivenessMonitor::default().last_seen(&[with_outdoor, row(10, "airthings", "master_bedroom")]);

        assert_eq!(seen.len(), 2);
        assert_eq!(seen["airthings_master_bedroom"], t0() - Duration::minutes(10));
        assert_eq!(seen["airgradient_outdoor"], t0() - Duration::minutes(30));
    }

    #[test]
    fn stop_then_resume_one_alert_each() {
        let monitor = LivenessMonitor::default();
        let mut store = MemoryStore::new();
        let stale = vec![row(150, "airthings", "office")];

        let first = monitor.check(&stale, &mut store, t0());
        assert_eq!(first.stopped, vec!["airthings_office".to_string()]);
        assert_eq!(first.alerts.len(), 1);

        for m in 1..5 {
            let again = monitor.check(&stale, &mut store, t0() + Duration::minutes(10 * m));
            assert!(again.is_quiet());
        }

        let fresh = vec![row(150, "airthings", "office"), row(0, "airthings", "office")];
        let resumed = monitor.check(&fresh, &mut store, t0());
        assert_eq!(resumed.resumed, vec!["airthings_office".to_string()]);
        assert_eq!(resumed.alerts[0].level, AlertLevel::Info);
    }

    #[test]
    fn gap_equal_to_threshold_is_alive() {
        let mut store = MemoryStore::new();
        let report = LivenessMonitor::default()
            .check(&[row(120, "airthings", "office")], &mut store, t0());
        assert!(report.is_quiet());
    }

    #[test]
    fn store_failure_is_edge_triggered() {
        let monitor = LivenessMonitor::default();
        let mut store = MemoryStore::new();
        let error = EngineError::Source("sheet unavailable".into());

        assert!(monitor.record_store_success(&mut store, t0()).unwrap().is_none());

        let first = monitor.record_store_failure(&error, &mut store, t0()).unwrap().unwrap();
        assert_eq!(first.level, AlertLevel::Critical);
        assert_eq!(first.kind, AlertKind::ReadingStore);
        assert!(monitor.record_store_failure(&error, &mut store, t0()).unwrap().is_none());

        let back = monitor.record_store_success(&mut store, t0()).unwrap().unwrap();
        assert_eq!(back.level, AlertLevel::Info);
        assert!(monitor.record_store_success(&mut store, t0()).unwrap().is_none());
    }

    /// Store that rejects writes after the first `allowed`
    struct FailingStore {
        inner: MemoryStore,
        allowed: usize,
    }

    impl StateStore for FailingStore {
        fn get(&self, key: &str) -> EngineResult<Option<serde_json::Value>> {
            self.inner.get(key)
        }

        fn put(&mut self, key: &str, value: serde_json::Value) -> EngineResult<()> {
            if self.allowed == 0 {
                return Err(EngineError::Store("disk full".into()));
            }
            self.allowed -= 1;
            self.inner.put(key, value)
        }

        fn remove(&mut self, key: &str) -> EngineResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_write_keeps_earlier_transitions() {
        let monitor = LivenessMonitor::default();
        let stale = vec![row(150, "airthings", "bedroom"), row(150, "airthings", "kitchen")];
        let mut store = FailingStore {
            inner: MemoryStore::new(),
            allowed: 1,
        };

        let first = monitor.check(&stale, &mut store, t0());
        assert_eq!(first.stopped, vec!["airthings_bedroom".to_string()]);
        assert_eq!(first.alerts.len(), 1);
        assert_eq!(first.failed, vec!["airthings_kitchen".to_string()]);

        // the unrecorded key transitions on the next healthy run, the other stays quiet
        store.allowed = usize::MAX;
        let second = monitor.check(&stale, &mut store, t0() + Duration::minutes(10));
        assert_eq!(second.stopped, vec!["airthings_kitchen".to_string()]);
        assert_eq!(second.alerts.len(), 1);
        assert!(second.failed.is_empty());
    }
}
