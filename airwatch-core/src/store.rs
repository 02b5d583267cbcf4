//! Persisted engine state
//!
//! The engine's only durable state is a handful of small records: calibrated
//! thresholds per season, a liveness flag per sensor, the spike cooldown and
//! the last efficiency alert. They live in a key-value [`StateStore`] that is
//! passed to each evaluator explicitly, which keeps the "one alert per
//! transition" rules testable against an in-memory store.
//!
//! Values are JSON documents so a file-backed store stays human-readable.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::EngineResult;
use crate::season::Season;

/// Key-value store for engine state
pub trait StateStore {
    /// Point read
    fn get(&self, key: &str) -> EngineResult<Option<Value>>;

    /// Point write, replacing any existing value
    fn put(&mut self, key: &str, value: Value) -> EngineResult<()>;

    /// Remove a key; removing a missing key is not an error
    fn remove(&mut self, key: &str) -> EngineResult<()>;

    /// Make previous writes durable
    fn flush(&mut self) -> EngineResult<()> {
        Ok(())
    }
}

/// Read and decode a typed record
pub fn load_state<T: DeserializeOwned>(store: &dyn StateStore, key: &str) -> EngineResult<Option<T>> {
    match store.get(key)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Encode and write a typed record
pub fn save_state<T: Serialize>(store: &mut dyn StateStore, key: &str, record: &T) -> EngineResult<()> {
    let value = serde_json::to_value(record)?;
    store.put(key, value)
}

/// Key layout
pub mod keys {
    use super::Season;

    pub const SPIKE_COOLDOWN: &str = "indoor_spike.last_alerted_at";
    pub const EFFICIENCY_ALERT: &str = "efficiency.last_alert";

    pub fn thresholds(season: Season) -> String {
        format!("thresholds.{}", season.name())
    }

    pub fn liveness(sensor_key: &str) -> String {
        format!("liveness.{}", sensor_key)
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> EngineResult<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> EngineResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> EngineResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
