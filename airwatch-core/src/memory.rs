//! In-memory collaborators
//!
//! Backing implementations of the collaborator traits for replaying exported
//! data and for tests. Each can be switched into a failing mode to exercise
//! the engine's degradation paths.

use chrono::Duration;

use crate::alerts::Digest;
use crate::errors::{EngineError, EngineResult};
use crate::pressure::PressureSample;
use crate::reading::{FilterChangeRecord, Reading};
use crate::time::Timestamp;
use crate::traits::{AlertTransport, FilterLog, PressureSource, ReadingSource};

/// Readings held in memory, kept sorted by timestamp
#[derive(Debug, Clone, Default)]
pub struct MemoryReadings {
    readings: Vec<Reading>,
    failure: Option<String>,
}

impl MemoryReadings {
    pub fn new(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.timestamp);
        Self {
            readings,
            failure: None,
        }
    }

    pub fn push(&mut self, reading: Reading) {
        let at = self.readings.partition_point(|r| r.timestamp <= reading.timestamp);
        self.readings.insert(at, reading);
    }

    /// Make every read fail with `reason`, or succeed again with `None`
    pub fn set_failure(&mut self, reason: Option<&str>) {
        self.failure = reason.map(str::to_string);
    }

    fn check(&self) -> EngineResult<()> {
        match &self.failure {
            Some(reason) => Err(EngineError::Source(reason.clone())),
            None => Ok(()),
        }
    }
}

impl ReadingSource for MemoryReadings {
    fn readings_since(&self, since: Timestamp) -> EngineResult<Vec<Reading>> {
        self.check()?;
        let start = self.readings.partition_point(|r| r.timestamp < since);
        Ok(self.readings[start..].to_vec())
    }

    fn all_readings(&self) -> EngineResult<Vec<Reading>> {
        self.check()?;
        Ok(self.readings.clone())
    }
}

/// Filter log held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFilterLog {
    records: Vec<FilterChangeRecord>,
}

impl MemoryFilterLog {
    pub fn new(records: Vec<FilterChangeRecord>) -> Self {
        Self { records }
    }
}

impl FilterLog for MemoryFilterLog {
    fn filter_changes(&self) -> EngineResult<Vec<FilterChangeRecord>> {
        Ok(self.records.clone())
    }
}

/// Fixed pressure series; `None` simulates an unreachable forecast service
#[derive(Debug, Clone, Default)]
pub struct StaticPressure {
    samples: Option<Vec<PressureSample>>,
}

impl StaticPressure {
    pub fn new(samples: Vec<PressureSample>) -> Self {
        Self {
            samples: Some(samples),
        }
    }

    pub fn unavailable() -> Self {
        Self { samples: None }
    }
}

impl PressureSource for StaticPressure {
    fn pressure_series(
        &self,
        now: Timestamp,
        past: Duration,
        forecast: Duration,
    ) -> EngineResult<Vec<PressureSample>> {
        let samples = self
            .samples
            .as_ref()
            .ok_or_else(|| EngineError::Source("pressure service unavailable".into()))?;
        Ok(samples
            .iter()
            .filter(|s| s.timestamp >= now - past && s.timestamp <= now + forecast)
            .copied()
            .collect())
    }
}

/// Transport that keeps every digest it is handed
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub sent: Vec<Digest>,
    fail_for: Vec<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject digests addressed to `recipient`
    pub fn failing_for(mut self, recipient: impl Into<String>) -> Self {
        self.fail_for.push(recipient.into());
        self
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<&Digest> {
        self.sent.iter().filter(|d| d.recipient == recipient).collect()
    }
}

impl AlertTransport for RecordingTransport {
    fn send(&mut self, digest: &Digest) -> EngineResult<()> {
        if self.fail_for.iter().any(|r| *r == digest.recipient) {
            return Err(EngineError::Transport(format!("recipient {} rejected", digest.recipient)));
        }
        self.sent.push(digest.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
