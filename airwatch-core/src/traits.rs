//! Collaborator traits
//!
//! The engine reads and sends only through these traits. Keep them narrow:
//! everything outside the decision logic (spreadsheets, HTTP, mail) lives in
//! `airwatch-connectors`.

use chrono::Duration;

use crate::alerts::Digest;
use crate::errors::EngineResult;
use crate::pressure::PressureSample;
use crate::reading::{FilterChangeRecord, Reading};
use crate::time::Timestamp;

/// Read-only access to the Reading Store
pub trait ReadingSource {
    /// Readings at or after `since`, oldest first
    fn readings_since(&self, since: Timestamp) -> EngineResult<Vec<Reading>>;

    /// Complete history, oldest first
    fn all_readings(&self) -> EngineResult<Vec<Reading>>;
}

/// Read-only access to the filter-change log
pub trait FilterLog {
    fn filter_changes(&self) -> EngineResult<Vec<FilterChangeRecord>>;
}

/// Barometric pressure series covering the past and the forecast
pub trait PressureSource {
    /// Samples from `now − past` to `now + forecast`, oldest first
    fn pressure_series(
        &self,
        now: Timestamp,
        past: Duration,
        forecast: Duration,
    ) -> EngineResult<Vec<PressureSample>>;
}

/// Outbound delivery of alert digests
pub trait AlertTransport {
    /// Deliver one digest
    fn send(&mut self, digest: &Digest) -> EngineResult<()>;

    /// Short name for logs
    fn name(&self) -> &str;
}
