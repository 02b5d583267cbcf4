//! Time management for scheduled runs
//!
//! Provides clock abstraction so evaluators never read the wall clock:
//! - System clock for production runs
//! - Fixed clock for tests and replays
//! - Deadline for the per-invocation wall-clock budget

use chrono::{DateTime, Duration, Utc};
use std::time::Instant;

/// Wall-clock instant used throughout the engine
pub type Timestamp = DateTime<Utc>;

/// Source of time for the engine
pub trait TimeSource {
    /// Get the current instant
    fn now(&self) -> Timestamp;
}

/// System time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Timestamp,
}

impl FixedClock {
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn advance(&mut self, by: Duration) {
        self.timestamp += by;
    }
}

impl TimeSource for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Wall-clock budget for one scheduled invocation
///
/// Measured on the monotonic clock so a clock adjustment mid-run cannot
/// extend or cut the budget.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    budget: std::time::Duration,
}

impl Deadline {
    pub fn after(budget: std::time::Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    /// True once the budget is spent
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    /// Budget left, zero once expired
    pub fn remaining(&self) -> std::time::Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

/// Elapsed time from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_since(earlier: Timestamp, later: Timestamp) -> Duration {
    let delta = later - earlier;
    if delta < Duration::zero() {
        Duration::zero()
    } else {
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let mut clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::minutes(10));
        assert_eq!(clock.now(), start + Duration::minutes(10));
    }

    #[test]
    fn elapsed_never_negative() {
        let a = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let b = a + Duration::hours(2);
        assert_eq!(elapsed_since(a, b), Duration::hours(2));
        assert_eq!(elapsed_since(b, a), Duration::zero());
    }

    #[test]
    fn zero_budget_expires_immediately() {
        let deadline = Deadline::after(std::time::Duration::ZERO);
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), std::time::Duration::ZERO);

        let generous = Deadline::after(std::time::Duration::from_secs(3600));
        assert!(!generous.expired());
    }
}
