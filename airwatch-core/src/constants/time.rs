//! Time-Related Constants
//!
//! Windows and durations used by the evaluators and the scheduler.

// ===== TIME UNIT CONVERSIONS =====

/// Minutes per hour.
pub const MINUTES_PER_HOUR: i64 = 60;

/// Hours per day.
pub const HOURS_PER_DAY: i64 = 24;

// ===== WINDOWS =====

/// Trailing window read for the efficiency evaluation (hours).
pub const EFFICIENCY_WINDOW_HOURS: i64 = 4;

/// Trailing window read for liveness checks (hours).
///
/// Must exceed the liveness gap, otherwise a stopped sensor vanishes from the
/// window before it can be reported.
pub const LIVENESS_WINDOW_HOURS: i64 = 4;

/// Reporting gap after which a sensor is considered down (hours).
pub const LIVENESS_GAP_HOURS: i64 = 2;

/// Cooldown between indoor-spike alerts (minutes).
pub const SPIKE_COOLDOWN_MINUTES: i64 = 60;

/// Cooldown before repeating an unchanged efficiency alert (hours).
pub const EFFICIENCY_ALERT_COOLDOWN_HOURS: i64 = 24;

/// Trailing pressure window (hours).
pub const PRESSURE_WINDOW_HOURS: i64 = 6;

/// Pressure forecast horizon (hours).
pub const PRESSURE_FORECAST_HOURS: i64 = 12;

/// Timeout for the pressure forecast fetch (seconds).
pub const PRESSURE_FETCH_TIMEOUT_SECS: u64 = 10;

/// Days covered by the weekly report.
pub const REPORT_DAYS: i64 = 7;

/// Overall wall-clock budget for one scheduled invocation (seconds).
pub const RUN_BUDGET_SECS: u64 = 300;
