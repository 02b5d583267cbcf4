//! Alerts, Digests and the Alert Dispatcher
//!
//! ## Overview
//!
//! Evaluators return [`Alert`] values; they never send anything. At the end of
//! a run the [`AlertDispatcher`] groups every alert by recipient, sorts each
//! group by severity and hands one [`Digest`] per recipient to the transport.
//!
//! ```text
//! efficiency ─┐
//! spike ──────┤                 ┌─► digest(primary)  ─► send ×1
//! liveness ───┼─► Vec<Alert> ───┤
//! pressure ───┘                 └─► digest(extended) ─► send ×1
//! ```
//!
//! ## Routing
//!
//! Household alerts go to the primary recipients. Kinds listed in
//! `extended_kinds` (health-relevant pressure drops and indoor spikes by
//! default) also go to the extended recipients.
//!
//! ## Failure Handling
//!
//! A failed send never discards the digest. It is logged in full and returned
//! in [`DispatchReport::undelivered`]; a duplicate send later is preferable to
//! a lost alert at this volume.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::time::Timestamp;
use crate::traits::AlertTransport;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    pub const fn name(&self) -> &'static str {
        match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which evaluator raised an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Efficiency,
    IndoorSpike,
    SensorLiveness,
    ReadingStore,
    Pressure,
    FilterReminder,
    WeeklyReport,
}

/// One alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub kind: AlertKind,
    pub message: String,
    pub raised_at: Timestamp,
}

impl Alert {
    pub fn new(level: AlertLevel, kind: AlertKind, message: impl Into<String>, raised_at: Timestamp) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
            raised_at,
        }
    }

    pub fn info(kind: AlertKind, message: impl Into<String>, raised_at: Timestamp) -> Self {
        Self::new(AlertLevel::Info, kind, message, raised_at)
    }

    pub fn warning(kind: AlertKind, message: impl Into<String>, raised_at: Timestamp) -> Self {
        Self::new(AlertLevel::Warning, kind, message, raised_at)
    }

    pub fn critical(kind: AlertKind, message: impl Into<String>, raised_at: Timestamp) -> Self {
        Self::new(AlertLevel::Critical, kind, message, raised_at)
    }
}

/// All alerts for one recipient in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    pub recipient: String,
    /// Sorted by level, most severe first
    pub alerts: Vec<Alert>,
}

impl Digest {
    pub fn highest_level(&self) -> Option<AlertLevel> {
        self.alerts.iter().map(|a| a.level).max()
    }

    pub fn subject(&self) -> String {
        let count = |level| self.alerts.iter().filter(|a| a.level == level).count();
        let mut parts = Vec::new();
        for level in [AlertLevel::Critical, AlertLevel::Warning, AlertLevel::Info] {
            let n = count(level);
            if n > 0 {
                parts.push(format!("{} {}", n, level.name().to_lowercase()));
            }
        }
        format!("AirWatch: {}", parts.join(", "))
    }

    /// Plain-text body, one alert per paragraph
    pub fn body(&self) -> String {
        self.alerts
            .iter()
            .map(|a| format!("[{}] {}", a.level, a.message))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Recipient routing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Routing {
    /// Receive every alert kind
    pub primary: Vec<String>,
    /// Receive only `extended_kinds`
    pub extended: Vec<String>,
    pub extended_kinds: Vec<AlertKind>,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            primary: Vec::new(),
            extended: Vec::new(),
            extended_kinds: vec![AlertKind::Pressure, AlertKind::IndoorSpike],
        }
    }
}

impl Routing {
    pub fn recipients_for(&self, kind: AlertKind) -> Vec<&str> {
        let mut recipients: Vec<&str> = self.primary.iter().map(String::as_str).collect();
        if self.extended_kinds.contains(&kind) {
            for r in &self.extended {
                if !recipients.contains(&r.as_str()) {
                    recipients.push(r);
                }
            }
        }
        recipients
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Recipients whose digest was sent
    pub delivered: Vec<String>,
    /// Digests the transport rejected, with the error
    pub undelivered: Vec<(Digest, String)>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.undelivered.is_empty()
    }
}

/// Groups alerts per recipient and sends one digest each
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    routing: Routing,
}

impl AlertDispatcher {
    pub fn new(routing: Routing) -> Self {
        Self { routing }
    }

    /// One digest per recipient, alerts sorted most severe first
    ///
    /// The sort is stable, so alerts of equal level keep the order the
    /// evaluators raised them in.
    pub fn group(&self, alerts: &[Alert]) -> Vec<Digest> {
        let mut by_recipient: BTreeMap<&str, Vec<Alert>> = BTreeMap::new();
        for alert in alerts {
            for recipient in self.routing.recipients_for(alert.kind) {
                by_recipient.entry(recipient).or_default().push(alert.clone());
            }
        }
        by_recipient
            .into_iter()
            .map(|(recipient, mut alerts)| {
                alerts.sort_by(|a, b| b.level.cmp(&a.level));
                Digest {
                    recipient: recipient.to_string(),
                    alerts,
                }
            })
            .collect()
    }

    /// Send each digest exactly once
    pub fn dispatch(&self, alerts: &[Alert], transport: &mut dyn AlertTransport) -> DispatchReport {
        let mut report = DispatchReport::default();
        for digest in self.group(alerts) {
            match transport.send(&digest) {
                Ok(()) => {
                    info!(
                        "Sent digest to {} via {} ({} alerts)",
                        digest.recipient,
                        transport.name(),
                        digest.alerts.len()
                    );
                    report.delivered.push(digest.recipient.clone());
                }
                Err(err) => {
                    error!(
                        "Digest for {} not delivered via {}: {}\n{}\n{}",
                        digest.recipient,
                        transport.name(),
                        err,
                        digest.subject(),
                        digest.body()
                    );
                    report.undelivered.push((digest, err.to_string()));
                }
            }
        }
        report
    }
}
