//! Alert transports
//!
//! - [`SpoolTransport`] writes each digest as an RFC 5322 message into a
//!   spool directory; a local MTA or a cron'd `sendmail` picks them up.
//! - `WebhookTransport` posts each digest as JSON (`http` feature).
//!
//! A failed send returns `EngineError::Transport`; the dispatcher logs the
//! full digest and carries on with the next recipient.

use std::path::{Path, PathBuf};

use airwatch_core::{AlertTransport, Digest, EngineError, EngineResult};
use chrono::{DateTime, Utc};
use log::info;

use crate::{write_atomic, ConnectorError};

/// Digest rendered as a plain-text mail message
pub fn render_message(digest: &Digest, from: &str, date: DateTime<Utc>) -> String {
    format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
        from,
        digest.recipient,
        digest.subject(),
        date.to_rfc2822(),
        digest.body().replace('\n', "\r\n"),
    )
}

fn file_safe(recipient: &str) -> String {
    recipient
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') { c } else { '_' })
        .collect()
}

/// Mail-spool transport
#[derive(Debug)]
pub struct SpoolTransport {
    dir: PathBuf,
    from: String,
    sequence: u64,
}

impl SpoolTransport {
    /// Spool into `dir`, which must exist
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ConnectorError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ConnectorError::ConfigError(format!(
                "spool directory '{}' does not exist",
                dir.display()
            )));
        }
        Ok(Self {
            dir,
            from: "airwatch@localhost".to_string(),
            sequence: 0,
        })
    }

    pub fn from_address(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&mut self, stamp: DateTime<Utc>, recipient: &str) -> PathBuf {
        loop {
            self.sequence += 1;
            let name = format!(
                "{}-{:04}-{}.eml",
                stamp.format("%Y%m%dT%H%M%SZ"),
                self.sequence,
                file_safe(recipient)
            );
            let path = self.dir.join(name);
            if !path.exists() {
                return path;
            }
        }
    }
}

impl AlertTransport for SpoolTransport {
    fn send(&mut self, digest: &Digest) -> EngineResult<()> {
        let stamp = digest
            .alerts
            .iter()
            .map(|a| a.raised_at)
            .max()
            .unwrap_or_else(Utc::now);
        let path = self.next_path(stamp, &digest.recipient);
        let message = render_message(digest, &self.from, stamp);
        write_atomic(&path, message.as_bytes()).map_err(|e| EngineError::Transport(e.to_string()))?;
        info!("spooled digest for {} to {}", digest.recipient, path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "spool"
    }
}

#[cfg(feature = "http")]
pub use webhook::WebhookTransport;

#[cfg(feature = "http")]
mod webhook {
    use airwatch_core::{AlertTransport, Digest, EngineError, EngineResult};
    use serde_json::json;

    use crate::http::{HttpClient, HttpConfig};
    use crate::ConnectorError;

    /// JSON payload posted for one digest
    pub fn payload(digest: &Digest) -> serde_json::Value {
        json!({
            "recipient": digest.recipient,
            "subject": digest.subject(),
            "level": digest.highest_level(),
            "text": digest.body(),
            "alerts": digest.alerts,
        })
    }

    /// Webhook transport: one POST per digest
    pub struct WebhookTransport {
        client: HttpClient,
        path: String,
    }

    impl WebhookTransport {
        pub fn new(http: HttpConfig, path: impl Into<String>) -> Result<Self, ConnectorError> {
            let client = HttpClient::new(http).map_err(|e| ConnectorError::ConfigError(e.to_string()))?;
            Ok(Self {
                client,
                path: path.into(),
            })
        }

        pub fn client(&self) -> &HttpClient {
            &self.client
        }
    }

    impl AlertTransport for WebhookTransport {
        fn send(&mut self, digest: &Digest) -> EngineResult<()> {
            self.client
                .post_json(&self.path, &payload(digest))
                .map(|_| ())
                .map_err(|e| EngineError::Transport(format!("webhook to {}: {}", digest.recipient, e)))
        }

        fn name(&self) -> &str {
            "webhook"
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use airwatch_core::{Alert, AlertKind};
    use chrono::TimeZone;

    fn digest() -> Digest {
        let at = Utc.with_ymd_and_hms(2025, 10, 2, 12, 0, 0).unwrap();
        Digest {
            recipient: "sam+air@example.com".into(),
            alerts: vec![
                Alert::warning(AlertKind::Pressure, "pressure fell 6.5 hPa in 6 h", at),
                Alert::info(AlertKind::SensorLiveness, "airthings_office resumed", at),
            ],
        }
    }

    #[test]
    fn spooled_messages_are_complete_and_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let mut spool = SpoolTransport::new(dir.path()).unwrap().from_address("home@example.com");
        spool.send(&digest()).unwrap();
        spool.send(&digest()).unwrap();

        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "20251002T120000Z-0001-sam_air_example.com.eml".to_string(),
                "20251002T120000Z-0002-sam_air_example.com.eml".to_string(),
            ]
        );

        let text = std::fs::read_to_string(dir.path().join(&names[0])).unwrap();
        assert!(text.starts_with("From: home@example.com\r\nTo: sam+air@example.com\r\n"));
        assert!(text.contains("Subject: AirWatch: 1 warning, 1 info\r\n"));
        assert!(text.contains("pressure fell 6.5 hPa"));
    }

    #[test]
    fn missing_spool_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SpoolTransport::new(dir.path().join("nope")).is_err());
    }
}
