//! Connectors Between the Engine and the Outside World
//!
//! ## Overview
//!
//! `airwatch-core` decides; this crate fetches and delivers. Each connector
//! implements one of the core collaborator traits so the engine never sees a
//! file path, URL or credential.
//!
//! | Connector              | Core trait                     | Backing            |
//! |------------------------|--------------------------------|--------------------|
//! | [`SheetFileSource`]    | `ReadingSource`, `FilterLog`   | Sheets values JSON export |
//! | [`JsonFileStore`]      | `StateStore`                   | one JSON document  |
//! | [`SpoolTransport`]     | `AlertTransport`               | `.eml` files for a local MTA |
//! | `OpenMeteoPressureSource` | `PressureSource`            | Open-Meteo HTTP API (`http` feature) |
//! | `WebhookTransport`     | `AlertTransport`               | JSON POST (`http` feature) |
//!
//! ## Failure Handling
//!
//! Connectors report failures as `EngineError` values of the right category
//! (`Source`, `Store` or `Transport`) and leave the degrade-or-abort decision
//! to the engine. The HTTP client retries transient failures (transport
//! errors, 429 and 5xx) with exponential backoff:
//!
//! ```text
//! retry_delay = min(base * 2^attempt, max_delay)
//! ```
//!
//! ## Durability
//!
//! Files written by this crate (state, spooled mail) go through a temp file,
//! `fsync` and `rename`, so a crash leaves either the old or the new file,
//! never a torn one.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use airwatch_connectors::{JsonFileStore, SheetFileSource, SpoolTransport};
//! use airwatch_core::{Engine, EngineConfig};
//! use chrono::FixedOffset;
//!
//! let config = EngineConfig::from_json_file("/etc/airwatch/config.json")?;
//! let offset = FixedOffset::west_opt(7 * 3600).unwrap();
//! let mut engine = Engine::builder(config)
//!     .store(JsonFileStore::open("/var/lib/airwatch/state.json")?)
//!     .readings(SheetFileSource::new("/var/lib/airwatch/readings.json", offset))
//!     .transport(SpoolTransport::new("/var/spool/airwatch")?)
//!     .build()?;
//! let summary = engine.run_evaluation()?;
//! println!("{} alerts", summary.alerts.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub mod pressure;

pub mod notify;
pub mod sheet;
pub mod state;

#[cfg(feature = "http")]
pub use http::{AuthMethod, HttpClient, HttpConfig, HttpError};
#[cfg(feature = "http")]
pub use notify::WebhookTransport;
#[cfg(feature = "http")]
pub use pressure::OpenMeteoPressureSource;

pub use notify::SpoolTransport;
pub use sheet::SheetFileSource;
pub use state::JsonFileStore;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed payload: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ConnectorError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        ConnectorError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Request statistics kept by HTTP-backed connectors
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Requests that returned a success status
    pub requests_ok: u64,
    /// Requests that failed after all retries
    pub requests_failed: u64,
    /// Retries issued
    pub retries: u64,
    /// Request body bytes sent
    pub bytes_sent: u64,
    /// Last error message
    pub last_error: Option<String>,
}

/// Replace `path` with `contents` via temp file, fsync and rename
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ConnectorError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| ConnectorError::ConfigError(format!("'{}' has no file name", path.display())))?
        .to_string_lossy();

    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{file_name}.tmp-{}-{suffix}", process::id()));

    let mut file = OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .map_err(|err| ConnectorError::io(&temp_path, err))?;

    let written = file.write_all(contents).and_then(|()| file.sync_all());
    if let Err(err) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ConnectorError::io(&temp_path, err));
    }
    drop(file);

    if let Err(err) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ConnectorError::io(path, err));
    }
    Ok(())
}
