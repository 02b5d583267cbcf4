//! Reading Store Row Schema
//!
//! ## Overview
//!
//! The Reading Store is a spreadsheet appended to by several collectors, and
//! its layout has changed over time: the early sheet used form-style headers
//! with units (`Indoor PM2.5`, `Filter Efficiency (%)`) and US-style
//! timestamps, the current one uses snake-case headers and ISO timestamps.
//! This crate turns raw rows of string cells from either era into typed
//! [`Reading`](airwatch_core::Reading) and
//! [`FilterChangeRecord`](airwatch_core::FilterChangeRecord) values.
//!
//! ## Parsing Rules
//!
//! - The first row is the header. Columns are resolved by normalised name,
//!   not by position, so reordered or extra columns are harmless.
//! - `Timestamp` is the only required column. A row whose timestamp cannot be
//!   parsed is skipped: it cannot be placed in any window.
//! - Every other malformed cell blanks that field only. Numbers outside the
//!   plausible physical range for their column are treated the same way.
//!   Absent is never zero.
//!
//! ## Plausibility Limits
//!
//! | Column            | Range          | Unit   |
//! |-------------------|----------------|--------|
//! | PM2.5             | 0 – 1000       | µg/m³  |
//! | CO2               | 250 – 10000    | ppm    |
//! | Humidity          | 0 – 100        | %      |
//! | Temperature       | −60 – 70       | °C     |
//! | Filter efficiency | −100 – 100     | %      |
//! | Radon             | 0 – 10000      | Bq/m³  |
//! | VOC index         | 0 – 60000      | ppb    |
//! | NOx index         | 0 – 500        | index  |
//!
//! ## Usage Example
//!
//! ```rust
//! use airwatch_schemas::RowParser;
//! use chrono::FixedOffset;
//!
//! let rows = vec![
//!     vec!["Timestamp".to_string(), "Room".to_string(), "Indoor PM2.5".to_string()],
//!     vec!["7/26/2025 13:27:51".to_string(), "office".to_string(), "3.2".to_string()],
//! ];
//! let offset = FixedOffset::west_opt(7 * 3600).unwrap();
//! let readings = RowParser::parse_all(&rows, offset)?;
//! assert_eq!(readings.len(), 1);
//! assert_eq!(readings[0].indoor_pm25, Some(3.2));
//! # Ok::<(), airwatch_schemas::SchemaError>(())
//! ```

use airwatch_core::EngineError;

pub mod columns;
pub mod physics;
pub mod row;

pub use columns::{normalize_header, Column, ColumnMap, ColumnSet, FilterColumn};
pub use physics::PlausibleRange;
pub use row::{parse_date, parse_timestamp, FilterRowParser, RowParser};

/// Schema-related errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Sheet has no header row")]
    EmptySheet,

    #[error("Required column missing: {0}")]
    MissingColumn(String),

    #[error("Unrecognised timestamp: {0}")]
    BadTimestamp(String),

    #[error("Unrecognised date: {0}")]
    BadDate(String),
}

impl From<SchemaError> for EngineError {
    fn from(err: SchemaError) -> Self {
        EngineError::Source(err.to_string())
    }
}
