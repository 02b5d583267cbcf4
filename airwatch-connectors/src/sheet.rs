//! Sheets "values" export reader
//!
//! Reads the JSON document returned by the Sheets values endpoint (or saved
//! from it by the export cron):
//!
//! ```json
//! { "range": "Sheet1!A1:R4000", "majorDimension": "ROWS",
//!   "values": [["Timestamp", "Sensor_ID", ...], ["2025-10-02 12:00:00", ...]] }
//! ```
//!
//! Rows may be ragged (trailing blanks are omitted by the API) and cells may
//! be strings or, with unformatted rendering, numbers. Parsing into readings
//! is delegated to `airwatch-schemas`.

use std::path::{Path, PathBuf};

use airwatch_core::{EngineError, EngineResult, FilterChangeRecord, FilterLog, Reading, ReadingSource, Timestamp};
use airwatch_schemas::{FilterRowParser, RowParser};
use chrono::FixedOffset;
use log::info;
use serde::Deserialize;
use serde_json::Value;

use crate::ConnectorError;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Cells of a values document as text rows
pub fn parse_values(json: &str) -> Result<Vec<Vec<String>>, ConnectorError> {
    let range: ValueRange = serde_json::from_str(json).map_err(|e| ConnectorError::Parse(e.to_string()))?;
    Ok(range
        .values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect())
}

/// Read a values document from disk
pub fn load_values(path: &Path) -> Result<Vec<Vec<String>>, ConnectorError> {
    let json = std::fs::read_to_string(path).map_err(|e| ConnectorError::io(path, e))?;
    parse_values(&json)
}

/// Reading Store and filter log backed by values exports on disk
#[derive(Debug, Clone)]
pub struct SheetFileSource {
    readings_path: PathBuf,
    filter_log_path: Option<PathBuf>,
    offset: FixedOffset,
    default_room: Option<String>,
    default_kind: Option<String>,
}

impl SheetFileSource {
    /// Readings export at `path`; naive timestamps are local to `offset`
    pub fn new(path: impl Into<PathBuf>, offset: FixedOffset) -> Self {
        Self {
            readings_path: path.into(),
            filter_log_path: None,
            offset,
            default_room: None,
            default_kind: None,
        }
    }

    /// Filter-change log export
    pub fn with_filter_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.filter_log_path = Some(path.into());
        self
    }

    /// Room and sensor kind for rows of sheets that predate those columns
    pub fn with_legacy_defaults(mut self, room: impl Into<String>, kind: impl Into<String>) -> Self {
        self.default_room = Some(room.into());
        self.default_kind = Some(kind.into());
        self
    }

    fn read_all(&self) -> Result<Vec<Reading>, ConnectorError> {
        let rows = load_values(&self.readings_path)?;
        let header = rows
            .first()
            .ok_or_else(|| ConnectorError::Parse(format!("{} is empty", self.readings_path.display())))?;
        let mut parser =
            RowParser::from_header(header, self.offset).map_err(|e| ConnectorError::Parse(e.to_string()))?;
        if let Some(room) = &self.default_room {
            parser = parser.default_room(room.as_str());
        }
        if let Some(kind) = &self.default_kind {
            parser = parser.default_kind(kind.as_str());
        }
        let mut readings = parser.parse_rows(&rows[1..]);
        readings.sort_by_key(|r| r.timestamp);
        info!(
            "read {} readings from {} ({} rows)",
            readings.len(),
            self.readings_path.display(),
            rows.len() - 1
        );
        Ok(readings)
    }
}

impl ReadingSource for SheetFileSource {
    fn readings_since(&self, since: Timestamp) -> EngineResult<Vec<Reading>> {
        let mut readings = self.all_readings()?;
        readings.retain(|r| r.timestamp >= since);
        Ok(readings)
    }

    fn all_readings(&self) -> EngineResult<Vec<Reading>> {
        self.read_all().map_err(|e| EngineError::Source(format!("reading store: {}", e)))
    }
}

impl FilterLog for SheetFileSource {
    fn filter_changes(&self) -> EngineResult<Vec<FilterChangeRecord>> {
        let Some(path) = &self.filter_log_path else {
            return Ok(Vec::new());
        };
        let rows = load_values(path).map_err(|e| EngineError::Source(format!("filter log: {}", e)))?;
        Ok(FilterRowParser::parse_all(&rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::io::Write;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn export(dir: &Path, name: &str, values: Value) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        let doc = json!({ "range": "Sheet1!A1:R10", "majorDimension": "ROWS", "values": values });
        file.write_all(doc.to_string().as_bytes()).unwrap();
        path
    }

    #[test]
    fn cells_of_any_json_type() {
        let rows = parse_values(r#"{"values": [["a", 1.5, null, true]]}"#).unwrap();
        assert_eq!(rows, vec![vec!["a", "1.5", "", "true"]]);
        assert!(parse_values(r#"{"range": "Sheet1!A1:A1"}"#).unwrap().is_empty());
        assert!(parse_values("not json").is_err());
    }

    #[test]
    fn readings_since_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let path = export(
            dir.path(),
            "readings.json",
            json!([
                ["Timestamp", "Sensor_ID", "Room", "Sensor_Type", "Indoor_PM25", "Outdoor_PM25"],
                ["2025-10-02 11:50:00", "ag_1", "office", "airgradient", 2.5, "12"],
                ["2025-10-02 10:00:00", "ag_1", "office", "airgradient", "3", "11"],
                ["2025-10-02 11:40:00", "ag_1", "office", "airgradient"],
                ["bad", "ag_1", "office", "airgradient", "3", "11"]
            ]),
        );
        let source = SheetFileSource::new(&path, utc());

        let all = source.all_readings().unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let since = Utc.with_ymd_and_hms(2025, 10, 2, 11, 0, 0).unwrap();
        let recent = source.readings_since(since).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].indoor_pm25, None);
        assert_eq!(recent[1].indoor_pm25, Some(2.5));
    }

    #[test]
    fn legacy_sheet_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = export(
            dir.path(),
            "legacy.json",
            json!([
                ["Timestamp", "ISO_Timestamp", "Indoor PM2.5", "Outdoor PM2.5", "Filter Efficiency (%)"],
                ["7/26/2025 13:27:51", "2025-07-26T13:27:50.470360", "1.5", "9", "83.3"]
            ]),
        );
        let source = SheetFileSource::new(&path, utc()).with_legacy_defaults("master_bedroom", "airthings");
        let readings = source.all_readings().unwrap();
        assert_eq!(readings[0].sensor_key(), "airthings_master_bedroom");
    }

    #[test]
    fn missing_export_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = SheetFileSource::new(dir.path().join("gone.json"), utc());
        assert!(matches!(source.all_readings(), Err(EngineError::Source(_))));
    }

    #[test]
    fn missing_timestamp_column_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = export(dir.path(), "r.json", json!([["Room", "Indoor_PM25"], ["office", "3"]]));
        let err = SheetFileSource::new(&path, utc()).all_readings().unwrap_err();
        assert!(matches!(err, EngineError::Source(message) if message.contains("Timestamp")));
    }

    #[test]
    fn filter_log() {
        let dir = tempfile::tempdir().unwrap();
        let readings = export(dir.path(), "r.json", json!([["Timestamp"]]));
        let log = export(
            dir.path(),
            "filters.json",
            json!([
                ["Date", "Filter_Type", "Location", "Action", "Model"],
                ["2025-03-01", "Fridge water", "Kitchen", "Replaced", "EDR1RXD1"]
            ]),
        );

        let without = SheetFileSource::new(&readings, utc());
        assert!(without.filter_changes().unwrap().is_empty());

        let with = without.with_filter_log(&log);
        let records = with.filter_changes().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filter_type, "Fridge water");
    }
}
