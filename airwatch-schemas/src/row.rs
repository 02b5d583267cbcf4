//! Row parsing
//!
//! Rows arrive as string cells exactly as the sheet export holds them. The
//! parser resolves the header once, then maps each row to a typed value.

use airwatch_core::{FilterAction, FilterChangeRecord, Reading, Timestamp};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;

use crate::columns::{Column, ColumnMap, FilterColumn};
use crate::physics;
use crate::SchemaError;

/// Naive timestamp layouts seen in the sheet, newest convention first
const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Value used for text columns the sheet does not carry
pub const UNKNOWN: &str = "unknown";

/// Parse a sheet timestamp; naive values are local to `offset`
pub fn parse_timestamp(raw: &str, offset: FixedOffset) -> Result<Timestamp, SchemaError> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| SchemaError::BadTimestamp(raw.to_string()))
}

/// Parse a filter-log date; a full timestamp is accepted and truncated
pub fn parse_date(raw: &str) -> Result<NaiveDate, SchemaError> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            TIMESTAMP_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|naive| naive.date())
        })
        .ok_or_else(|| SchemaError::BadDate(raw.to_string()))
}

/// Numeric cell, tolerating a trailing `%` and thousands separators
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok()
}

fn first_row<'a>(rows: &'a [Vec<String>]) -> Result<&'a [String], SchemaError> {
    rows.first()
        .map(Vec::as_slice)
        .ok_or(SchemaError::EmptySheet)
}

/// Parser for Reading Store rows
#[derive(Debug, Clone)]
pub struct RowParser {
    columns: ColumnMap<Column>,
    offset: FixedOffset,
    default_room: String,
    default_kind: String,
}

impl RowParser {
    pub fn from_header<S: AsRef<str>>(header: &[S], offset: FixedOffset) -> Result<Self, SchemaError> {
        let columns = ColumnMap::from_header(header)?;
        if !columns.ignored().is_empty() {
            debug!("ignoring unknown columns {:?}", columns.ignored());
        }
        Ok(Self {
            columns,
            offset,
            default_room: UNKNOWN.to_string(),
            default_kind: UNKNOWN.to_string(),
        })
    }

    /// Room for rows from sheets without a `Room` column
    pub fn default_room(mut self, room: impl Into<String>) -> Self {
        self.default_room = room.into();
        self
    }

    /// Sensor kind for rows from sheets without a `Sensor_Type` column
    pub fn default_kind(mut self, kind: impl Into<String>) -> Self {
        self.default_kind = kind.into();
        self
    }

    pub fn columns(&self) -> &ColumnMap<Column> {
        &self.columns
    }

    /// Parse one row; `None` when the row cannot be placed in time
    pub fn parse_row<S: AsRef<str>>(&self, row: &[S]) -> Option<Reading> {
        let raw_timestamp = self.columns.cell(row, Column::Timestamp)?;
        let timestamp = match parse_timestamp(raw_timestamp, self.offset) {
            Ok(timestamp) => timestamp,
            Err(err) => {
                debug!("skipping row: {}", err);
                return None;
            }
        };

        let text = |column: Column, fallback: &str| {
            self.columns
                .cell(row, column)
                .unwrap_or(fallback)
                .to_string()
        };
        let mut reading = Reading::new(
            timestamp,
            text(Column::SensorId, ""),
            text(Column::Room, &self.default_room),
            text(Column::SensorType, &self.default_kind),
        );

        let number = |column: Column| {
            let raw = self.columns.cell(row, column)?;
            match parse_number(raw) {
                Some(value) => physics::accept(column, value),
                None => {
                    debug!("{:?} cell {:?} is not a number, treated as absent", column, raw);
                    None
                }
            }
        };
        reading.indoor_pm25 = number(Column::IndoorPm25);
        reading.outdoor_pm25 = number(Column::OutdoorPm25);
        reading.filter_efficiency = number(Column::FilterEfficiency);
        reading.indoor_co2 = number(Column::IndoorCo2);
        reading.indoor_voc = number(Column::IndoorVoc);
        reading.indoor_nox = number(Column::IndoorNox);
        reading.indoor_temp = number(Column::IndoorTemp);
        reading.indoor_humidity = number(Column::IndoorHumidity);
        reading.indoor_radon = number(Column::IndoorRadon);
        reading.outdoor_co2 = number(Column::OutdoorCo2);
        reading.outdoor_temp = number(Column::OutdoorTemp);
        reading.outdoor_humidity = number(Column::OutdoorHumidity);
        reading.outdoor_voc = number(Column::OutdoorVoc);
        reading.outdoor_nox = number(Column::OutdoorNox);
        Some(reading)
    }

    /// Parse rows after the header, skipping those without a usable timestamp
    pub fn parse_rows(&self, rows: &[Vec<String>]) -> Vec<Reading> {
        let readings: Vec<Reading> = rows.iter().filter_map(|row| self.parse_row(row)).collect();
        if readings.len() < rows.len() {
            debug!("skipped {} of {} rows", rows.len() - readings.len(), rows.len());
        }
        readings
    }

    /// Parse a whole sheet; the first row is the header
    pub fn parse_all(rows: &[Vec<String>], offset: FixedOffset) -> Result<Vec<Reading>, SchemaError> {
        let parser = Self::from_header(first_row(rows)?, offset)?;
        Ok(parser.parse_rows(&rows[1..]))
    }
}

/// Parser for filter-change log rows
#[derive(Debug, Clone)]
pub struct FilterRowParser {
    columns: ColumnMap<FilterColumn>,
}

impl FilterRowParser {
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self, SchemaError> {
        Ok(Self {
            columns: ColumnMap::from_header(header)?,
        })
    }

    /// Parse one row; a blank action counts as a replacement
    pub fn parse_row<S: AsRef<str>>(&self, row: &[S]) -> Option<FilterChangeRecord> {
        let date = match parse_date(self.columns.cell(row, FilterColumn::Date)?) {
            Ok(date) => date,
            Err(err) => {
                debug!("skipping filter row: {}", err);
                return None;
            }
        };
        let filter_type = self.columns.cell(row, FilterColumn::FilterType)?.to_string();
        Some(FilterChangeRecord {
            date,
            filter_type,
            location: self
                .columns
                .cell(row, FilterColumn::Location)
                .unwrap_or_default()
                .to_string(),
            action: self
                .columns
                .cell(row, FilterColumn::Action)
                .map(FilterAction::parse)
                .unwrap_or(FilterAction::Replaced),
            model: self.columns.cell(row, FilterColumn::Model).map(str::to_string),
        })
    }

    pub fn parse_all(rows: &[Vec<String>]) -> Result<Vec<FilterChangeRecord>, SchemaError> {
        let parser = Self::from_header(first_row(rows)?)?;
        Ok(rows[1..].iter().filter_map(|row| parser.parse_row(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn sheet(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2025, 7, 26, 13, 27, 51).unwrap();
        for raw in [
            "2025-07-26 13:27:51",
            "7/26/2025 13:27:51",
            "07/26/2025 13:27:51",
            "2025-07-26T13:27:51Z",
            "2025-07-26T13:27:51",
        ] {
            assert_eq!(parse_timestamp(raw, utc()).unwrap(), expected, "{raw}");
        }
        let fractional = parse_timestamp("2025-07-26T13:27:50.470360", utc()).unwrap();
        assert_eq!(fractional.second(), 50);
    }

    #[test]
    fn naive_timestamps_use_offset() {
        let pacific = FixedOffset::west_opt(7 * 3600).unwrap();
        let ts = parse_timestamp("2025-07-26 06:00:00", pacific).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 7, 26, 13, 0, 0).unwrap());

        let explicit = parse_timestamp("2025-07-26T06:00:00-07:00", utc()).unwrap();
        assert_eq!(explicit, ts);
    }

    #[test]
    fn garbage_timestamp_is_an_error() {
        assert!(matches!(
            parse_timestamp("yesterday", utc()),
            Err(SchemaError::BadTimestamp(_))
        ));
    }

    #[test]
    fn dates() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(parse_date("2025-03-01").unwrap(), expected);
        assert_eq!(parse_date("3/1/2025").unwrap(), expected);
        assert_eq!(parse_date("2025-03-01 09:15:00").unwrap(), expected);
        assert!(parse_date("March").is_err());
    }

    #[test]
    fn current_layout_row() {
        let rows = sheet(&[
            &Column::header_row(),
            &[
                "2025-10-02 12:00:00", "airthings_123456", "master_bedroom", "airthings",
                "2.1", "12.4", "83.06", "640", "110", "", "21.5", "44", "31",
                "415", "14.2", "70", "", "1",
            ],
        ]);
        let readings = RowParser::parse_all(&rows, utc()).unwrap();
        assert_eq!(readings.len(), 1);
        let r = &readings[0];
        assert_eq!(r.sensor_key(), "airthings_master_bedroom");
        assert_eq!(r.indoor_pm25, Some(2.1));
        assert_eq!(r.filter_efficiency, Some(83.06));
        assert_eq!(r.indoor_nox, None);
        assert_eq!(r.outdoor_nox, Some(1.0));
        assert_eq!(r.outdoor_voc, None);
    }

    #[test]
    fn form_layout_row_with_defaults() {
        let rows = sheet(&[
            &["Timestamp", "ISO_Timestamp", "Indoor PM2.5", "Outdoor PM2.5", "Filter Efficiency (%)"],
            &["7/26/2025 13:27:51", "2025-07-26T13:27:50.470360", "1.5", "9", "83.3%"],
        ]);
        let parser = RowParser::from_header(&rows[0], utc())
            .unwrap()
            .default_room("master_bedroom")
            .default_kind("airthings");
        let reading = parser.parse_row(&rows[1]).unwrap();
        assert_eq!(reading.room, "master_bedroom");
        assert_eq!(reading.sensor_kind, "airthings");
        assert_eq!(reading.sensor_id, "");
        assert_eq!(reading.filter_efficiency, Some(83.3));
        assert_eq!(reading.indoor_co2, None);
    }

    #[test]
    fn malformed_cells_blank_only_that_field() {
        let rows = sheet(&[
            &["Timestamp", "Room", "Indoor_PM25", "Outdoor_PM25", "Indoor_CO2", "Indoor_Humidity"],
            &["2025-10-02 12:00:00", "office", "n/a", "11", "12", "140"],
        ]);
        let readings = RowParser::parse_all(&rows, utc()).unwrap();
        let r = &readings[0];
        assert_eq!(r.indoor_pm25, None);
        assert_eq!(r.outdoor_pm25, Some(11.0));
        // below the CO2 floor and above 100 % humidity
        assert_eq!(r.indoor_co2, None);
        assert_eq!(r.indoor_humidity, None);
    }

    #[test]
    fn unplaceable_rows_are_skipped() {
        let rows = sheet(&[
            &["Timestamp", "Indoor_PM25"],
            &["2025-10-02 12:00:00", "3"],
            &["", "4"],
            &["not a time", "5"],
            &["2025-10-02 12:10:00"],
        ]);
        let readings = RowParser::parse_all(&rows, utc()).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].indoor_pm25, None);
    }

    #[test]
    fn empty_sheet() {
        assert_eq!(RowParser::parse_all(&[], utc()).unwrap_err(), SchemaError::EmptySheet);
        assert_eq!(FilterRowParser::parse_all(&[]).unwrap_err(), SchemaError::EmptySheet);
    }

    #[test]
    fn filter_log_rows() {
        let rows = sheet(&[
            &["Date", "Filter Type", "Location", "Action", "Model"],
            &["2025-03-01", "Fridge water", "Kitchen", "Replaced", "EDR1RXD1"],
            &["4/15/2025", "HVAC", "Hall", "inspected", ""],
            &["2025-05-01", "UV bulb", "", "", ""],
            &["someday", "HVAC", "Hall", "Replaced", ""],
            &["2025-06-01", "", "Hall", "Replaced", ""],
        ]);
        let records = FilterRowParser::parse_all(&rows).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].model.as_deref(), Some("EDR1RXD1"));
        assert_eq!(records[1].action, FilterAction::Inspected);
        assert_eq!(records[1].model, None);
        assert_eq!(records[2].action, FilterAction::Replaced);
        assert_eq!(records[2].location, "");
    }
}
