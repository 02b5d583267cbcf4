//! Column catalogue and header matching
//!
//! The sheet has gone through two header conventions: form-style headers
//! (`Indoor PM2.5`, `Filter Efficiency (%)`) and the current snake-case ones
//! (`Indoor_PM25`). Headers are matched after normalisation: lower-case,
//! trailing `(unit)` removed, spaces, `_`, `.` and `-` dropped.
//!
//! ```text
//! "Filter Efficiency (%)" ─► "filterefficiency"
//! "Indoor_PM25"           ─► "indoorpm25"
//! "Indoor PM2.5"          ─► "indoorpm25"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::SchemaError;

/// Normalised form of a header cell
pub fn normalize_header(header: &str) -> String {
    let trimmed = header.trim();
    let without_unit = match (trimmed.rfind('('), trimmed.ends_with(')')) {
        (Some(open), true) if open > 0 => &trimmed[..open],
        _ => trimmed,
    };
    without_unit
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '.' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// A fixed set of columns matched against a header row
pub trait ColumnSet: Copy + Ord + Sized + 'static {
    fn all() -> &'static [Self];

    /// Normalised names accepted for this column, canonical first
    fn aliases(&self) -> &'static [&'static str];

    fn is_required(&self) -> bool;

    fn canonical(&self) -> &'static str;

    fn matching(normalized: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.aliases().iter().any(|alias| *alias == normalized))
    }
}

/// Reading Store columns in current sheet order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    Timestamp,
    SensorId,
    Room,
    SensorType,
    IndoorPm25,
    OutdoorPm25,
    FilterEfficiency,
    IndoorCo2,
    IndoorVoc,
    IndoorNox,
    IndoorTemp,
    IndoorHumidity,
    IndoorRadon,
    OutdoorCo2,
    OutdoorTemp,
    OutdoorHumidity,
    OutdoorVoc,
    OutdoorNox,
}

impl Column {
    pub const ALL: [Column; 18] = [
        Column::Timestamp,
        Column::SensorId,
        Column::Room,
        Column::SensorType,
        Column::IndoorPm25,
        Column::OutdoorPm25,
        Column::FilterEfficiency,
        Column::IndoorCo2,
        Column::IndoorVoc,
        Column::IndoorNox,
        Column::IndoorTemp,
        Column::IndoorHumidity,
        Column::IndoorRadon,
        Column::OutdoorCo2,
        Column::OutdoorTemp,
        Column::OutdoorHumidity,
        Column::OutdoorVoc,
        Column::OutdoorNox,
    ];

    /// Current header row
    pub fn header_row() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.canonical()).collect()
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(
            self,
            Column::Timestamp | Column::SensorId | Column::Room | Column::SensorType
        )
    }
}

impl ColumnSet for Column {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Timestamp => &["timestamp", "time", "datetime", "date"],
            Column::SensorId => &["sensorid", "deviceid", "serial"],
            Column::Room => &["room"],
            Column::SensorType => &["sensortype", "sensorkind", "sensor", "type"],
            Column::IndoorPm25 => &["indoorpm25", "pm25indoor", "indoorpm"],
            Column::OutdoorPm25 => &["outdoorpm25", "pm25outdoor", "outdoorpm"],
            Column::FilterEfficiency => &["filterefficiency", "efficiency"],
            Column::IndoorCo2 => &["indoorco2", "co2"],
            Column::IndoorVoc => &["indoorvoc", "indoortvoc", "voc", "tvoc"],
            Column::IndoorNox => &["indoornox", "nox"],
            Column::IndoorTemp => &["indoortemp", "indoortemperature", "temperature", "temp"],
            Column::IndoorHumidity => &["indoorhumidity", "humidity"],
            Column::IndoorRadon => &["indoorradon", "radon", "radonshortterm"],
            Column::OutdoorCo2 => &["outdoorco2"],
            Column::OutdoorTemp => &["outdoortemp", "outdoortemperature"],
            Column::OutdoorHumidity => &["outdoorhumidity"],
            Column::OutdoorVoc => &["outdoorvoc", "outdoortvoc"],
            Column::OutdoorNox => &["outdoornox"],
        }
    }

    fn is_required(&self) -> bool {
        matches!(self, Column::Timestamp)
    }

    fn canonical(&self) -> &'static str {
        match self {
            Column::Timestamp => "Timestamp",
            Column::SensorId => "Sensor_ID",
            Column::Room => "Room",
            Column::SensorType => "Sensor_Type",
            Column::IndoorPm25 => "Indoor_PM25",
            Column::OutdoorPm25 => "Outdoor_PM25",
            Column::FilterEfficiency => "Filter_Efficiency",
            Column::IndoorCo2 => "Indoor_CO2",
            Column::IndoorVoc => "Indoor_VOC",
            Column::IndoorNox => "Indoor_NOX",
            Column::IndoorTemp => "Indoor_Temp",
            Column::IndoorHumidity => "Indoor_Humidity",
            Column::IndoorRadon => "Indoor_Radon",
            Column::OutdoorCo2 => "Outdoor_CO2",
            Column::OutdoorTemp => "Outdoor_Temp",
            Column::OutdoorHumidity => "Outdoor_Humidity",
            Column::OutdoorVoc => "Outdoor_VOC",
            Column::OutdoorNox => "Outdoor_NOX",
        }
    }
}

/// Filter-change log columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FilterColumn {
    Date,
    FilterType,
    Location,
    Action,
    Model,
}

impl FilterColumn {
    pub const ALL: [FilterColumn; 5] = [
        FilterColumn::Date,
        FilterColumn::FilterType,
        FilterColumn::Location,
        FilterColumn::Action,
        FilterColumn::Model,
    ];
}

impl ColumnSet for FilterColumn {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            FilterColumn::Date => &["date", "changedon", "timestamp"],
            FilterColumn::FilterType => &["filtertype", "filter", "type"],
            FilterColumn::Location => &["location", "room"],
            FilterColumn::Action => &["action"],
            FilterColumn::Model => &["model", "partnumber"],
        }
    }

    fn is_required(&self) -> bool {
        matches!(self, FilterColumn::Date | FilterColumn::FilterType)
    }

    fn canonical(&self) -> &'static str {
        match self {
            FilterColumn::Date => "Date",
            FilterColumn::FilterType => "Filter_Type",
            FilterColumn::Location => "Location",
            FilterColumn::Action => "Action",
            FilterColumn::Model => "Model",
        }
    }
}

/// Column positions resolved from a header row
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap<C: ColumnSet> {
    positions: BTreeMap<C, usize>,
    ignored: Vec<String>,
}

impl<C: ColumnSet> ColumnMap<C> {
    /// Resolve a header row; the first header matching a column wins
    pub fn from_header<S: AsRef<str>>(header: &[S]) -> Result<Self, SchemaError> {
        let mut positions = BTreeMap::new();
        let mut ignored = Vec::new();
        for (index, cell) in header.iter().enumerate() {
            match C::matching(&normalize_header(cell.as_ref())) {
                Some(column) => {
                    positions.entry(column).or_insert(index);
                }
                None => ignored.push(cell.as_ref().to_string()),
            }
        }
        for column in C::all() {
            if column.is_required() && !positions.contains_key(column) {
                return Err(SchemaError::MissingColumn(column.canonical().to_string()));
            }
        }
        Ok(Self { positions, ignored })
    }

    pub fn position(&self, column: C) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    /// Trimmed cell for `column`, `None` when the column or cell is missing or blank
    pub fn cell<'a, S: AsRef<str>>(&self, row: &'a [S], column: C) -> Option<&'a str> {
        let value = row.get(self.position(column)?)?.as_ref().trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }

    /// Header cells that matched no known column
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }
}
