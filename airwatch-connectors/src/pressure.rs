//! Open-Meteo barometric pressure source
//!
//! Requests hourly `surface_pressure` around the current hour with
//! `past_hours` / `forecast_hours` and Unix timestamps, so the reply needs no
//! time-zone handling. Missing hours come back as `null` and are dropped; a
//! `time` array longer than the value array (or the reverse) is truncated to
//! the shorter one.

use airwatch_core::{
    config::PressureConfig, EngineError, EngineResult, PressureSample, PressureSource, Timestamp,
};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Deserialize;

use crate::http::{HttpClient, HttpConfig};
use crate::ConnectorError;

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com";
const FORECAST_PATH: &str = "/v1/forecast";

#[derive(Debug, Deserialize)]
struct ForecastReply {
    hourly: Option<HourlySeries>,
}

#[derive(Debug, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<i64>,
    #[serde(default)]
    surface_pressure: Vec<Option<f64>>,
}

/// Decode an Open-Meteo reply into samples, oldest first
pub fn parse_hourly(reply: serde_json::Value) -> Result<Vec<PressureSample>, ConnectorError> {
    let reply: ForecastReply =
        serde_json::from_value(reply).map_err(|e| ConnectorError::Parse(e.to_string()))?;
    let hourly = reply
        .hourly
        .ok_or_else(|| ConnectorError::Parse("reply has no hourly block".into()))?;
    if hourly.time.len() != hourly.surface_pressure.len() {
        debug!(
            "pressure series truncated: {} times, {} values",
            hourly.time.len(),
            hourly.surface_pressure.len()
        );
    }

    let mut samples: Vec<PressureSample> = hourly
        .time
        .iter()
        .zip(hourly.surface_pressure.iter())
        .filter_map(|(secs, hpa)| {
            let timestamp = DateTime::<Utc>::from_timestamp(*secs, 0)?;
            Some(PressureSample::new(timestamp, (*hpa)?))
        })
        .collect();
    samples.sort_by_key(|s| s.timestamp);
    Ok(samples)
}

fn whole_hours(span: Duration) -> i64 {
    let hours = span.num_hours();
    if span > Duration::hours(hours) {
        hours + 1
    } else {
        hours
    }
}

/// Pressure series for one location from Open-Meteo
pub struct OpenMeteoPressureSource {
    client: HttpClient,
    latitude: f64,
    longitude: f64,
}

impl OpenMeteoPressureSource {
    /// Source using the public endpoint and the configured fetch timeout
    pub fn new(latitude: f64, longitude: f64, config: &PressureConfig) -> Result<Self, ConnectorError> {
        Self::with_http(
            latitude,
            longitude,
            HttpConfig::new(OPEN_METEO_URL).timeout_secs(config.fetch_timeout_secs),
        )
    }

    /// Source over a caller-supplied HTTP configuration
    pub fn with_http(latitude: f64, longitude: f64, http: HttpConfig) -> Result<Self, ConnectorError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConnectorError::ConfigError(format!(
                "coordinates out of range: {}, {}",
                latitude, longitude
            )));
        }
        let client = HttpClient::new(http).map_err(|e| ConnectorError::ConfigError(e.to_string()))?;
        Ok(Self {
            client,
            latitude,
            longitude,
        })
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    fn query(&self, past: Duration, forecast: Duration) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", format!("{:.4}", self.latitude)),
            ("longitude", format!("{:.4}", self.longitude)),
            ("hourly", "surface_pressure".to_string()),
            ("past_hours", whole_hours(past).max(1).to_string()),
            ("forecast_hours", whole_hours(forecast).max(1).to_string()),
            ("timeformat", "unixtime".to_string()),
            ("timezone", "GMT".to_string()),
        ]
    }
}

impl PressureSource for OpenMeteoPressureSource {
    fn pressure_series(
        &self,
        now: Timestamp,
        past: Duration,
        forecast: Duration,
    ) -> EngineResult<Vec<PressureSample>> {
        let reply = self
            .client
            .get_json(FORECAST_PATH, &self.query(past, forecast))
            .map_err(|e| EngineError::Source(format!("pressure fetch: {}", e)))?;
        let samples = parse_hourly(reply).map_err(|e| EngineError::Source(format!("pressure reply: {}", e)))?;
        let from = now - past;
        let to = now + forecast;
        Ok(samples
            .into_iter()
            .filter(|s| s.timestamp >= from && s.timestamp <= to)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nulls_and_truncation_are_tolerated() {
        let reply = json!({
            "latitude": 37.77,
            "hourly_units": { "surface_pressure": "hPa" },
            "hourly": {
                "time": [1759399200, 1759402800, 1759406400, 1759410000],
                "surface_pressure": [1012.4, null, 1011.1]
            }
        });
        let samples = parse_hourly(reply).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].hpa, 1012.4);
        assert_eq!(samples[1].timestamp.timestamp(), 1759406400);
    }

    #[test]
    fn missing_hourly_block_is_an_error() {
        let err = parse_hourly(json!({ "error": true, "reason": "bad latitude" })).unwrap_err();
        assert!(matches!(err, ConnectorError::Parse(_)));
    }

    #[test]
    fn hour_rounding() {
        assert_eq!(whole_hours(Duration::hours(6)), 6);
        assert_eq!(whole_hours(Duration::minutes(61)), 2);
        assert_eq!(whole_hours(Duration::zero()), 0);
    }

    #[test]
    fn request_uses_configured_timeout() {
        let config = PressureConfig {
            fetch_timeout_secs: 3,
            ..PressureConfig::default()
        };
        let source = OpenMeteoPressureSource::new(37.77, -122.42, &config).unwrap();
        assert_eq!(source.client().config().timeout, std::time::Duration::from_secs(3));

        let query = source.query(Duration::hours(6), Duration::hours(12));
        assert!(query.contains(&("past_hours", "6".to_string())));
        assert!(query.contains(&("forecast_hours", "12".to_string())));
        assert!(query.contains(&("hourly", "surface_pressure".to_string())));
    }

    #[test]
    fn rejects_bad_coordinates() {
        assert!(OpenMeteoPressureSource::new(120.0, 0.0, &PressureConfig::default()).is_err());
    }
}
