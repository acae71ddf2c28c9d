use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::air::{Measurement, PollutantKind, StationDetail, StationSummary};
use crate::config::AirQualityConfig;
use crate::http::{
    fetch_json, number_from_paths, object_get_case_insensitive, string_from_paths, to_f64,
    FetchError,
};

#[derive(Debug, Error)]
pub enum AirQualityError {
    #[error("air-quality data unavailable: {0}")]
    Upstream(String),
    #[error("station not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Transport(#[from] FetchError),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self, BoundsParseError> {
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(BoundsParseError(format!(
                "latitude out of range: {south},{north}"
            )));
        }
        if south >= north || west >= east {
            return Err(BoundsParseError(format!(
                "inverted bounding box: {south},{west},{north},{east}"
            )));
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    pub fn as_latlng(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_latlng())
    }
}

#[derive(Debug, Error)]
#[error("invalid bounding box: {0}")]
pub struct BoundsParseError(pub String);

impl FromStr for BoundingBox {
    type Err = BoundsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|piece| piece.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| BoundsParseError(s.to_string()))?;
        let [south, west, north, east] = parts.as_slice() else {
            return Err(BoundsParseError(format!(
                "expected south,west,north,east but got {s}"
            )));
        };
        Self::new(*south, *west, *north, *east)
    }
}

#[async_trait]
pub trait AirQualityProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn stations(&self, bounds: &BoundingBox) -> Result<Vec<StationSummary>, AirQualityError>;
    async fn station(&self, id: &str) -> Result<StationDetail, AirQualityError>;
}

/// Client for a WAQI-shaped upstream (`/map/bounds` and `/feed/@{uid}`).
#[derive(Debug, Clone)]
pub struct WaqiProvider {
    base_url: String,
    token: Option<String>,
}

impl WaqiProvider {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn from_config(config: &AirQualityConfig) -> Self {
        Self::new(config.base_url.clone(), config.resolved_token())
    }

    fn token(&self) -> Result<&str, AirQualityError> {
        self.token.as_deref().ok_or_else(|| {
            AirQualityError::Upstream("no air-quality API token configured".to_string())
        })
    }
}

#[async_trait]
impl AirQualityProvider for WaqiProvider {
    fn name(&self) -> &str {
        "waqi"
    }

    async fn stations(&self, bounds: &BoundingBox) -> Result<Vec<StationSummary>, AirQualityError> {
        let token = self.token()?;
        let url = format!(
            "{}/map/bounds/?latlng={}&token={token}",
            self.base_url,
            bounds.as_latlng()
        );
        debug!("fetching stations within {bounds}");
        let payload = fetch_json(&url, "map/bounds").await?;
        let data = ok_data(&payload)?;
        let stations = parse_stations(data);
        if stations.is_empty() {
            warn!("upstream returned no stations within {bounds}");
        }
        Ok(stations)
    }

    async fn station(&self, id: &str) -> Result<StationDetail, AirQualityError> {
        let trimmed = id.trim().trim_start_matches('@');
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AirQualityError::NotFound(id.to_string()));
        }
        let token = self.token()?;
        let url = format!("{}/feed/@{trimmed}/?token={token}", self.base_url);
        let payload = fetch_json(&url, "feed").await?;
        let data = match ok_data(&payload) {
            Ok(data) => data,
            Err(AirQualityError::Upstream(message))
                if message.to_ascii_lowercase().contains("unknown station") =>
            {
                return Err(AirQualityError::NotFound(trimmed.to_string()));
            }
            Err(other) => return Err(other),
        };
        parse_station_detail(data, trimmed)
    }
}

/// Unwrap the `{status, data}` envelope the upstream puts around every body.
pub fn ok_data(payload: &Value) -> Result<&Value, AirQualityError> {
    let Some(object) = payload.as_object() else {
        return Err(AirQualityError::Upstream(
            "response is not a JSON object".to_string(),
        ));
    };
    let status = object
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let data = object.get("data").unwrap_or(&Value::Null);
    if status.eq_ignore_ascii_case("ok") {
        return Ok(data);
    }
    let message = data
        .as_str()
        .or_else(|| object.get("message").and_then(Value::as_str))
        .unwrap_or("upstream reported an error");
    Err(AirQualityError::Upstream(message.to_string()))
}

pub fn parse_stations(data: &Value) -> Vec<StationSummary> {
    let Some(entries) = data.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(Value::as_object)
        .filter_map(parse_station_entry)
        .collect()
}

fn parse_station_entry(object: &Map<String, Value>) -> Option<StationSummary> {
    let id = string_from_paths(object, &["uid", "idx", "id"])?;
    let latitude = number_from_paths(object, &["lat"])?;
    let longitude = number_from_paths(object, &["lon", "lng"])?;
    let name = string_from_paths(object, &["station.name", "name"]).unwrap_or_else(|| id.clone());
    Some(StationSummary {
        id,
        name,
        latitude,
        longitude,
        aqi: object.get("aqi").and_then(to_f64),
        updated_at: string_from_paths(object, &["station.time", "time"])
            .as_deref()
            .and_then(parse_timestamp),
    })
}

pub fn parse_station_detail(data: &Value, id: &str) -> Result<StationDetail, AirQualityError> {
    let Some(object) = data.as_object() else {
        return Err(AirQualityError::Upstream(format!(
            "station {id} returned no data object"
        )));
    };
    let updated_at = string_from_paths(object, &["time.iso", "time.s"])
        .as_deref()
        .and_then(parse_timestamp);
    let name = string_from_paths(object, &["city.name", "name"]).unwrap_or_else(|| id.to_string());

    let mut latest: BTreeMap<PollutantKind, (f64, Option<DateTime<Utc>>)> = BTreeMap::new();
    if let Some(iaqi) = object_get_case_insensitive(object, "iaqi").and_then(Value::as_object) {
        for (key, reading) in iaqi {
            let Ok(kind) = PollutantKind::from_str(key) else {
                continue;
            };
            if let Some((value, time)) = latest_reading(reading) {
                latest.insert(kind, (value, time.or(updated_at)));
            }
        }
    }

    Ok(StationDetail {
        id: string_from_paths(object, &["idx", "uid"]).unwrap_or_else(|| id.to_string()),
        name,
        aqi: object.get("aqi").and_then(to_f64),
        updated_at,
        measurements: latest
            .into_iter()
            .map(|(kind, (value, time))| Measurement::new(kind, value, time))
            .collect(),
    })
}

/// Accepts a single `{v}` reading or a series of `{v, time}` readings and
/// returns the most recent one.
fn latest_reading(reading: &Value) -> Option<(f64, Option<DateTime<Utc>>)> {
    match reading {
        Value::Array(series) => {
            let mut best: Option<(f64, Option<DateTime<Utc>>)> = None;
            for point in series {
                let Some((value, time)) = latest_reading(point) else {
                    continue;
                };
                let newer = match (&best, time) {
                    (None, _) => true,
                    (Some((_, Some(prev))), Some(t)) => t >= *prev,
                    (Some((_, None)), _) => true,
                    (Some((_, Some(_))), None) => false,
                };
                if newer {
                    best = Some((value, time));
                }
            }
            best
        }
        Value::Object(point) => {
            let value = number_from_paths(point, &["v", "value"])?;
            let time = string_from_paths(point, &["time", "t", "day"])
                .as_deref()
                .and_then(parse_timestamp);
            Some((value, time))
        }
        other => to_f64(other).map(|value| (value, None)),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
