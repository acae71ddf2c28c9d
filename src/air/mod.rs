pub mod classify;
pub mod provider;
pub mod thresholds;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

pub use classify::{classify_aqi, classify_pollutant};
pub use provider::{AirQualityError, AirQualityProvider, BoundingBox, WaqiProvider};
pub use thresholds::{PollutantKind, ThresholdPair, ThresholdTable, STANDARD_THRESHOLDS};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollutantStatus {
    Good,
    Moderate,
    Poor,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AqiStatus {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AqiClassification {
    pub status: AqiStatus,
    pub label: String,
}

/// A single pollutant reading. Status is derived from the threshold table on
/// every read and is never stored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Measurement {
    pub kind: PollutantKind,
    pub value: f64,
    pub time: Option<DateTime<Utc>>,
}

impl Measurement {
    pub fn new(kind: PollutantKind, value: f64, time: Option<DateTime<Utc>>) -> Self {
        Self { kind, value, time }
    }

    pub fn unit(&self) -> &'static str {
        self.kind.unit()
    }

    pub fn status(&self) -> PollutantStatus {
        self.status_with(&STANDARD_THRESHOLDS)
    }

    pub fn status_with(&self, table: &ThresholdTable) -> PollutantStatus {
        table.classify(self.kind, self.value)
    }
}

impl Serialize for Measurement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Measurement", 5)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("unit", self.unit())?;
        state.serialize_field("time", &self.time)?;
        state.serialize_field("status", &self.status())?;
        state.end()
    }
}

/// Station marker from a bounds query. The AQI classification is derived on
/// serialize.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StationSummary {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub aqi: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StationSummary {
    pub fn classification(&self) -> AqiClassification {
        classify_aqi(self.aqi)
    }
}

impl Serialize for StationSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StationSummary", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("latitude", &self.latitude)?;
        state.serialize_field("longitude", &self.longitude)?;
        state.serialize_field("aqi", &self.aqi)?;
        state.serialize_field("updated_at", &self.updated_at)?;
        state.serialize_field("classification", &self.classification())?;
        state.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StationDetail {
    pub id: String,
    pub name: String,
    pub aqi: Option<f64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub measurements: Vec<Measurement>,
}

impl StationDetail {
    pub fn classification(&self) -> AqiClassification {
        classify_aqi(self.aqi)
    }

    pub fn measurement(&self, kind: PollutantKind) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.kind == kind)
    }
}

/// Plain-text description of a station used when no narrative backend answers.
pub fn summarize_station(station: &StationDetail) -> String {
    let classification = station.classification();
    let mut lines = Vec::new();
    match station.aqi {
        Some(aqi) => lines.push(format!(
            "{}: AQI {aqi:.0} ({}).",
            station.name, classification.label
        )),
        None => lines.push(format!("{}: {}.", station.name, classification.label)),
    }
    for measurement in &station.measurements {
        lines.push(format!(
            "• {} {:.1} {} ({})",
            measurement.kind,
            measurement.value,
            measurement.unit(),
            status_label(measurement.status())
        ));
    }
    lines.join("\n")
}

pub fn status_label(status: PollutantStatus) -> &'static str {
    match status {
        PollutantStatus::Good => "good",
        PollutantStatus::Moderate => "moderate",
        PollutantStatus::Poor => "poor",
        PollutantStatus::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{summarize_station, Measurement, PollutantKind, StationDetail, StationSummary};

    fn station() -> StationDetail {
        StationDetail {
            id: "8397".to_string(),
            name: "Almaty, Zhandosov".to_string(),
            aqi: Some(57.0),
            updated_at: None,
            measurements: vec![
                Measurement::new(PollutantKind::Pm25, 22.0, None),
                Measurement::new(PollutantKind::Co, 2.5, None),
            ],
        }
    }

    #[test]
    fn station_summary_serializes_classification() {
        let mut summary = StationSummary {
            id: "8397".to_string(),
            name: "Almaty, Zhandosov".to_string(),
            latitude: 43.22,
            longitude: 76.85,
            aqi: Some(57.0),
            updated_at: None,
        };
        let value = serde_json::to_value(&summary).expect("serialize summary");
        assert_eq!(value["aqi"], json!(57.0));
        assert_eq!(value["classification"]["status"], json!("moderate"));

        summary.aqi = None;
        let value = serde_json::to_value(&summary).expect("serialize summary");
        assert_eq!(value["classification"]["status"], json!("unknown"));
        assert_eq!(value["classification"]["label"], json!("No data"));

        let back: StationSummary = serde_json::from_value(value).expect("round trip");
        assert_eq!(back, summary);
    }

    #[test]
    fn measurement_serializes_derived_status_and_unit() {
        let value = serde_json::to_value(Measurement::new(PollutantKind::Pm25, 40.0, None))
            .expect("serialize measurement");
        assert_eq!(value["status"], json!("poor"));
        assert_eq!(value["unit"], json!("µg/m³"));
    }

    #[test]
    fn status_follows_value_changes() {
        let mut reading = Measurement::new(PollutantKind::No2, 10.0, None);
        assert_eq!(reading.status(), super::PollutantStatus::Good);
        reading.value = 120.0;
        assert_eq!(reading.status(), super::PollutantStatus::Poor);
    }

    #[test]
    fn station_summary_lists_each_reading() {
        let text = summarize_station(&station());
        assert!(text.starts_with("Almaty, Zhandosov: AQI 57 (Moderate)."));
        assert!(text.contains("PM2.5 22.0 µg/m³ (moderate)"));
        assert!(text.contains("CO 2.5 mg/m³ (good)"));
    }
}
