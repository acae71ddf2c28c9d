use std::str::FromStr;

use crate::air::thresholds::{PollutantKind, AQI_BANDS, AQI_NO_DATA_LABEL, STANDARD_THRESHOLDS};
use crate::air::{AqiClassification, AqiStatus, PollutantStatus};

/// Classify a raw reading by pollutant name. Unknown names yield `Unknown`.
pub fn classify_pollutant(kind: &str, value: f64) -> PollutantStatus {
    match PollutantKind::from_str(kind) {
        Ok(kind) => STANDARD_THRESHOLDS.classify(kind, value),
        Err(_) => PollutantStatus::Unknown,
    }
}

pub fn classify_aqi(aqi: Option<f64>) -> AqiClassification {
    let Some(aqi) = aqi.filter(|v| v.is_finite()) else {
        return AqiClassification {
            status: AqiStatus::Unknown,
            label: AQI_NO_DATA_LABEL.to_string(),
        };
    };
    let band = AQI_BANDS
        .iter()
        .find(|band| band.upper.map(|upper| aqi <= upper).unwrap_or(true))
        .unwrap_or(&AQI_BANDS[AQI_BANDS.len() - 1]);
    AqiClassification {
        status: band.status,
        label: band.label.to_string(),
    }
}
