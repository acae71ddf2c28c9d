use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::air::{AqiStatus, PollutantStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PollutantKind {
    Pm25,
    Pm10,
    No2,
    So2,
    Co,
}

impl PollutantKind {
    pub const ALL: [PollutantKind; 5] = [
        PollutantKind::Pm25,
        PollutantKind::Pm10,
        PollutantKind::No2,
        PollutantKind::So2,
        PollutantKind::Co,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Pm25 => "pm25",
            Self::Pm10 => "pm10",
            Self::No2 => "no2",
            Self::So2 => "so2",
            Self::Co => "co",
        }
    }

    /// Native unit readings of this kind are reported in.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Co => "mg/m³",
            Self::Pm25 | Self::Pm10 | Self::No2 | Self::So2 => "µg/m³",
        }
    }
}

impl Display for PollutantKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Pm25 => "PM2.5",
            Self::Pm10 => "PM10",
            Self::No2 => "NO₂",
            Self::So2 => "SO₂",
            Self::Co => "CO",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown pollutant kind: {0}")]
pub struct PollutantParseError(pub String);

impl FromStr for PollutantKind {
    type Err = PollutantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['.', '_', '-'], "");
        match normalized.as_str() {
            "pm25" => Ok(Self::Pm25),
            "pm10" => Ok(Self::Pm10),
            "no2" => Ok(Self::No2),
            "so2" => Ok(Self::So2),
            "co" => Ok(Self::Co),
            _ => Err(PollutantParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ThresholdPair {
    pub good: f64,
    pub moderate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThresholdTable {
    pub pm25: ThresholdPair,
    pub pm10: ThresholdPair,
    pub no2: ThresholdPair,
    pub so2: ThresholdPair,
    pub co: ThresholdPair,
}

impl ThresholdTable {
    pub const fn standard() -> Self {
        Self {
            pm25: ThresholdPair {
                good: 15.0,
                moderate: 35.0,
            },
            pm10: ThresholdPair {
                good: 45.0,
                moderate: 75.0,
            },
            no2: ThresholdPair {
                good: 40.0,
                moderate: 100.0,
            },
            so2: ThresholdPair {
                good: 20.0,
                moderate: 80.0,
            },
            co: ThresholdPair {
                good: 4.0,
                moderate: 10.0,
            },
        }
    }

    pub fn pair(&self, kind: PollutantKind) -> ThresholdPair {
        match kind {
            PollutantKind::Pm25 => self.pm25,
            PollutantKind::Pm10 => self.pm10,
            PollutantKind::No2 => self.no2,
            PollutantKind::So2 => self.so2,
            PollutantKind::Co => self.co,
        }
    }

    pub fn classify(&self, kind: PollutantKind, value: f64) -> PollutantStatus {
        let pair = self.pair(kind);
        if !value.is_finite() {
            PollutantStatus::Unknown
        } else if value <= pair.good {
            PollutantStatus::Good
        } else if value <= pair.moderate {
            PollutantStatus::Moderate
        } else {
            PollutantStatus::Poor
        }
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::standard()
    }
}

pub const STANDARD_THRESHOLDS: ThresholdTable = ThresholdTable::standard();

/// One band of the aggregate index. `upper` is inclusive; `None` is open-ended.
#[derive(Debug, Clone, Copy)]
pub struct AqiBand {
    pub upper: Option<f64>,
    pub status: AqiStatus,
    pub label: &'static str,
}

pub const AQI_BANDS: [AqiBand; 6] = [
    AqiBand {
        upper: Some(50.0),
        status: AqiStatus::Good,
        label: "Good",
    },
    AqiBand {
        upper: Some(100.0),
        status: AqiStatus::Moderate,
        label: "Moderate",
    },
    AqiBand {
        upper: Some(150.0),
        status: AqiStatus::UnhealthySensitive,
        label: "Unhealthy for Sensitive Groups",
    },
    AqiBand {
        upper: Some(200.0),
        status: AqiStatus::Unhealthy,
        label: "Unhealthy",
    },
    AqiBand {
        upper: Some(300.0),
        status: AqiStatus::VeryUnhealthy,
        label: "Very Unhealthy",
    },
    AqiBand {
        upper: None,
        status: AqiStatus::Hazardous,
        label: "Hazardous",
    },
];

pub const AQI_NO_DATA_LABEL: &str = "No data";

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{PollutantKind, ThresholdTable, AQI_BANDS};
    use crate::air::PollutantStatus;

    #[test]
    fn parses_pollutant_aliases() {
        assert_eq!(PollutantKind::from_str("PM2.5").unwrap(), PollutantKind::Pm25);
        assert_eq!(PollutantKind::from_str("pm2_5").unwrap(), PollutantKind::Pm25);
        assert_eq!(PollutantKind::from_str(" NO2 ").unwrap(), PollutantKind::No2);
        assert!(PollutantKind::from_str("o3").is_err());
    }

    #[test]
    fn carbon_monoxide_uses_milligrams() {
        assert_eq!(PollutantKind::Co.unit(), "mg/m³");
        assert_eq!(PollutantKind::Pm10.unit(), "µg/m³");
    }

    #[test]
    fn standard_table_matches_published_cut_points() {
        let table = ThresholdTable::standard();
        assert_eq!(table.pair(PollutantKind::Pm10).good, 45.0);
        assert_eq!(table.pair(PollutantKind::No2).moderate, 100.0);
        assert_eq!(table.pair(PollutantKind::Co).good, 4.0);
    }

    #[test]
    fn non_finite_readings_are_unknown() {
        let table = ThresholdTable::standard();
        assert_eq!(table.classify(PollutantKind::Pm25, f64::NAN), PollutantStatus::Unknown);
        assert_eq!(
            table.classify(PollutantKind::Co, f64::INFINITY),
            PollutantStatus::Unknown
        );
        assert_eq!(table.classify(PollutantKind::Pm25, 36.0), PollutantStatus::Poor);
    }

    #[test]
    fn aqi_bands_are_ascending_and_open_ended() {
        let uppers = AQI_BANDS
            .iter()
            .filter_map(|band| band.upper)
            .collect::<Vec<_>>();
        assert_eq!(uppers, vec![50.0, 100.0, 150.0, 200.0, 300.0]);
        assert!(AQI_BANDS[5].upper.is_none());
    }
}
