pub mod catalog;

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use catalog::TenderCatalog;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TenderCategory {
    Construction,
    Medical,
    It,
    Transport,
    Education,
    #[serde(other)]
    Other,
}

impl TenderCategory {
    pub const ALL: [TenderCategory; 6] = [
        TenderCategory::Construction,
        TenderCategory::Medical,
        TenderCategory::It,
        TenderCategory::Transport,
        TenderCategory::Education,
        TenderCategory::Other,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::Medical => "medical",
            Self::It => "it",
            Self::Transport => "transport",
            Self::Education => "education",
            Self::Other => "other",
        }
    }
}

impl Display for TenderCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Construction => "Construction",
            Self::Medical => "Medical",
            Self::It => "IT",
            Self::Transport => "Transport",
            Self::Education => "Education",
            Self::Other => "Other",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown tender category: {0}")]
pub struct CategoryParseError(pub String);

impl FromStr for TenderCategory {
    type Err = CategoryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "construction" | "build" => Ok(Self::Construction),
            "medical" | "medicine" | "healthcare" => Ok(Self::Medical),
            "it" | "software" => Ok(Self::It),
            "transport" => Ok(Self::Transport),
            "education" => Ok(Self::Education),
            "other" => Ok(Self::Other),
            _ => Err(CategoryParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum TenderError {
    #[error("invalid tender: {0}")]
    InvalidTender(String),
    #[error("tender not found: {0}")]
    NotFound(String),
    #[error("tender dataset is malformed: {0}")]
    Dataset(#[from] serde_json::Error),
    #[error("failed reading tender dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A procurement record. Only `category`, `amount` and the three timestamps
/// feed the risk rules; the rest is display data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tender {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organization: String,
    pub category: TenderCategory,
    #[serde(default)]
    pub category_name: String,
    pub amount: u64,
    pub execution_start: DateTime<Utc>,
    pub execution_end: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
}

impl Tender {
    pub fn validate(&self) -> Result<(), TenderError> {
        if self.id.trim().is_empty() {
            return Err(TenderError::InvalidTender("id must not be empty".to_string()));
        }
        if self.execution_start > self.execution_end {
            return Err(TenderError::InvalidTender(format!(
                "tender {} starts execution ({}) after it ends ({})",
                self.id,
                self.execution_start.to_rfc3339(),
                self.execution_end.to_rfc3339()
            )));
        }
        Ok(())
    }

    pub fn amount_billions(&self) -> f64 {
        self.amount as f64 / 1e9
    }

    pub fn display_category(&self) -> String {
        if self.category_name.trim().is_empty() {
            self.category.to_string()
        } else {
            self.category_name.clone()
        }
    }
}


#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::fixtures::{tender, utc};
    use super::{TenderCategory, TenderError};

    #[test]
    fn unknown_category_deserializes_as_other() {
        let parsed: TenderCategory = serde_json::from_str("\"furniture\"").expect("parse");
        assert_eq!(parsed, TenderCategory::Other);
        let parsed: TenderCategory = serde_json::from_str("\"it\"").expect("parse");
        assert_eq!(parsed, TenderCategory::It);
        assert!(TenderCategory::from_str("furniture").is_err());
    }

    #[test]
    fn rejects_execution_window_that_ends_before_it_starts() {
        let mut record = tender(TenderCategory::Construction, 10);
        record.execution_start = utc(2025, 6, 1);
        record.execution_end = utc(2025, 5, 1);
        assert!(matches!(record.validate(), Err(TenderError::InvalidTender(_))));
    }

    #[test]
    fn negative_amount_is_rejected_at_deserialization() {
        let raw = serde_json::json!({
            "id": "T-1",
            "title": "Bad",
            "category": "it",
            "amount": -5,
            "execution_start": "2025-05-01T00:00:00Z",
            "execution_end": "2025-06-01T00:00:00Z",
            "deadline": "2025-04-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<super::Tender>(raw).is_err());
    }

    #[test]
    fn display_category_prefers_dataset_label() {
        let mut record = tender(TenderCategory::Medical, 10);
        assert_eq!(record.display_category(), "Medical");
        record.category_name = "Medical equipment".to_string();
        assert_eq!(record.display_category(), "Medical equipment");
    }
}
