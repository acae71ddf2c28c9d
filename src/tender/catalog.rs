use std::fs;
use std::path::Path;

use tracing::info;

use crate::tender::{Tender, TenderError};

const BUILTIN_DATASET: &str = include_str!("../../data/tenders.json");

/// Read-only tender dataset, kept in source order.
#[derive(Debug, Clone, Default)]
pub struct TenderCatalog {
    tenders: Vec<Tender>,
}

impl TenderCatalog {
    pub fn builtin() -> Result<Self, TenderError> {
        Self::from_json(BUILTIN_DATASET)
    }

    pub fn load(path: &Path) -> Result<Self, TenderError> {
        let data = fs::read_to_string(path).map_err(|source| TenderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_json(&data)?;
        info!(
            "loaded {} tenders from {}",
            catalog.tenders.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// A configured path wins over the embedded dataset.
    pub fn resolve(path: Option<&Path>) -> Result<Self, TenderError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    pub fn from_json(data: &str) -> Result<Self, TenderError> {
        let tenders: Vec<Tender> = serde_json::from_str(data)?;
        Self::from_tenders(tenders)
    }

    pub fn from_tenders(tenders: Vec<Tender>) -> Result<Self, TenderError> {
        let mut seen = std::collections::BTreeSet::new();
        for tender in &tenders {
            tender.validate()?;
            if !seen.insert(tender.id.as_str()) {
                return Err(TenderError::InvalidTender(format!(
                    "duplicate tender id: {}",
                    tender.id
                )));
            }
        }
        Ok(Self { tenders })
    }

    pub fn list(&self) -> &[Tender] {
        &self.tenders
    }

    pub fn get(&self, id: &str) -> Result<&Tender, TenderError> {
        let id = id.trim();
        self.tenders
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TenderError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tenders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenders.is_empty()
    }
}
