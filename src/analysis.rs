use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::narrative::{Narrative, Narrator};
use crate::risk::{RiskAssessment, RiskEngine, RiskLevel};
use crate::tender::{Tender, TenderCatalog, TenderCategory, TenderError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderAnalysis {
    pub tender: Tender,
    pub assessment: RiskAssessment,
    pub narrative: Option<Narrative>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderOverview {
    pub id: String,
    pub title: String,
    pub category: TenderCategory,
    pub amount: u64,
    pub deadline: DateTime<Utc>,
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub findings: usize,
}

/// Validate, score and optionally narrate a tender. Only validation can fail.
pub async fn analyze_tender(
    engine: &RiskEngine,
    narrator: Option<&Narrator>,
    tender: &Tender,
    now: DateTime<Utc>,
) -> Result<TenderAnalysis, TenderError> {
    tender.validate()?;
    let assessment = engine.evaluate(tender, now);
    let narrative = match narrator {
        Some(narrator) => Some(narrator.narrate(tender, &assessment).await),
        None => None,
    };
    Ok(TenderAnalysis {
        tender: tender.clone(),
        assessment,
        narrative,
    })
}

/// Score every catalog entry; highest risk first, catalog order on ties.
pub fn overview(
    engine: &RiskEngine,
    catalog: &TenderCatalog,
    now: DateTime<Utc>,
) -> Vec<TenderOverview> {
    let mut rows = catalog
        .list()
        .iter()
        .map(|tender| {
            let assessment = engine.evaluate(tender, now);
            TenderOverview {
                id: tender.id.clone(),
                title: tender.title.clone(),
                category: tender.category,
                amount: tender.amount,
                deadline: tender.deadline,
                risk_score: assessment.risk_score,
                risk_level: assessment.risk_level,
                findings: assessment.risks.len() + assessment.warnings.len(),
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| b.risk_score.cmp(&a.risk_score));
    rows
}

#[cfg(test)]
mod tests {
    use super::{analyze_tender, overview};
    use crate::narrative::{NarrativeSource, Narrator};
    use crate::risk::{RiskEngine, RiskLevel};
    use crate::tender::fixtures::{tender, utc};
    use crate::tender::{TenderCatalog, TenderCategory, TenderError};

    #[test]
    fn overview_sorts_by_score_and_keeps_catalog_order_on_ties() {
        let catalog = TenderCatalog::builtin().expect("builtin dataset");
        let rows = overview(&RiskEngine::default(), &catalog, utc(2025, 1, 1));
        assert_eq!(rows.len(), catalog.len());
        assert_eq!(rows[0].id, "T-2025-001");
        assert_eq!(rows[0].risk_level, RiskLevel::High);
        assert!(rows.windows(2).all(|w| w[0].risk_score >= w[1].risk_score));

        let zero_ids = rows
            .iter()
            .filter(|r| r.risk_score == 0)
            .map(|r| r.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(zero_ids, vec!["T-2025-002", "T-2025-003"]);
    }

    #[test]
    fn analysis_rejects_invalid_tender_before_scoring() {
        let mut record = tender(TenderCategory::It, 1);
        record.execution_end = utc(2025, 1, 1);
        let result = tokio_test::block_on(analyze_tender(
            &RiskEngine::default(),
            None,
            &record,
            utc(2025, 1, 1),
        ));
        assert!(matches!(result, Err(TenderError::InvalidTender(_))));
    }

    #[test]
    fn analysis_with_local_narrator_mirrors_summary() {
        let record = tender(TenderCategory::Construction, 2_100_000_000);
        let narrator = Narrator::local_only();
        let analysis = tokio_test::block_on(analyze_tender(
            &RiskEngine::default(),
            Some(&narrator),
            &record,
            utc(2025, 1, 1),
        ))
        .expect("valid tender");
        let narrative = analysis.narrative.expect("narrative requested");
        assert_eq!(narrative.source, NarrativeSource::Local);
        assert_eq!(narrative.text, analysis.assessment.summary);
    }
}
