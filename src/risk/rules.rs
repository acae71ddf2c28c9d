use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::summary::render_summary;
use crate::risk::{
    Recommendation, RecommendationKind, RiskAssessment, RiskFinding, RiskLevel, RiskType,
    Severity,
};
use crate::tender::{Tender, TenderCategory};

const MAX_SCORE: u32 = 100;
const MILLIS_PER_DAY: f64 = 86_400_000.0;
const DAYS_PER_MONTH: f64 = 30.0;
const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Calibration data for the rule engine. Months are 0-indexed (January = 0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskRules {
    #[serde(default = "default_winter_months")]
    pub winter_months: Vec<u32>,
    #[serde(default = "default_winter_categories")]
    pub winter_categories: Vec<TenderCategory>,
    #[serde(default = "default_seasonal_points")]
    pub seasonal_points: u32,
    #[serde(default = "default_major_amount_billions")]
    pub major_amount_billions: f64,
    #[serde(default = "default_major_amount_points")]
    pub major_amount_points: u32,
    #[serde(default = "default_elevated_amount_billions")]
    pub elevated_amount_billions: f64,
    #[serde(default = "default_elevated_amount_points")]
    pub elevated_amount_points: u32,
    #[serde(default = "default_deadline_window_days")]
    pub deadline_window_days: i64,
    #[serde(default = "default_deadline_points")]
    pub deadline_points: u32,
    #[serde(default = "default_timeline_min_billions")]
    pub timeline_min_billions: f64,
    /// Expected months of work per billion of contract value.
    #[serde(default = "default_months_per_billion")]
    pub months_per_billion: f64,
    /// Share of the expected duration below which a schedule is unrealistic.
    #[serde(default = "default_timeline_slack")]
    pub timeline_slack: f64,
    #[serde(default = "default_timeline_points")]
    pub timeline_points: u32,
    #[serde(default = "default_combined_min_billions")]
    pub combined_min_billions: f64,
    #[serde(default = "default_combined_points")]
    pub combined_points: u32,
    #[serde(default = "default_medical_advisory_billions")]
    pub medical_advisory_billions: f64,
}

impl Default for RiskRules {
    fn default() -> Self {
        Self {
            winter_months: default_winter_months(),
            winter_categories: default_winter_categories(),
            seasonal_points: default_seasonal_points(),
            major_amount_billions: default_major_amount_billions(),
            major_amount_points: default_major_amount_points(),
            elevated_amount_billions: default_elevated_amount_billions(),
            elevated_amount_points: default_elevated_amount_points(),
            deadline_window_days: default_deadline_window_days(),
            deadline_points: default_deadline_points(),
            timeline_min_billions: default_timeline_min_billions(),
            months_per_billion: default_months_per_billion(),
            timeline_slack: default_timeline_slack(),
            timeline_points: default_timeline_points(),
            combined_min_billions: default_combined_min_billions(),
            combined_points: default_combined_points(),
            medical_advisory_billions: default_medical_advisory_billions(),
        }
    }
}

impl RiskRules {
    pub fn is_winter_month(&self, month0: u32) -> bool {
        self.winter_months.contains(&month0)
    }

    /// Shared trigger for the seasonal and combined rules.
    pub fn winter_exposed(&self, tender: &Tender) -> bool {
        self.winter_categories.contains(&tender.category)
            && (self.is_winter_month(tender.execution_start.month0())
                || self.is_winter_month(tender.execution_end.month0()))
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    score: u32,
    risks: Vec<RiskFinding>,
    warnings: Vec<RiskFinding>,
    recommendations: Vec<Recommendation>,
}

impl Accumulator {
    fn risk(
        &mut self,
        points: u32,
        kind: RiskType,
        severity: Severity,
        title: &str,
        description: String,
    ) {
        self.score = self.score.saturating_add(points);
        self.risks.push(RiskFinding {
            kind,
            severity,
            title: title.to_string(),
            description,
        });
    }

    fn warning(&mut self, points: u32, kind: RiskType, title: &str, description: String) {
        self.score = self.score.saturating_add(points);
        self.warnings.push(RiskFinding {
            kind,
            severity: Severity::Medium,
            title: title.to_string(),
            description,
        });
    }

    fn recommend(&mut self, kind: RecommendationKind, title: &str, description: &str) {
        self.recommendations.push(Recommendation {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        });
    }
}

/// Stateless scorer; safe to share across threads and call concurrently.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    rules: RiskRules,
}

impl RiskEngine {
    pub fn new(rules: RiskRules) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, tender: &Tender, now: DateTime<Utc>) -> RiskAssessment {
        let mut acc = Accumulator::default();
        let billions = tender.amount_billions();

        self.seasonal(tender, &mut acc);
        self.financial(billions, &mut acc);
        self.deadline(tender, now, &mut acc);
        self.timeline(tender, billions, &mut acc);
        self.combined(tender, billions, &mut acc);
        self.category(tender, billions, &mut acc);

        let risk_score = acc.score.min(MAX_SCORE) as u8;
        let risk_level = RiskLevel::from_score(risk_score);
        let summary = render_summary(tender, risk_score, risk_level, &acc.risks, &acc.warnings);

        RiskAssessment {
            risk_score,
            risk_level,
            risks: acc.risks,
            warnings: acc.warnings,
            recommendations: acc.recommendations,
            summary,
        }
    }

    fn seasonal(&self, tender: &Tender, acc: &mut Accumulator) {
        if !self.rules.winter_exposed(tender) {
            return;
        }
        let start = month_name(tender.execution_start.month0());
        let end = month_name(tender.execution_end.month0());
        acc.risk(
            self.rules.seasonal_points,
            RiskType::Seasonal,
            Severity::High,
            "Winter execution period",
            format!(
                "Works are scheduled for {start}–{end}. Low temperatures and snow cover \
                 slow earthworks, concreting and asphalt laying and raise the risk of \
                 delays and quality defects."
            ),
        );
        acc.recommend(
            RecommendationKind::Timing,
            "Shift the start of works to spring",
            "Move the execution start to April or later, or require a winter works \
             method statement with heating and curing measures.",
        );
    }

    fn financial(&self, billions: f64, acc: &mut Accumulator) {
        if billions >= self.rules.major_amount_billions {
            acc.risk(
                self.rules.major_amount_points,
                RiskType::Financial,
                Severity::High,
                "Very large contract value",
                format!(
                    "Contract value of {billions:.2} billion concentrates significant \
                     budget exposure in a single supplier."
                ),
            );
            acc.recommend(
                RecommendationKind::Control,
                "Introduce staged acceptance",
                "Split payments into milestones with independent acceptance of each \
                 stage before the next payment is released.",
            );
        } else if billions >= self.rules.elevated_amount_billions {
            acc.warning(
                self.rules.elevated_amount_points,
                RiskType::Financial,
                "Large contract value",
                format!(
                    "Contract value of {billions:.2} billion requires close monitoring \
                     of spending."
                ),
            );
        }
    }

    fn deadline(&self, tender: &Tender, now: DateTime<Utc>, acc: &mut Accumulator) {
        let days = ceil_days(tender.deadline, now);
        if days > 0 && days < self.rules.deadline_window_days {
            acc.warning(
                self.rules.deadline_points,
                RiskType::Deadline,
                "Short submission deadline",
                format!(
                    "Only {days} day(s) remain until the submission deadline, which \
                     limits competition and the quality of bids."
                ),
            );
        }
    }

    fn timeline(&self, tender: &Tender, billions: f64, acc: &mut Accumulator) {
        if tender.category != TenderCategory::Construction
            || billions < self.rules.timeline_min_billions
        {
            return;
        }
        let execution_days = ceil_days(tender.execution_end, tender.execution_start);
        let months_for_execution = execution_days as f64 / DAYS_PER_MONTH;
        let expected_months = billions * self.rules.months_per_billion;
        if months_for_execution < expected_months * self.rules.timeline_slack {
            acc.risk(
                self.rules.timeline_points,
                RiskType::Timeline,
                Severity::High,
                "Unrealistic execution timeline",
                format!(
                    "About {} month(s) are allotted for works that typically take \
                     {:.0} month(s) at this contract value.",
                    months_for_execution.round(),
                    expected_months
                ),
            );
        }
    }

    fn combined(&self, tender: &Tender, billions: f64, acc: &mut Accumulator) {
        if !self.rules.winter_exposed(tender) || billions < self.rules.combined_min_billions {
            return;
        }
        acc.risk(
            self.rules.combined_points,
            RiskType::Combined,
            Severity::Critical,
            "Large-scale works in winter",
            format!(
                "A {billions:.2} billion construction contract executed during the cold \
                 season combines schedule and financial exposure."
            ),
        );
        acc.recommend(
            RecommendationKind::Guarantee,
            "Strengthen performance guarantees",
            "Raise the performance bond and add penalty clauses for missed milestones.",
        );
    }

    fn category(&self, tender: &Tender, billions: f64, acc: &mut Accumulator) {
        match tender.category {
            TenderCategory::Medical if billions >= self.rules.medical_advisory_billions => {
                acc.warning(
                    0,
                    RiskType::Category,
                    "Import and currency exposure",
                    "Medical equipment is largely imported; exchange-rate swings can \
                     disrupt supply and pricing."
                        .to_string(),
                );
                acc.recommend(
                    RecommendationKind::Currency,
                    "Fix the currency terms",
                    "Agree a fixed exchange rate or a price adjustment clause, and check \
                     the supplier's registration and service network.",
                );
            }
            TenderCategory::It => {
                acc.recommend(
                    RecommendationKind::Support,
                    "Require long-term support",
                    "Include a warranty and technical support clause of at least two years.",
                );
            }
            _ => {}
        }
    }
}

/// Evaluate with the default calibration.
pub fn evaluate_tender(tender: &Tender, now: DateTime<Utc>) -> RiskAssessment {
    RiskEngine::default().evaluate(tender, now)
}

fn ceil_days(later: DateTime<Utc>, earlier: DateTime<Utc>) -> i64 {
    let millis = (later - earlier).num_milliseconds() as f64;
    (millis / MILLIS_PER_DAY).ceil() as i64
}

fn month_name(month0: u32) -> &'static str {
    MONTH_NAMES.get(month0 as usize).copied().unwrap_or("unknown")
}

fn default_winter_months() -> Vec<u32> {
    vec![10, 11, 0, 1, 2]
}

fn default_winter_categories() -> Vec<TenderCategory> {
    vec![TenderCategory::Construction]
}

fn default_seasonal_points() -> u32 {
    35
}

fn default_major_amount_billions() -> f64 {
    2.0
}

fn default_major_amount_points() -> u32 {
    25
}

fn default_elevated_amount_billions() -> f64 {
    1.0
}

fn default_elevated_amount_points() -> u32 {
    15
}

fn default_deadline_window_days() -> i64 {
    10
}

fn default_deadline_points() -> u32 {
    15
}

fn default_timeline_min_billions() -> f64 {
    0.5
}

fn default_months_per_billion() -> f64 {
    3.0
}

fn default_timeline_slack() -> f64 {
    0.7
}

fn default_timeline_points() -> u32 {
    20
}

fn default_combined_min_billions() -> f64 {
    1.0
}

fn default_combined_points() -> u32 {
    20
}

fn default_medical_advisory_billions() -> f64 {
    0.5
}
