use crate::risk::{RiskFinding, RiskLevel};
use crate::tender::Tender;

pub fn render_summary(
    tender: &Tender,
    score: u8,
    level: RiskLevel,
    risks: &[RiskFinding],
    warnings: &[RiskFinding],
) -> String {
    let mut out = format!("Risk score: {score}% ({} risk)\n\n", level.label());

    if risks.is_empty() && warnings.is_empty() {
        out.push_str("No significant risks were identified for this tender.");
        return out;
    }

    out.push_str(&format!(
        "Tender \"{}\" shows the following risk factors:",
        tender.title
    ));
    for (heading, findings) in [("Risks", risks), ("Warnings", warnings)] {
        if findings.is_empty() {
            continue;
        }
        out.push_str(&format!("\n\n{heading}:"));
        for finding in findings {
            out.push_str(&format!("\n• {}", finding.title));
        }
    }
    out
}
