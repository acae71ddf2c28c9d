use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::air::{status_label, AqiStatus, PollutantStatus, StationDetail, StationSummary};
use crate::analysis::{TenderAnalysis, TenderOverview};
use crate::risk::{RiskAssessment, RiskLevel, Severity};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn level_cell(level: RiskLevel) -> Cell {
    let color = match level {
        RiskLevel::Low => Color::Green,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::High => Color::Red,
    };
    Cell::new(level.label()).fg(color)
}

fn severity_cell(severity: Severity) -> Cell {
    let (label, color) = match severity {
        Severity::Medium => ("MEDIUM", Color::Yellow),
        Severity::High => ("HIGH", Color::Red),
        Severity::Critical => ("CRITICAL", Color::Magenta),
    };
    Cell::new(label).fg(color)
}

fn aqi_cell(status: AqiStatus, label: &str) -> Cell {
    let color = match status {
        AqiStatus::Good => Color::Green,
        AqiStatus::Moderate => Color::Yellow,
        AqiStatus::UnhealthySensitive | AqiStatus::Unhealthy => Color::Red,
        AqiStatus::VeryUnhealthy | AqiStatus::Hazardous => Color::Magenta,
        AqiStatus::Unknown => Color::Grey,
    };
    Cell::new(label).fg(color)
}

pub fn render_overview_table(rows: &[TenderOverview]) -> String {
    let mut table = new_table();
    table.set_header(vec![
        "ID", "Title", "Category", "Amount", "Deadline", "Score", "Level", "Findings",
    ]);
    for row in rows {
        table.add_row(Row::from(vec![
            Cell::new(&row.id),
            Cell::new(&row.title),
            Cell::new(row.category.to_string()),
            Cell::new(format_amount(row.amount)),
            Cell::new(row.deadline.format("%Y-%m-%d")),
            Cell::new(format!("{}%", row.risk_score)),
            level_cell(row.risk_level),
            Cell::new(row.findings),
        ]));
    }
    table.to_string()
}

pub fn render_assessment_table(assessment: &RiskAssessment) -> String {
    let mut table = new_table();
    table.set_header(vec!["Kind", "Type", "Severity", "Title", "Details"]);
    for (label, findings) in [("Risk", &assessment.risks), ("Warning", &assessment.warnings)] {
        for finding in findings {
            table.add_row(Row::from(vec![
                Cell::new(label),
                Cell::new(format!("{:?}", finding.kind).to_lowercase()),
                severity_cell(finding.severity),
                Cell::new(&finding.title),
                Cell::new(&finding.description),
            ]));
        }
    }
    for recommendation in &assessment.recommendations {
        table.add_row(vec![
            "Recommendation".to_string(),
            format!("{:?}", recommendation.kind).to_lowercase(),
            "-".to_string(),
            recommendation.title.clone(),
            recommendation.description.clone(),
        ]);
    }
    format!(
        "Risk score: {}% ({})\n{}",
        assessment.risk_score,
        assessment.risk_level.label(),
        table
    )
}

pub fn render_analysis(analysis: &TenderAnalysis) -> String {
    let mut out = format!(
        "{}: {}\n{}",
        analysis.tender.id,
        analysis.tender.title,
        render_assessment_table(&analysis.assessment)
    );
    if let Some(narrative) = &analysis.narrative {
        out.push_str(&format!(
            "\n\nNarrative ({:?}):\n{}",
            narrative.source, narrative.text
        ));
    }
    out
}

pub fn render_stations_table(stations: &[StationSummary]) -> String {
    let mut table = new_table();
    table.set_header(vec!["ID", "Name", "Lat", "Lon", "AQI", "Category", "Updated"]);
    for station in stations {
        let classification = station.classification();
        table.add_row(Row::from(vec![
            Cell::new(&station.id),
            Cell::new(&station.name),
            Cell::new(format!("{:.4}", station.latitude)),
            Cell::new(format!("{:.4}", station.longitude)),
            Cell::new(
                station
                    .aqi
                    .map(|v| format!("{v:.0}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            aqi_cell(classification.status, &classification.label),
            Cell::new(
                station
                    .updated_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]));
    }
    table.to_string()
}

pub fn render_station_table(station: &StationDetail) -> String {
    let classification = station.classification();
    let mut table = new_table();
    table.set_header(vec!["Pollutant", "Value", "Unit", "Status"]);
    for measurement in &station.measurements {
        let status = measurement.status();
        let color = match status {
            PollutantStatus::Good => Color::Green,
            PollutantStatus::Moderate => Color::Yellow,
            PollutantStatus::Poor => Color::Red,
            PollutantStatus::Unknown => Color::Grey,
        };
        table.add_row(Row::from(vec![
            Cell::new(measurement.kind.to_string()),
            Cell::new(format!("{:.1}", measurement.value)),
            Cell::new(measurement.unit()),
            Cell::new(status_label(status)).fg(color),
        ]));
    }
    let aqi = station
        .aqi
        .map(|v| format!("{v:.0}"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} (#{}): AQI {aqi} ({})\n{}",
        station.name, station.id, classification.label, table
    )
}

pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{format_amount, render_assessment_table};
    use crate::risk::evaluate_tender;
    use crate::tender::fixtures::{tender, utc};
    use crate::tender::TenderCategory;

    #[test]
    fn groups_amount_digits() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(2_500_000_000), "2 500 000 000");
    }

    #[test]
    fn assessment_table_lists_findings_and_recommendations() {
        let record = tender(TenderCategory::Other, 2_200_000_000);
        let rendered = render_assessment_table(&evaluate_tender(&record, utc(2025, 1, 1)));
        assert!(rendered.starts_with("Risk score: 25% (Low)"));
        assert!(rendered.contains("Very large contract value"));
        assert!(rendered.contains("Introduce staged acceptance"));
    }
}
