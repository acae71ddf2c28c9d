use anyhow::Result;

use crate::air::StationSummary;
use crate::analysis::TenderOverview;

pub fn overview_to_csv(rows: &[TenderOverview]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "id",
        "title",
        "category",
        "amount",
        "deadline",
        "risk_score",
        "risk_level",
        "findings",
    ])?;
    for row in rows {
        writer.write_record([
            row.id.clone(),
            row.title.clone(),
            row.category.as_slug().to_string(),
            row.amount.to_string(),
            row.deadline.to_rfc3339(),
            row.risk_score.to_string(),
            format!("{:?}", row.risk_level).to_lowercase(),
            row.findings.to_string(),
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}

pub fn stations_to_csv(stations: &[StationSummary]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["id", "name", "latitude", "longitude", "aqi", "category"])?;
    for station in stations {
        writer.write_record([
            station.id.clone(),
            station.name.clone(),
            format!("{:.5}", station.latitude),
            format!("{:.5}", station.longitude),
            station.aqi.map(|v| format!("{v:.0}")).unwrap_or_default(),
            station.classification().label,
        ])?;
    }
    let data = writer.into_inner()?;
    Ok(String::from_utf8_lossy(&data).to_string())
}
