use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::air::{status_label, StationDetail};
use crate::tender::Tender;

pub const TENDER_SYSTEM_PROMPT: &str = "You are an analyst of public procurement for a large \
city. You assess tenders for execution risks and answer in plain, concise prose without \
markdown.";

pub const AIR_SYSTEM_PROMPT: &str = "You are an environmental advisor for a large city. You \
explain current air-quality readings to residents in plain, concise prose without markdown.";

const CLIMATE_CONTEXT: &str = "The city has a sharply continental climate: winters from \
November to March bring frost down to -20°C and persistent snow cover, while summers are hot \
and dry.";

const RISK_FACTORS: [&str; 5] = [
    "seasonal conditions during the execution window",
    "contract value relative to the execution period",
    "time left until the submission deadline",
    "dependence on imported goods and currency exposure",
    "supplier capacity and post-delivery support",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(system: &str, user: String) -> Self {
        Self {
            messages: vec![
                ChatMessage {
                    role: ChatRole::System,
                    content: system.to_string(),
                },
                ChatMessage {
                    role: ChatRole::User,
                    content: user,
                },
            ],
        }
    }

    pub fn user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

pub fn tender_prompt(tender: &Tender) -> ChatRequest {
    let factors = RISK_FACTORS
        .iter()
        .map(|factor| format!("- {factor}"))
        .collect::<Vec<_>>()
        .join("\n");
    let user = format!(
        "Assess the risks of the following tender.\n\n\
         Category: {category}\n\
         Amount: {amount} (currency units)\n\
         Organization: {organization}\n\
         Submission deadline: {deadline}\n\
         Execution window: {start} to {end}\n\
         Description: {description}\n\n\
         Regional context: {CLIMATE_CONTEXT}\n\n\
         Consider these risk factors:\n{factors}\n\n\
         Answer in 3-5 sentences.",
        category = tender.display_category(),
        amount = tender.amount,
        organization = tender.organization,
        deadline = tender.deadline.format("%Y-%m-%d"),
        start = tender.execution_start.format("%Y-%m-%d"),
        end = tender.execution_end.format("%Y-%m-%d"),
        description = tender.description,
    );
    ChatRequest::new(TENDER_SYSTEM_PROMPT, user)
}

pub fn air_prompt(station: &StationDetail) -> ChatRequest {
    let classification = station.classification();
    let readings = station
        .measurements
        .iter()
        .map(|m| {
            json!({
                "pollutant": m.kind.as_slug(),
                "value": m.value,
                "unit": m.unit(),
                "status": status_label(m.status()),
            })
        })
        .collect::<Vec<_>>();
    let context = json!({
        "station": station.name,
        "aqi": station.aqi,
        "aqi_category": classification.label,
        "updated_at": station.updated_at.map(|t| t.to_rfc3339()),
        "readings": readings,
    });
    let user = format!(
        "Current air-quality data:\n{context}\n\n\
         Regional context: {CLIMATE_CONTEXT}\n\n\
         Explain what these readings mean for residents and give practical advice \
         in 3-5 sentences."
    );
    ChatRequest::new(AIR_SYSTEM_PROMPT, user)
}

#[cfg(test)]
mod tests {
    use super::{air_prompt, tender_prompt, ChatRole};
    use crate::air::{Measurement, PollutantKind, StationDetail};
    use crate::tender::fixtures::tender;
    use crate::tender::TenderCategory;

    #[test]
    fn tender_prompt_embeds_scoring_inputs() {
        let mut record = tender(TenderCategory::Construction, 2_500_000_000);
        record.description = "Interchange reconstruction".to_string();
        let request = tender_prompt(&record);
        assert_eq!(request.messages[0].role, ChatRole::System);
        let user = request.user_message().expect("user message");
        assert!(user.contains("Category: Construction"));
        assert!(user.contains("Amount: 2500000000"));
        assert!(user.contains("Organization: City akimat"));
        assert!(user.contains("Execution window: 2025-05-01 to 2025-09-30"));
        assert!(user.contains("Interchange reconstruction"));
        assert!(user.contains("3-5 sentences"));
    }

    #[test]
    fn air_prompt_serializes_station_context() {
        let station = StationDetail {
            id: "1".to_string(),
            name: "Medeu".to_string(),
            aqi: Some(120.0),
            updated_at: None,
            measurements: vec![Measurement::new(PollutantKind::Pm10, 80.0, None)],
        };
        let request = air_prompt(&station);
        let user = request.user_message().expect("user message");
        assert!(user.contains("\"aqi_category\":\"Unhealthy for Sensitive Groups\""));
        assert!(user.contains("\"status\":\"poor\""));
    }
}
