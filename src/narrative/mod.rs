pub mod client;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::air::{summarize_station, StationDetail};
use crate::config::AiConfig;
use crate::narrative::client::ChatCompletionClient;
use crate::narrative::prompt::{air_prompt, tender_prompt, ChatRequest};
use crate::risk::RiskAssessment;
use crate::tender::Tender;

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("narrative endpoint returned {status}: {preview}")]
    Status { status: u16, preview: String },
    #[error("narrative request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("malformed narrative response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: &ChatRequest) -> Result<String, NarrativeError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    Ai,
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Narrative {
    pub text: String,
    pub source: NarrativeSource,
}

impl Narrative {
    pub fn local(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: NarrativeSource::Local,
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: NarrativeSource::Ai,
        }
    }
}

/// Produces explanatory text. Tries the configured backend once and falls back
/// to deterministic local text on any failure.
#[derive(Clone, Default)]
pub struct Narrator {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl Narrator {
    pub fn local_only() -> Self {
        Self { backend: None }
    }

    pub fn with_backend(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn from_config(config: &AiConfig) -> Result<Self, NarrativeError> {
        let Some(api_key) = config.resolved_api_key() else {
            info!("no AI credential configured; narratives use local summaries");
            return Ok(Self::local_only());
        };
        let client = ChatCompletionClient::new(config, api_key)?;
        Ok(Self::with_backend(Arc::new(client)))
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn narrate(&self, tender: &Tender, assessment: &RiskAssessment) -> Narrative {
        self.run(tender_prompt(tender), &tender.id, || assessment.summary.clone())
            .await
    }

    pub async fn narrate_air(&self, station: &StationDetail) -> Narrative {
        self.run(air_prompt(station), &station.id, || summarize_station(station))
            .await
    }

    async fn run<F>(&self, request: ChatRequest, subject: &str, local: F) -> Narrative
    where
        F: FnOnce() -> String,
    {
        let Some(backend) = &self.backend else {
            return Narrative::local(local());
        };
        match backend.complete(&request).await {
            Ok(text) => {
                debug!("narrative for {subject} produced by {}", backend.name());
                Narrative::ai(text)
            }
            Err(err) => {
                warn!("narrative backend failed for {subject}, using local text: {err}");
                Narrative::local(local())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::{CompletionBackend, NarrativeError, NarrativeSource, Narrator};
    use crate::air::{Measurement, PollutantKind, StationDetail};
    use crate::config::AiConfig;
    use crate::narrative::prompt::ChatRequest;
    use crate::risk::evaluate_tender;
    use crate::tender::fixtures::{tender, utc};
    use crate::tender::TenderCategory;

    struct FailingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        async fn complete(&self, _request: &ChatRequest) -> Result<String, NarrativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(NarrativeError::Malformed("forced failure".to_string()))
        }
    }

    #[test]
    fn failed_call_returns_engine_summary_once() {
        let backend = Arc::new(FailingBackend {
            calls: AtomicUsize::new(0),
        });
        let narrator = Narrator::with_backend(backend.clone());
        let record = tender(TenderCategory::Medical, 900_000_000);
        let assessment = evaluate_tender(&record, utc(2025, 1, 1));

        let narrative = tokio_test::block_on(narrator.narrate(&record, &assessment));
        assert_eq!(narrative.source, NarrativeSource::Local);
        assert_eq!(narrative.text, assessment.summary);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1, "no retry");
    }

    #[test]
    fn missing_credential_is_local_only() {
        let config = AiConfig {
            api_key: String::new(),
            api_key_env: "TENDER_ORACLE_TEST_UNSET_KEY".to_string(),
            ..AiConfig::default()
        };
        let narrator = Narrator::from_config(&config).expect("local narrator");
        assert!(!narrator.has_backend());

        let record = tender(TenderCategory::It, 1);
        let assessment = evaluate_tender(&record, utc(2025, 1, 1));
        let narrative = tokio_test::block_on(narrator.narrate(&record, &assessment));
        assert_eq!(narrative.source, NarrativeSource::Local);
        assert_eq!(narrative.text, assessment.summary);
    }

    #[test]
    fn air_fallback_uses_station_summary() {
        let narrator = Narrator::with_backend(Arc::new(FailingBackend {
            calls: AtomicUsize::new(0),
        }));
        let station = StationDetail {
            id: "42".to_string(),
            name: "Medeu".to_string(),
            aqi: None,
            updated_at: None,
            measurements: vec![Measurement::new(PollutantKind::So2, 5.0, None)],
        };
        let narrative = tokio_test::block_on(narrator.narrate_air(&station));
        assert_eq!(narrative.source, NarrativeSource::Local);
        assert_eq!(narrative.text, "Medeu: No data.\n• SO₂ 5.0 µg/m³ (good)");
    }
}
