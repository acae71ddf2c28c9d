use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::http::{preview, USER_AGENT};
use crate::narrative::prompt::{ChatMessage, ChatRequest};
use crate::narrative::{CompletionBackend, NarrativeError};

/// OpenAI-compatible chat completions endpoint.
pub struct ChatCompletionClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct CompletionPayload<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionClient {
    pub fn new(config: &AiConfig, api_key: String) -> Result<Self, NarrativeError> {
        let client = Self::builder(config)
            .build()
            .map_err(NarrativeError::Transport)?;
        Ok(Self::with_http_client(config, api_key, client))
    }

    /// Request and connect timeouts are always bounded.
    pub fn builder(config: &AiConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
    }

    pub fn with_http_client(config: &AiConfig, api_key: String, client: Client) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, NarrativeError> {
        let payload = CompletionPayload {
            model: &self.model,
            messages: &request.messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(NarrativeError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(NarrativeError::Transport)?;
        if !status.is_success() {
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                preview: preview(&body),
            });
        }
        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| NarrativeError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .filter_map(|choice| choice.message)
            .filter_map(|message| message.content)
            .map(|content| content.trim().to_string())
            .find(|content| !content.is_empty())
            .ok_or_else(|| NarrativeError::Malformed("completion has no content".to_string()))
    }
}
