//! External language model seam.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::instrument;

use crate::error::ModelError;
use crate::prompt::Prompt;

/// Text-in/text-out model call.
///
/// One call per cache miss. Implementations own their own timeouts; callers
/// add no retry or backoff.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    fn model_id(&self) -> &str;

    async fn complete(&self, prompt: &Prompt) -> Result<String, ModelError>;
}

/// Settings for the HTTP model client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 1024,
        }
    }
}

/// Anthropic Messages API client.
pub struct AnthropicModel {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicModel {
    pub fn new(config: ModelConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key: config.api_key,
            model: config.model,
            max_tokens: config.max_tokens,
        })
    }

    fn extract_text(body: &serde_json::Value) -> Result<String, ModelError> {
        let text: String = body
            .get("content")
            .and_then(|c| c.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter(|p| p["type"] == "text")
                    .filter_map(|p| p["text"].as_str())
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, prompt: &Prompt) -> Result<String, ModelError> {
        let payload = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": prompt.system,
            "messages": [
                { "role": "user", "content": prompt.user }
            ]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout
                } else {
                    ModelError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout
            } else {
                ModelError::Transport(e.to_string())
            }
        })?;

        Self::extract_text(&body)
    }
}

/// Stand-in used when no API key is configured; every call fails.
#[derive(Debug, Default, Copy, Clone)]
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn model_id(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &Prompt) -> Result<String, ModelError> {
        Err(ModelError::NotConfigured)
    }
}
