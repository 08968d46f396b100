use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::Config;
use crate::errors::GenerationError;

const SYSTEM_PROMPT: &str = "You write warm, personal content for celebration websites. \
Respond with a single JSON object and nothing else.";

/// OpenAI chat-completions provider constrained to JSON-object output.
pub struct OpenAIProvider {
    model: String,
    temperature: f32,
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl OpenAIProvider {
    /// A missing key is not an error here; it surfaces on the first call so a
    /// server can still start and report it per request.
    pub fn from_config(cfg: &Config) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            endpoint: format!("{}/chat/completions", cfg.api_base.trim_end_matches('/')),
            api_key: cfg.resolve_api_key(),
            client,
        })
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;
    parsed
        .get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(ToOwned::to_owned)
}

#[async_trait]
impl super::Provider for OpenAIProvider {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            GenerationError::Configuration(
                "AI service is not configured: no API key is set".to_string(),
            )
        })?;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": self.temperature,
            "response_format": { "type": "json_object" }
        });

        tracing::debug!(endpoint = %self.endpoint, model = %self.model, prompt_bytes = prompt.len(), "sending generation request");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Unexpected("AI request timed out".to_string())
                } else {
                    GenerationError::Unexpected(format!("AI request failed: {e}"))
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Unexpected(format!("failed to read AI response: {e}")))?;

        tracing::debug!(%status, response_bytes = text.len(), "generation response received");

        if !status.is_success() {
            let message = extract_error_message(&text).unwrap_or_else(|| text.trim().to_string());
            return Err(GenerationError::Unexpected(format!("AI service error ({status}): {message}")));
        }

        let parsed: ChatResponse = serde_json::from_str(&text).map_err(|e| {
            GenerationError::Unexpected(format!("unrecognized AI service response: {e}"))
        })?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
