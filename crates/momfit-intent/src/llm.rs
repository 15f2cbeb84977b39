use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use momfit_core::Clock;
use momfit_core::config::IntentConfig;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::IntentError;
use crate::provider::IntentProvider;
use crate::types::*;

const SYSTEM_PROMPT: &str = "You classify messages posted in a parents' fitness community chat. \
Reply with a JSON object: {\"intent\": one of \"create_event\", \"schedule_poll\", \
\"admin_alert\", \"general_chat\"; \"confidence\": number between 0 and 1; \"entities\": \
{\"title\", \"description\", \"date\" (YYYY-MM-DD), \"time\" (HH:MM, 24h), \"location\", \
\"duration_minutes\", \"capacity\", \"tags\", \"is_online\", \"meeting_url\"}}. \
Omit entities you cannot find.";

/// Classifier backed by an OpenAI-compatible chat-completions endpoint.
pub struct LlmIntentProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LlmIntentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmIntentProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl LlmIntentProvider {
    /// Build from config, reading the API key from the environment variable
    /// named by `api_key_env`.
    pub fn from_config(config: &IntentConfig, clock: Arc<dyn Clock>) -> Result<Self, IntentError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| IntentError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key, clock)
    }

    pub fn new(
        config: &IntentConfig,
        api_key: String,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, IntentError> {
        if config.endpoint.trim().is_empty() {
            return Err(IntentError::Config("intent.endpoint is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            clock,
        })
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        let today = self.clock.today().format("%Y-%m-%d");
        json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": format!("{SYSTEM_PROMPT} Today is {today}.") },
                { "role": "user", "content": text },
            ],
        })
    }
}

#[async_trait]
impl IntentProvider for LlmIntentProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn detect(
        &self,
        text: &str,
        _context: &DetectionContext,
    ) -> Result<IntentDetectionResult, IntentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntentError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| IntentError::Parse("completion has no content".into()))?;

        debug!(model = %self.model, "received classification");
        parse_classification(&content)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    entities: ExtractedEntities,
}

/// Parse the model's JSON answer. Confidence is clamped and unknown intent
/// labels become `general_chat`.
pub fn parse_classification(content: &str) -> Result<IntentDetectionResult, IntentError> {
    let raw: RawClassification = serde_json::from_str(strip_code_fence(content))?;
    Ok(IntentDetectionResult::new(
        Intent::from_label(&raw.intent),
        raw.confidence,
        raw.entities,
        DetectionSource::Llm,
    ))
}

/// Some models wrap JSON in a Markdown fence even in JSON mode.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
