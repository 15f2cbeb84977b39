//! Factory for creating the configured IntentProvider.

use std::sync::Arc;

use momfit_core::Clock;
use momfit_core::config::IntentConfig;

use crate::detector::IntentDetector;
use crate::error::IntentError;
use crate::keyword::KeywordIntentProvider;
use crate::llm::LlmIntentProvider;
use crate::provider::IntentProvider;
use tracing::warn;

/// Create an IntentProvider from the `[intent]` config section.
///
/// Supported types:
/// - `"keyword"`: local regex classifier, no network
/// - `"openai"`: OpenAI-compatible chat completions (needs the API key env var)
pub fn create_intent_provider(
    config: &IntentConfig,
    clock: Arc<dyn Clock>,
) -> Result<Box<dyn IntentProvider>, IntentError> {
    match config.provider.as_str() {
        "keyword" => Ok(Box::new(KeywordIntentProvider::new(clock))),
        "openai" => Ok(Box::new(LlmIntentProvider::from_config(config, clock)?)),
        other => Err(IntentError::Config(format!(
            "unknown intent provider: {other}"
        ))),
    }
}

/// Configured provider wrapped with the keyword fallback.
///
/// A missing API key is not fatal: the detector runs on the keyword
/// classifier alone and logs a warning.
pub fn create_intent_detector(
    config: &IntentConfig,
    clock: Arc<dyn Clock>,
) -> Result<IntentDetector, IntentError> {
    let provider = match create_intent_provider(config, clock.clone()) {
        Ok(provider) => provider,
        Err(IntentError::MissingApiKey(var)) => {
            warn!(
                provider = %config.provider,
                env = %var,
                "API key not set, using keyword intent detection"
            );
            return Ok(IntentDetector::keyword_only(clock));
        }
        Err(e) => return Err(e),
    };
    Ok(IntentDetector::new(
        provider,
        KeywordIntentProvider::new(clock),
    ))
}
