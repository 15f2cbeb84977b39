use std::sync::Arc;

use tracing::{debug, warn};

use crate::keyword::KeywordIntentProvider;
use crate::provider::IntentProvider;
use crate::types::*;

/// Entry point for intent detection.
///
/// Wraps the configured provider and falls back to the keyword classifier
/// whenever it fails, so callers always get a result.
pub struct IntentDetector {
    provider: Box<dyn IntentProvider>,
    fallback: KeywordIntentProvider,
}

impl IntentDetector {
    pub fn new(provider: Box<dyn IntentProvider>, fallback: KeywordIntentProvider) -> Self {
        Self { provider, fallback }
    }

    /// Detector that only uses the keyword classifier.
    pub fn keyword_only(clock: Arc<dyn momfit_core::Clock>) -> Self {
        Self::new(
            Box::new(KeywordIntentProvider::new(clock.clone())),
            KeywordIntentProvider::new(clock),
        )
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn detect(&self, text: &str, context: &DetectionContext) -> IntentDetectionResult {
        let result = match self.provider.detect(text, context).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    error = %e,
                    "intent provider failed, using keyword fallback"
                );
                self.fallback.classify(text)
            }
        };

        debug!(
            intent = %result.intent,
            confidence = result.confidence,
            source = %result.source,
            community_id = context.community_id.as_deref().unwrap_or("-"),
            "classified message"
        );
        result
    }
}
