use async_trait::async_trait;

use crate::error::IntentError;
use crate::types::{DetectionContext, IntentDetectionResult};

/// A backend that classifies one chat message.
///
/// Implementations return `Err` only when they could not produce an answer
/// (transport, auth, malformed output). "No intent" is a successful
/// `general_chat` result.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IntentProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn detect(
        &self,
        text: &str,
        context: &DetectionContext,
    ) -> Result<IntentDetectionResult, IntentError>;
}
