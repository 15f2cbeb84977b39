pub mod detector;
pub mod error;
pub mod factory;
pub mod keyword;
pub mod llm;
pub mod provider;
pub mod types;

pub use detector::IntentDetector;
pub use error::IntentError;
pub use factory::{create_intent_detector, create_intent_provider};
pub use keyword::KeywordIntentProvider;
pub use llm::LlmIntentProvider;
pub use provider::IntentProvider;
pub use types::*;
