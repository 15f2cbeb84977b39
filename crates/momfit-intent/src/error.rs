#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("API key not set: environment variable {0} is empty or missing")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("could not parse provider response: {0}")]
    Parse(String),

    #[error("intent configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for IntentError {
    fn from(e: serde_json::Error) -> Self {
        IntentError::Parse(e.to_string())
    }
}
