#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied")]
    PermissionDenied,

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Text safe to show an end user. Denials stay generic; infrastructure
    /// detail goes to the log, not the screen.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::NotFound(what) => format!("{what} not found"),
            AuthError::PermissionDenied => "You are not allowed to do that.".into(),
            AuthError::Duplicate(msg) | AuthError::InvalidInput(msg) => msg.clone(),
            AuthError::Database(_) | AuthError::Internal(_) => {
                "Something went wrong. Please try again.".into()
            }
        }
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        AuthError::Database(e.to_string())
    }
}
