use momfit_auth::AuthError;

use crate::validation::ValidationReport;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("validation failed: {}", .0.errors.join("; "))]
    Validation(ValidationReport),

    #[error("permission denied")]
    PermissionDenied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already resolved: {0}")]
    AlreadyResolved(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("auth error: {0}")]
    Auth(AuthError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EventError {
    /// Text safe to show an end user.
    pub fn user_message(&self) -> String {
        match self {
            EventError::Validation(report) => report.errors.join("\n"),
            EventError::PermissionDenied => "You are not allowed to do that.".into(),
            EventError::NotFound(what) => format!("{what} not found"),
            EventError::AlreadyResolved(what) => format!("{what} has already been handled"),
            EventError::Auth(e) => e.user_message(),
            EventError::Database(_) | EventError::Internal(_) => {
                "Something went wrong. Please try again.".into()
            }
        }
    }
}

impl From<AuthError> for EventError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::PermissionDenied => EventError::PermissionDenied,
            other => EventError::Auth(other),
        }
    }
}

impl From<rusqlite::Error> for EventError {
    fn from(e: rusqlite::Error) -> Self {
        EventError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for EventError {
    fn from(e: serde_json::Error) -> Self {
        EventError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_shown_verbatim() {
        let err = EventError::Validation(ValidationReport {
            is_valid: false,
            errors: vec![
                "Title must be at least 3 characters".into(),
                "Capacity must be at least 1".into(),
            ],
            ..Default::default()
        });
        assert_eq!(
            err.user_message(),
            "Title must be at least 3 characters\nCapacity must be at least 1"
        );
        assert!(err.to_string().contains("; "));
    }

    #[test]
    fn auth_denial_becomes_event_denial() {
        let err: EventError = AuthError::PermissionDenied.into();
        assert!(matches!(err, EventError::PermissionDenied));

        let err: EventError = AuthError::Database("locked".into()).into();
        assert!(matches!(err, EventError::Auth(_)));
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
    }
}
