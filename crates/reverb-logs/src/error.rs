//! Error types for the log query engine.

use thiserror::Error;

/// Errors that can occur while building or executing a log query.
#[derive(Debug, Error)]
pub enum LogError {
    /// User input was malformed (bad timestamp pair, cursor, enum value).
    #[error("{0}")]
    Validation(String),

    /// The requested page or resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The document store could not be reached or failed a query.
    #[error("store error: {0}")]
    Store(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LogError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Returns true if this error was caused by caller input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for log query operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = LogError::validation("startTime and endTime must be provided together and be valid");
        assert_eq!(
            err.to_string(),
            "startTime and endTime must be provided together and be valid"
        );

        let err = LogError::NotFound("Page not found".to_string());
        assert_eq!(err.to_string(), "Page not found");

        let err = LogError::store("connection refused");
        assert_eq!(err.to_string(), "store error: connection refused");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogError>();
    }

    #[test]
    fn validation_predicate() {
        assert!(LogError::validation("bad").is_validation());
        assert!(!LogError::store("down").is_validation());
        assert!(!LogError::NotFound("gone".into()).is_validation());
    }

    #[test]
    fn serde_error_conversion() {
        let serde_err = serde_json::from_str::<i32>("nope").unwrap_err();
        let err: LogError = serde_err.into();
        assert!(err.to_string().starts_with("serialization error"));
    }
}
