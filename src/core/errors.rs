//! Shared error types for the application

use thiserror::Error;

/// Rejections raised before any analysis begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Submitted code is empty or whitespace only
    #[error("code is empty")]
    Empty,

    /// Submitted code exceeds the configured size limit
    #[error("code is {size} bytes, which exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    /// Submitted code contains binary content
    #[error("code contains NUL bytes and does not look like source text")]
    NotText,
}

/// Main error type for perflab operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid submitted code
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    /// Internal fault while evaluating analysis rules
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Execution sandbox unavailable or orchestrator fault
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation errors for ad-hoc requests
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True when the error was caused by the submitted request rather than the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Input(_) | Self::Validation(_))
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_large_message_names_both_sizes() {
        let err = Error::from(InputError::TooLarge {
            size: 2048,
            limit: 1024,
        });
        let message = err.to_string();
        assert!(message.contains("2048"));
        assert!(message.contains("1024"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::from(InputError::Empty).is_client_error());
        assert!(Error::validation("bad test type").is_client_error());
        assert!(!Error::infrastructure("no interpreter").is_client_error());
        assert!(!Error::analysis("rule panicked").is_client_error());
    }
}
