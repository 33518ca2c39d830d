//! Error types

use satsend_core::ErrorCategory;

/// Send service errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Send-flow rule or parsing error
    #[error(transparent)]
    Core(#[from] satsend_core::Error),

    /// HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected API response
    #[error("API error: {0}")]
    Api(String),

    /// Operation not allowed in the current flow state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Second password did not match
    #[error("Invalid second password")]
    InvalidPassword,

    /// Payment construction or broadcast failed
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Check if error should be shown to the user
    pub fn is_user_error(&self) -> bool {
        match self {
            Error::Core(e) => e.is_user_error(),
            Error::Submission(_) | Error::InvalidPassword => true,
            _ => false,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::Core(e) => e.user_message(),
            Error::Submission(_) => "Transaction failed".to_string(),
            Error::Network(_) | Error::Api(_) => {
                "Unable to reach the server. Please try again.".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Core(e) => e.category(),
            Error::Network(_) | Error::Api(_) => ErrorCategory::Network,
            Error::Submission(_) => ErrorCategory::Transaction,
            Error::InvalidPassword => ErrorCategory::Keys,
            Error::InvalidState(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorCategory::Internal,
        }
    }
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_pass_through() {
        let err: Error = satsend_core::Error::SameAddress("xpub".to_string()).into();
        assert!(err.is_user_error());
        assert_eq!(err.category(), ErrorCategory::Address);
        assert_eq!(
            err.user_message(),
            "You cannot send to the same address you are sending from"
        );
    }

    #[test]
    fn test_submission_is_user_facing() {
        let err = Error::Submission("broadcast rejected".to_string());
        assert!(err.is_user_error());
        assert_eq!(err.user_message(), "Transaction failed");
        assert_eq!(err.category(), ErrorCategory::Transaction);
    }

    #[test]
    fn test_network_errors_are_internal() {
        let err = Error::Network("timeout".to_string());
        assert!(!err.is_user_error());
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(!Error::InvalidState("idle".to_string()).is_user_error());
    }
}
