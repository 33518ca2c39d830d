//! Error types for satsend core
//!
//! Error taxonomy for amount parsing, coin selection, fee checks and spend
//! validation.

use std::fmt;

/// Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Insufficient funds for transaction
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// No confirmed outputs available to spend
    #[error("No confirmed funds: {0}")]
    NoConfirmedFunds(String),

    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Sender and receiver are the same account or address
    #[error("Send to same address: {0}")]
    SameAddress(String),

    /// Invalid payment URI
    #[error("Invalid payment URI: {0}")]
    InvalidUri(String),

    /// Fee too low
    #[error("Fee too low: {0}")]
    FeeTooLow(String),

    /// Malformed fee schedule
    #[error("Invalid fee schedule: {0}")]
    InvalidFeeSchedule(String),

    /// Malformed unspent outputs response
    #[error("Invalid unspent outputs: {0}")]
    InvalidUnspentOutputs(String),

    /// Invalid amount
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Amount overflow
    #[error("Amount overflow: {0}")]
    AmountOverflow(String),

    /// Spending account has no usable key
    #[error("Watch-only address: {0}")]
    WatchOnly(String),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Check if error is a user-facing error (vs internal error)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::InsufficientFunds(_)
                | Error::NoConfirmedFunds(_)
                | Error::InvalidAddress(_)
                | Error::SameAddress(_)
                | Error::InvalidUri(_)
                | Error::FeeTooLow(_)
                | Error::InvalidAmount(_)
                | Error::WatchOnly(_)
                | Error::InvalidKey(_)
        )
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Error::InsufficientFunds(_) => "Insufficient funds".to_string(),
            Error::NoConfirmedFunds(_) => "No confirmed funds available to spend".to_string(),
            Error::InvalidAddress(_) | Error::InvalidUri(_) => {
                "Invalid Bitcoin address".to_string()
            }
            Error::SameAddress(_) => {
                "You cannot send to the same address you are sending from".to_string()
            }
            Error::FeeTooLow(_) => {
                "The fee is below the minimum the network will relay. Please increase the fee."
                    .to_string()
            }
            Error::InvalidAmount(_) => "Invalid amount".to_string(),
            Error::InvalidKey(_) => "Invalid private key".to_string(),
            Error::WatchOnly(_) => {
                "This address is watch-only. A private key is required to spend from it."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidAmount(_) | Error::AmountOverflow(_) => ErrorCategory::Amount,
            Error::InvalidAddress(_) | Error::SameAddress(_) | Error::InvalidUri(_) => {
                ErrorCategory::Address
            }
            Error::FeeTooLow(_) | Error::InvalidFeeSchedule(_) => ErrorCategory::Fee,
            Error::InsufficientFunds(_)
            | Error::NoConfirmedFunds(_)
            | Error::InvalidUnspentOutputs(_) => ErrorCategory::Selection,
            Error::WatchOnly(_) | Error::InvalidKey(_) => ErrorCategory::Keys,
            Error::Serialization(_) | Error::Other(_) => ErrorCategory::Internal,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Amount-related errors
    Amount,
    /// Address-related errors
    Address,
    /// Fee-related errors
    Fee,
    /// Coin selection errors
    Selection,
    /// Transaction building/broadcast errors
    Transaction,
    /// Key-related errors
    Keys,
    /// Network/API errors
    Network,
    /// Internal/system errors
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Amount => write!(f, "Amount"),
            ErrorCategory::Address => write!(f, "Address"),
            ErrorCategory::Fee => write!(f, "Fee"),
            ErrorCategory::Selection => write!(f, "Selection"),
            ErrorCategory::Transaction => write!(f, "Transaction"),
            ErrorCategory::Keys => write!(f, "Keys"),
            ErrorCategory::Network => write!(f, "Network"),
            ErrorCategory::Internal => write!(f, "Internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_detection() {
        assert!(Error::InsufficientFunds("test".to_string()).is_user_error());
        assert!(Error::SameAddress("test".to_string()).is_user_error());
        assert!(!Error::InvalidFeeSchedule("test".to_string()).is_user_error());
        assert!(!Error::Other("test".to_string()).is_user_error());
    }

    #[test]
    fn test_user_messages() {
        let msg = Error::InsufficientFunds("details".to_string()).user_message();
        assert_eq!(msg, "Insufficient funds");

        let msg = Error::InvalidUri("details".to_string()).user_message();
        assert_eq!(msg, "Invalid Bitcoin address");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::InsufficientFunds("test".to_string()).category(),
            ErrorCategory::Selection
        );
        assert_eq!(
            Error::SameAddress("test".to_string()).category(),
            ErrorCategory::Address
        );
        assert_eq!(
            Error::FeeTooLow("test".to_string()).category(),
            ErrorCategory::Fee
        );
        assert_eq!(
            Error::AmountOverflow("test".to_string()).category(),
            ErrorCategory::Amount
        );
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::Selection.to_string(), "Selection");
        assert_eq!(ErrorCategory::Internal.to_string(), "Internal");
    }
}
