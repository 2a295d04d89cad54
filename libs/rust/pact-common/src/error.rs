//! Centralized error type for the pact crates.
//!
//! Every crate in the workspace reports failures through `PactError`, which
//! classifies errors as retryable or not so the verifier's fetch loop can
//! decide whether to try again.

use thiserror::Error;

/// Result alias used across the workspace.
pub type PactResult<T> = Result<T, PactError>;

/// Common error type for pact operations.
#[derive(Error, Debug)]
pub enum PactError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem or socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input provided by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Two pacts could not be merged
    #[error("Unable to merge pacts: {0}")]
    MergeConflict(String),

    /// The requested specification version cannot express the pact
    #[error("Unsupported pact specification: {0}")]
    UnsupportedSpecification(String),

    /// The mock server was asked for a transport it does not provide
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// Verification found mismatches
    #[error("Verification failed: {0}")]
    Mismatch(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PactError {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on retry,
    /// such as connection failures, timeouts, or temporary unavailability.
    ///
    /// # Examples
    ///
    /// ```
    /// use pact_common::PactError;
    ///
    /// let err = PactError::unavailable("broker");
    /// assert!(err.is_retryable());
    ///
    /// let err = PactError::NotFound("pact".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not-found error with the given message.
    #[must_use]
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PactError::Unavailable("test".to_string()).is_retryable());
        assert!(PactError::Timeout("test".to_string()).is_retryable());
    }

    #[test]
    fn test_non_retryable_errors() {
        assert!(!PactError::NotFound("test".to_string()).is_retryable());
        assert!(!PactError::invalid_input("test").is_retryable());
        assert!(!PactError::MergeConflict("test".to_string()).is_retryable());
        assert!(!PactError::UnsupportedTransport("grpc".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = PactError::UnsupportedTransport("https".to_string());
        assert_eq!(err.to_string(), "Unsupported transport: https");

        let err = PactError::invalid_input("Consumer name cannot be empty");
        assert_eq!(err.to_string(), "Invalid input: Consumer name cannot be empty");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PactError = io.into();
        assert!(matches!(err, PactError::Io(_)));
        assert!(!err.is_retryable());
    }
}
