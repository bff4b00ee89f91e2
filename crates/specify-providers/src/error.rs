//! Error types for model providers.

use thiserror::Error;

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Provider error types.
///
/// `RateLimit` and `ContentFiltered` are refinements of a response failure;
/// [`ProviderError::is_response_error`] is true for all three.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend could not be reached (refused, timed out, DNS, ...).
    #[error("Connection error: {0}")]
    Connection(String),

    /// Authentication error (invalid API key, etc.).
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The backend answered with an error or an unusable response.
    #[error("Response error: {0}")]
    Response(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// Content filtered (safety filters triggered).
    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    /// Missing environment variable, unknown or duplicate provider name.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration value is out of range or malformed.
    #[error("Invalid provider configuration: {0}")]
    Validation(String),
}

impl ProviderError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Create a response error.
    pub fn response(message: impl Into<String>) -> Self {
        Self::Response(message.into())
    }

    /// Create a rate limit error.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// Create a content filtered error.
    pub fn content_filtered(message: impl Into<String>) -> Self {
        Self::ContentFiltered(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the backend produced the failure, as opposed to transport,
    /// credentials, or local configuration.
    pub fn is_response_error(&self) -> bool {
        matches!(
            self,
            Self::Response(_) | Self::RateLimit { .. } | Self::ContentFiltered(_)
        )
    }

    /// Whether a caller could reasonably retry. Nothing here retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::RateLimit { .. })
    }

    /// Get retry delay in seconds if the backend suggested one.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
