//! Error types for secret management.

use specify_core::ConfigError;
use thiserror::Error;

/// Errors that can occur during secret operations.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Bad provider name, empty value, or an unreadable credential file.
    #[error("{0}")]
    Validation(String),

    /// No value stored locally or in the environment.
    #[error("No key found for provider: {0}")]
    NotFound(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Covers both a foreign machine and a corrupted file; the two cannot be
    /// told apart from the ciphertext alone.
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Could not determine a machine identifier: {0}")]
    MachineId(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SecretError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the caller can fix this by correcting its input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the requested credential is simply absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience result alias for secret operations.
pub type Result<T> = std::result::Result<T, SecretError>;
