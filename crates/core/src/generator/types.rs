// crates/core/src/generator/types.rs
//! Error type for content generation.

use thiserror::Error;

/// Errors that can occur during content generation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("Backend request failed: {0}")]
    Backend(String),

    /// The backend did not answer within the configured request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl GenerateError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    /// True when the payload itself was rejected, as opposed to the backend
    /// failing while working on a valid payload.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidPayload(_))
    }
}
