//! Generation error types

use thiserror::Error;

/// Result type for generation operations
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Generation error types
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Provider request failed: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Missing API key for provider: {provider}")]
    MissingApiKey { provider: String },

    #[error("Invalid provider response: {message}")]
    InvalidResponse { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GenerationError {
    /// True if the caller should fall back rather than retry with the same provider
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            GenerationError::Unavailable { .. } | GenerationError::MissingApiKey { .. }
        )
    }
}
