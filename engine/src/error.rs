//! Engine-specific error types

use generator::GenerationError;
use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Storage operation failed: {operation}: {message}")]
    Storage { operation: String, message: String },

    #[error("Malformed feedback for {content_id}: {reason}")]
    MalformedFeedback { content_id: String, reason: String },

    #[error("Configuration error: {field}: {message}")]
    Configuration { field: String, message: String },

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("Shared component error: {0}")]
    Shared(#[from] SharedError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Map a rusqlite error into a storage error tagged with the failing operation
pub fn to_storage_err(operation: &str) -> impl Fn(rusqlite::Error) -> EngineError + '_ {
    move |e| EngineError::Storage {
        operation: operation.to_string(),
        message: e.to_string(),
    }
}
