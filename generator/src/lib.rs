//! Generation service library for the content optimization system
//!
//! This library provides the text generation and engagement judgment capability
//! backed by multiple LLM providers with priority-order fallback, plus an
//! offline implementation that always reports itself unavailable.

pub mod core;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

// Re-export main types
pub use error::{GenerationError, GenerationResult};
pub use services::{LlmGenerationService, OfflineGenerator};
pub use traits::GenerationService;
pub use types::*;
