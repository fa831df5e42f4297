//! Generation capability trait for dependency injection

use async_trait::async_trait;
use shared::VariantKind;

use crate::error::GenerationResult;

/// Text generation and engagement judgment behind one capability
///
/// Every call may fail or time out; callers degrade to deterministic
/// templates for generation and to a neutral 0.5 for judgment.
#[mockall::automock]
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate text for a fully rendered prompt
    async fn generate(&self, prompt: &str) -> GenerationResult<String>;

    /// Judge the engagement potential of content, in [0, 1]
    async fn judge_engagement(&self, content: &str, variant: VariantKind) -> GenerationResult<f64>;

    /// Whether any backend is configured to serve requests
    async fn is_available(&self) -> bool;
}
