//! Generation service that is permanently unavailable

use async_trait::async_trait;
use shared::VariantKind;

use crate::error::{GenerationError, GenerationResult};
use crate::traits::GenerationService;

/// Stand-in used with `--offline` or when no API keys are configured
#[derive(Debug, Clone, Default)]
pub struct OfflineGenerator;

impl OfflineGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GenerationService for OfflineGenerator {
    async fn generate(&self, _prompt: &str) -> GenerationResult<String> {
        Err(GenerationError::Unavailable {
            reason: "offline mode".to_string(),
        })
    }

    async fn judge_engagement(&self, _content: &str, _variant: VariantKind) -> GenerationResult<f64> {
        Err(GenerationError::Unavailable {
            reason: "offline mode".to_string(),
        })
    }

    async fn is_available(&self) -> bool {
        false
    }
}
