//! Provider identity, request configuration and response data

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAI,
    Anthropic,
    Gemini,
}

impl ProviderId {
    /// Default priority order used when no explicit order is configured
    pub const PRIORITY: [ProviderId; 3] = [ProviderId::OpenAI, ProviderId::Anthropic, ProviderId::Gemini];

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderId::OpenAI => "gpt-4o-mini",
            ProviderId::Anthropic => "claude-3-haiku-20240307",
            ProviderId::Gemini => "gemini-1.5-flash",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderId::OpenAI => "https://api.openai.com",
            ProviderId::Anthropic => "https://api.anthropic.com",
            ProviderId::Gemini => "https://generativelanguage.googleapis.com",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::OpenAI => write!(f, "openai"),
            ProviderId::Anthropic => write!(f, "anthropic"),
            ProviderId::Gemini => write!(f, "gemini"),
        }
    }
}

/// Request configuration for one provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ProviderId,
    pub api_key: String,
    pub model: String,
    /// Scheme and host, overridable for tests
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ProviderConfig {
    pub fn new(provider: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            max_tokens: 600,
            temperature: 0.7,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Provider response data
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub tokens_used: u32,
    pub model_used: String,
    pub response_time: Duration,
}

/// Provider performance statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_response_time_ms: u64,
    pub total_tokens: u64,
}
