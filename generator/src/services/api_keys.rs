//! Environment-based API key loading
//!
//! Keys are read from:
//! 1. A `.env` file in the current directory or a parent directory (if present)
//! 2. System environment variables
//!
//! Environment variables take precedence over `.env` values. Every provider is
//! optional; with no keys at all the caller runs in degraded template mode.
//!
//! ## Recognized Keys
//! - `OPENAI_API_KEY`
//! - `ANTHROPIC_API_KEY`
//! - `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`

use crate::types::{ProviderConfig, ProviderId};

/// Environment variables consulted per provider, first match wins
const KEY_NAMES: &[(ProviderId, &[&str])] = &[
    (ProviderId::OpenAI, &["OPENAI_API_KEY"]),
    (ProviderId::Anthropic, &["ANTHROPIC_API_KEY"]),
    (ProviderId::Gemini, &["GEMINI_API_KEY", "GOOGLE_API_KEY"]),
];

/// Load provider configurations from `.env` and the process environment
pub fn load_provider_configs() -> Vec<ProviderConfig> {
    // Missing .env is fine
    let _ = dotenv::dotenv();
    provider_configs_from(|name| std::env::var(name).ok())
}

/// Build provider configurations in priority order from a key lookup
pub fn provider_configs_from<F>(lookup: F) -> Vec<ProviderConfig>
where
    F: Fn(&str) -> Option<String>,
{
    KEY_NAMES
        .iter()
        .filter_map(|(provider, names)| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
                .map(|key| ProviderConfig::new(*provider, key.trim()))
        })
        .collect()
}
