//! Service implementations for the generation capability

pub mod api_keys;
pub mod offline;
pub mod provider_router;

#[cfg(test)]
mod tests;

pub use api_keys::{load_provider_configs, provider_configs_from};
pub use offline::OfflineGenerator;
pub use provider_router::LlmGenerationService;
