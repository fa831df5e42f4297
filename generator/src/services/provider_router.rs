//! LLM-backed generation service with priority-order provider fallback

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use shared::{component_debug, component_warn, ComponentId, VariantKind};
use tokio::sync::RwLock;

use crate::core::{judgment_prompt, parse_judgment_score};
use crate::error::{GenerationError, GenerationResult};
use crate::services::api_keys::load_provider_configs;
use crate::traits::GenerationService;
use crate::types::{ProviderConfig, ProviderId, ProviderResponse, ProviderStats};

/// Real generation service routing requests to configured providers
///
/// Providers are tried in the order they were configured; the first
/// successful response wins. Per-provider statistics are kept for reporting.
pub struct LlmGenerationService {
    providers: Vec<ProviderConfig>,
    client: reqwest::Client,
    request_timeout: Duration,
    stats: Arc<RwLock<HashMap<ProviderId, ProviderStats>>>,
}

impl LlmGenerationService {
    /// Create a service over explicit provider configurations
    pub fn new(providers: Vec<ProviderConfig>, request_timeout: Duration) -> GenerationResult<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            providers,
            client,
            request_timeout,
            stats: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Create a service from API keys found in `.env` and the environment
    pub fn from_env(request_timeout: Duration) -> GenerationResult<Self> {
        Self::new(load_provider_configs(), request_timeout)
    }

    /// Providers in the order they are tried
    pub fn providers(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|config| config.provider).collect()
    }

    /// Snapshot of per-provider statistics
    pub async fn provider_stats(&self) -> HashMap<ProviderId, ProviderStats> {
        self.stats.read().await.clone()
    }

    async fn record(&self, provider: ProviderId, outcome: &GenerationResult<ProviderResponse>) {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(provider).or_default();
        entry.total_requests += 1;
        match outcome {
            Ok(response) => {
                entry.successful_requests += 1;
                entry.total_response_time_ms += response.response_time.as_millis() as u64;
                entry.total_tokens += u64::from(response.tokens_used);
            }
            Err(_) => entry.failed_requests += 1,
        }
    }

    async fn request(&self, config: &ProviderConfig, prompt: &str) -> GenerationResult<ProviderResponse> {
        let started = Instant::now();
        let (url, body) = match config.provider {
            ProviderId::OpenAI => (
                format!("{}/v1/chat/completions", config.base_url),
                serde_json::json!({
                    "model": config.model,
                    "messages": [{ "role": "user", "content": prompt }],
                    "max_tokens": config.max_tokens,
                    "temperature": config.temperature
                }),
            ),
            ProviderId::Anthropic => (
                format!("{}/v1/messages", config.base_url),
                serde_json::json!({
                    "model": config.model,
                    "max_tokens": config.max_tokens,
                    "messages": [{ "role": "user", "content": prompt }]
                }),
            ),
            ProviderId::Gemini => (
                format!(
                    "{}/v1beta/models/{}:generateContent?key={}",
                    config.base_url, config.model, config.api_key
                ),
                serde_json::json!({
                    "contents": [{ "parts": [{ "text": prompt }] }],
                    "generationConfig": {
                        "maxOutputTokens": config.max_tokens,
                        "temperature": config.temperature
                    }
                }),
            ),
        };

        let mut request = self.client.post(&url).json(&body);
        request = match config.provider {
            ProviderId::OpenAI => request.bearer_auth(&config.api_key),
            ProviderId::Anthropic => request
                .header("x-api-key", &config.api_key)
                .header("anthropic-version", "2023-06-01"),
            ProviderId::Gemini => request,
        };

        let response = request.send().await.map_err(|e| self.map_transport_error(e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Provider {
                provider: config.provider.to_string(),
                message: format!("HTTP {status}"),
            });
        }

        let json: Value = response.json().await.map_err(|e| self.map_transport_error(e))?;
        let (content, tokens_used) = extract_content(config.provider, &json)?;

        Ok(ProviderResponse {
            content,
            tokens_used,
            model_used: config.model.clone(),
            response_time: started.elapsed(),
        })
    }

    fn map_transport_error(&self, error: reqwest::Error) -> GenerationError {
        if error.is_timeout() {
            GenerationError::Timeout {
                seconds: self.request_timeout.as_secs(),
            }
        } else {
            GenerationError::Http(error)
        }
    }
}

/// Pull the generated text and token count out of a provider reply
fn extract_content(provider: ProviderId, json: &Value) -> GenerationResult<(String, u32)> {
    let text = match provider {
        ProviderId::OpenAI => json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
        ProviderId::Anthropic => json.pointer("/content/0/text").and_then(Value::as_str),
        ProviderId::Gemini => json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str),
    }
    .ok_or_else(|| GenerationError::InvalidResponse {
        message: format!("No content in {provider} response"),
    })?;

    let token_count = |pointer: &str| json.pointer(pointer).and_then(Value::as_u64).unwrap_or(0);
    let tokens = match provider {
        ProviderId::OpenAI => token_count("/usage/total_tokens"),
        ProviderId::Anthropic => token_count("/usage/input_tokens") + token_count("/usage/output_tokens"),
        ProviderId::Gemini => {
            token_count("/usageMetadata/promptTokenCount") + token_count("/usageMetadata/candidatesTokenCount")
        }
    };

    Ok((text.trim().to_string(), tokens as u32))
}

#[async_trait]
impl GenerationService for LlmGenerationService {
    async fn generate(&self, prompt: &str) -> GenerationResult<String> {
        let mut last_error = GenerationError::Unavailable {
            reason: "no providers configured".to_string(),
        };

        for config in &self.providers {
            let outcome = self.request(config, prompt).await;
            self.record(config.provider, &outcome).await;
            match outcome {
                Ok(response) => {
                    component_debug!(
                        ComponentId::Generator,
                        provider = %config.provider,
                        tokens = response.tokens_used,
                        elapsed_ms = response.response_time.as_millis() as u64,
                        "Generation succeeded"
                    );
                    return Ok(response.content);
                }
                Err(error) => {
                    component_warn!(
                        ComponentId::Generator,
                        provider = %config.provider,
                        error = %error,
                        "Provider request failed, trying next provider"
                    );
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }

    async fn judge_engagement(&self, content: &str, variant: VariantKind) -> GenerationResult<f64> {
        let reply = self.generate(&judgment_prompt(content, variant)).await?;
        parse_judgment_score(&reply).ok_or_else(|| GenerationError::InvalidResponse {
            message: format!("No score in judgment reply: {reply}"),
        })
    }

    async fn is_available(&self) -> bool {
        !self.providers.is_empty()
    }
}
