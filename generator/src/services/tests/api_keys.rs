//! Tests for API key loading

use std::collections::HashMap;

use crate::services::api_keys::provider_configs_from;
use crate::types::ProviderId;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_no_keys_yields_no_providers() {
    let configs = provider_configs_from(lookup(&[]));
    assert!(configs.is_empty());
}

#[test]
fn test_providers_follow_priority_order() {
    let configs = provider_configs_from(lookup(&[
        ("GEMINI_API_KEY", "g-key"),
        ("OPENAI_API_KEY", "o-key"),
    ]));

    let providers: Vec<ProviderId> = configs.iter().map(|c| c.provider).collect();
    assert_eq!(providers, vec![ProviderId::OpenAI, ProviderId::Gemini]);
    assert_eq!(configs[0].api_key, "o-key");
}

#[test]
fn test_google_key_is_gemini_fallback() {
    let configs = provider_configs_from(lookup(&[("GOOGLE_API_KEY", "google")]));
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].provider, ProviderId::Gemini);
    assert_eq!(configs[0].api_key, "google");
}

#[test]
fn test_blank_keys_are_ignored() {
    let configs = provider_configs_from(lookup(&[("ANTHROPIC_API_KEY", "   ")]));
    assert!(configs.is_empty());
}
