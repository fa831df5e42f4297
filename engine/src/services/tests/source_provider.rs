//! Tests for the JSON-backed source provider

use shared::SourceSnippet;
use tempfile::NamedTempFile;

use crate::services::source_provider::MAX_SNIPPETS;
use crate::services::JsonSourceProvider;
use crate::traits::SourceProvider;

fn snippet(title: &str, content: &str, domains: &[&str], credibility: f64) -> SourceSnippet {
    SourceSnippet {
        title: title.to_string(),
        content: content.to_string(),
        source_name: "Wire".to_string(),
        url: None,
        domains: domains.iter().map(|d| d.to_string()).collect(),
        credibility,
        freshness: 0.5,
        relevance: 0.5,
    }
}

fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_keyword_hits_outrank_credibility() {
    let provider = JsonSourceProvider::new(vec![
        snippet("Rates outlook", "Central banks hold", &["fintech"], 0.9),
        snippet("Stablecoin rules", "New stablecoin regulation lands", &["fintech"], 0.4),
    ]);

    let results = provider
        .fetch(&words(&["fintech"]), &words(&["stablecoin", "regulation"]))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Stablecoin rules");
}

#[tokio::test]
async fn test_domain_filter_keeps_general_and_untagged() {
    let provider = JsonSourceProvider::new(vec![
        snippet("Policy", "policy text", &["policy"], 0.9),
        snippet("General", "general text", &["general"], 0.5),
        snippet("Untagged", "untagged text", &[], 0.4),
        snippet("Fintech", "fintech text", &["fintech"], 0.3),
    ]);

    let titles: Vec<String> = provider
        .fetch(&words(&["fintech"]), &[])
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["General", "Untagged", "Fintech"]);

    // No requested domains means no filtering
    assert_eq!(provider.fetch(&[], &[]).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_results_are_capped() {
    let snippets = (0..15)
        .map(|i| snippet(&format!("item {i}"), "body", &[], 0.5))
        .collect();
    let provider = JsonSourceProvider::new(snippets);
    assert_eq!(provider.fetch(&[], &[]).await.unwrap().len(), MAX_SNIPPETS);
}

#[tokio::test]
async fn test_load_from_json_file() {
    let file = NamedTempFile::new().unwrap();
    let snippets = vec![snippet("Loaded", "from disk", &["ai"], 0.7)];
    std::fs::write(file.path(), serde_json::to_string(&snippets).unwrap()).unwrap();

    let provider = JsonSourceProvider::load(file.path()).await.unwrap();
    let results = provider.fetch(&words(&["ai"]), &words(&["disk"])).await.unwrap();
    assert_eq!(results, snippets);
}

#[tokio::test]
async fn test_empty_provider_returns_nothing() {
    let provider = JsonSourceProvider::empty();
    assert!(provider.fetch(&words(&["ai"]), &words(&["models"])).await.unwrap().is_empty());
}
