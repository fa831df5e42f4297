//! Source provider reading ranked evidence snippets from a local JSON file

use std::path::Path;

use async_trait::async_trait;
use shared::{component_debug, ComponentId, SourceSnippet, GENERAL_DOMAIN};

use crate::error::EngineResult;
use crate::traits::SourceProvider;

/// Snippets returned per lookup
pub const MAX_SNIPPETS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct JsonSourceProvider {
    snippets: Vec<SourceSnippet>,
}

impl JsonSourceProvider {
    pub fn new(snippets: Vec<SourceSnippet>) -> Self {
        Self { snippets }
    }

    /// A provider with no snippets
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a JSON array of snippets
    pub async fn load(path: &Path) -> EngineResult<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let snippets: Vec<SourceSnippet> = serde_json::from_str(&text)?;
        component_debug!(
            ComponentId::Optimizer,
            path = %path.display(),
            snippets = snippets.len(),
            "Loaded source snippets"
        );
        Ok(Self::new(snippets))
    }

    fn keyword_hits(snippet: &SourceSnippet, keywords: &[String]) -> usize {
        let haystack = format!("{} {}", snippet.title, snippet.content).to_lowercase();
        keywords
            .iter()
            .filter(|keyword| haystack.contains(&keyword.to_lowercase()))
            .count()
    }
}

#[async_trait]
impl SourceProvider for JsonSourceProvider {
    /// Snippets tagged with one of `domains` (any snippet when none are given),
    /// ranked by keyword hits and then by credibility, relevance and freshness
    async fn fetch(&self, domains: &[String], keywords: &[String]) -> EngineResult<Vec<SourceSnippet>> {
        let mut ranked: Vec<(usize, &SourceSnippet)> = self
            .snippets
            .iter()
            .filter(|snippet| {
                domains.is_empty()
                    || snippet.domains.is_empty()
                    || snippet
                        .domains
                        .iter()
                        .any(|d| d == GENERAL_DOMAIN || domains.contains(d))
            })
            .map(|snippet| (Self::keyword_hits(snippet, keywords), snippet))
            .collect();
        ranked.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.rank_score().total_cmp(&a.1.rank_score()))
        });
        Ok(ranked
            .into_iter()
            .take(MAX_SNIPPETS)
            .map(|(_, snippet)| snippet.clone())
            .collect())
    }
}
