//! Input-side types: historical records, query context and source snippets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One piece of published content with its observed engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Upsert key inside the learning corpus (None for anonymous batch rows)
    #[serde(default)]
    pub content_id: Option<String>,
    pub text: String,
    /// Normalized engagement in [0, 1]
    pub engagement_rate: f64,
    pub variant_type: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ContentRecord {
    pub fn new(text: impl Into<String>, engagement_rate: f64, variant_type: impl Into<String>) -> Self {
        Self {
            content_id: None,
            text: text.into(),
            engagement_rate,
            variant_type: variant_type.into(),
            domains: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }
}

/// Query complexity as classified upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[default]
    Simple,
    CrossDomain,
    Contrarian,
}

impl std::str::FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "simple" => Ok(Complexity::Simple),
            "cross_domain" => Ok(Complexity::CrossDomain),
            "contrarian" => Ok(Complexity::Contrarian),
            _ => Err(format!("Unknown complexity: {s}")),
        }
    }
}

/// Immutable per-request context for one optimization call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryContext {
    /// The query text the content is about
    pub topic: String,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub complexity: Complexity,
    /// Named signals such as `controversy` or `innovation`, each in [0, 1]
    #[serde(default)]
    pub context_signals: HashMap<String, f64>,
    #[serde(default)]
    pub frameworks: Vec<String>,
}

impl QueryContext {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    pub fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_signal(mut self, name: impl Into<String>, value: f64) -> Self {
        self.context_signals.insert(name.into(), value);
        self
    }

    pub fn with_frameworks(mut self, frameworks: Vec<String>) -> Self {
        self.frameworks = frameworks;
        self
    }

    /// Signal value, 0.0 when absent
    pub fn signal(&self, name: &str) -> f64 {
        self.context_signals.get(name).copied().unwrap_or(0.0)
    }
}

/// Ranked snippet returned by a source provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSnippet {
    pub title: String,
    pub content: String,
    pub source_name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    pub credibility: f64,
    pub freshness: f64,
    pub relevance: f64,
}

impl SourceSnippet {
    /// Combined ranking score
    pub fn rank_score(&self) -> f64 {
        self.credibility * 0.4 + self.relevance * 0.4 + self.freshness * 0.2
    }
}
