//! Trait definitions with mockall annotations for testing
//!
//! Storage and source access sit behind these traits so the optimizer and the
//! feedback loop can be driven by the SQLite store, the in-memory store or a
//! mock in tests.

use async_trait::async_trait;
use shared::{
    ContentRecord, FeedbackAggregates, Insight, Pattern, PatternCategory, PerformanceFeedback, SourceSnippet,
    TrackedContent,
};

use crate::error::EngineResult;

/// Filter for pattern lookups
#[derive(Debug, Clone, PartialEq)]
pub struct PatternQuery {
    /// Patterns tagged with this domain or `general` match
    pub domain: String,
    /// Inclusive lower bound on confidence
    pub min_confidence: f64,
    pub limit: usize,
    pub category: Option<PatternCategory>,
}

impl PatternQuery {
    pub fn new(domain: impl Into<String>, min_confidence: f64, limit: usize) -> Self {
        Self {
            domain: domain.into(),
            min_confidence,
            limit,
            category: None,
        }
    }

    pub fn with_category(mut self, category: PatternCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Durable keyed storage for learned patterns and insights
///
/// Every write is all-or-nothing per entity; `commit_cycle` covers all
/// entities of one learning cycle in a single transaction.
#[mockall::automock]
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Replace a pattern by id, keeping its usage history
    async fn upsert_pattern(&self, pattern: &Pattern) -> EngineResult<()>;

    /// Replace an insight by id
    async fn upsert_insight(&self, insight: &Insight) -> EngineResult<()>;

    /// Matching patterns ordered by `avg_engagement * confidence` descending
    async fn query_patterns(&self, query: &PatternQuery) -> EngineResult<Vec<Pattern>>;

    /// Increment usage and stamp `last_used` for each id; unknown ids are ignored
    async fn record_usage(&self, pattern_ids: &[String]) -> EngineResult<()>;

    /// Insights created within the window, ordered by `impact_score * evidence_strength`
    async fn query_insights(&self, since_days: u32, limit: usize) -> EngineResult<Vec<Insight>>;

    /// Persist every entity of one learning cycle atomically
    async fn commit_cycle(&self, patterns: &[Pattern], insights: &[Insight]) -> EngineResult<()>;
}

/// Storage for real outcomes, the learning corpus and tracked content
#[mockall::automock]
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Insert or overwrite feedback keyed by `content_id`
    async fn upsert_feedback(&self, feedback: &PerformanceFeedback) -> EngineResult<()>;

    async fn get_feedback(&self, content_id: &str) -> EngineResult<Option<PerformanceFeedback>>;

    /// Per-variant calibration aggregates over all feedback
    async fn feedback_aggregates(&self) -> EngineResult<FeedbackAggregates>;

    /// Append records to the corpus; records with a `content_id` replace earlier ones
    async fn append_records(&self, records: &[ContentRecord]) -> EngineResult<()>;

    /// Store feedback and the corpus records derived from it in one atomic write
    async fn record_outcome(&self, feedback: &PerformanceFeedback, records: &[ContentRecord]) -> EngineResult<()>;

    /// The whole corpus in insertion order
    async fn load_corpus(&self) -> EngineResult<Vec<ContentRecord>>;

    async fn track_content(&self, tracked: &TrackedContent) -> EngineResult<()>;

    async fn tracked_content(&self, tracking_id: &str) -> EngineResult<Option<TrackedContent>>;
}

/// Source of ranked evidence snippets used to seed generation
#[mockall::automock]
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch(&self, domains: &[String], keywords: &[String]) -> EngineResult<Vec<SourceSnippet>>;
}
