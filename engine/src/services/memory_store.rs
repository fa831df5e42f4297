//! In-memory store backed by `RwLock` maps, used for offline runs and tests

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use shared::{
    ContentRecord, FeedbackAggregates, Insight, Pattern, PerformanceFeedback, TrackedContent, VariantAggregate,
};
use tokio::sync::RwLock;

use crate::error::EngineResult;
use crate::traits::{FeedbackStore, PatternQuery, PatternStore};

#[derive(Default)]
pub struct InMemoryStore {
    patterns: RwLock<HashMap<String, Pattern>>,
    insights: RwLock<HashMap<String, Insight>>,
    feedback: RwLock<HashMap<String, PerformanceFeedback>>,
    corpus: RwLock<Vec<ContentRecord>>,
    tracked: RwLock<HashMap<String, TrackedContent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern by id, for inspection
    pub async fn pattern(&self, id: &str) -> Option<Pattern> {
        self.patterns.read().await.get(id).cloned()
    }
}

/// Replace a pattern, carrying over its usage history
fn store_pattern(patterns: &mut HashMap<String, Pattern>, pattern: &Pattern) {
    let mut updated = pattern.clone();
    if let Some(existing) = patterns.get(&pattern.id) {
        updated.usage_count = existing.usage_count;
        updated.last_used = existing.last_used;
    }
    patterns.insert(updated.id.clone(), updated);
}

/// Append records, replacing any earlier record with the same `content_id`
fn store_records(corpus: &mut Vec<ContentRecord>, records: &[ContentRecord]) {
    for record in records {
        let existing = record
            .content_id
            .as_ref()
            .and_then(|id| corpus.iter().position(|r| r.content_id.as_ref() == Some(id)));
        match existing {
            Some(index) => corpus[index] = record.clone(),
            None => corpus.push(record.clone()),
        }
    }
}

#[async_trait]
impl PatternStore for InMemoryStore {
    async fn upsert_pattern(&self, pattern: &Pattern) -> EngineResult<()> {
        store_pattern(&mut *self.patterns.write().await, pattern);
        Ok(())
    }

    async fn upsert_insight(&self, insight: &Insight) -> EngineResult<()> {
        self.insights
            .write()
            .await
            .insert(insight.id.clone(), insight.clone());
        Ok(())
    }

    async fn query_patterns(&self, query: &PatternQuery) -> EngineResult<Vec<Pattern>> {
        let patterns = self.patterns.read().await;
        let mut matching: Vec<Pattern> = patterns
            .values()
            .filter(|p| p.confidence >= query.min_confidence)
            .filter(|p| query.category.map_or(true, |category| p.category == category))
            .filter(|p| p.matches_domain(&query.domain))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.strength().total_cmp(&a.strength()).then_with(|| a.id.cmp(&b.id)));
        matching.truncate(query.limit);
        Ok(matching)
    }

    async fn record_usage(&self, pattern_ids: &[String]) -> EngineResult<()> {
        let mut patterns = self.patterns.write().await;
        let now = Utc::now();
        for id in pattern_ids {
            if let Some(pattern) = patterns.get_mut(id) {
                pattern.usage_count += 1;
                pattern.last_used = Some(now);
            }
        }
        Ok(())
    }

    async fn query_insights(&self, since_days: u32, limit: usize) -> EngineResult<Vec<Insight>> {
        let cutoff = Utc::now() - Duration::days(i64::from(since_days));
        let insights = self.insights.read().await;
        let mut recent: Vec<Insight> = insights
            .values()
            .filter(|insight| insight.created_at >= cutoff)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.priority().total_cmp(&a.priority()).then_with(|| a.id.cmp(&b.id)));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn commit_cycle(&self, patterns: &[Pattern], insights: &[Insight]) -> EngineResult<()> {
        // Both locks are held so readers see the whole cycle or none of it
        let mut stored_patterns = self.patterns.write().await;
        let mut stored_insights = self.insights.write().await;
        for pattern in patterns {
            store_pattern(&mut stored_patterns, pattern);
        }
        for insight in insights {
            stored_insights.insert(insight.id.clone(), insight.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for InMemoryStore {
    async fn upsert_feedback(&self, feedback: &PerformanceFeedback) -> EngineResult<()> {
        self.feedback
            .write()
            .await
            .insert(feedback.content_id.clone(), feedback.clone());
        Ok(())
    }

    async fn get_feedback(&self, content_id: &str) -> EngineResult<Option<PerformanceFeedback>> {
        Ok(self.feedback.read().await.get(content_id).cloned())
    }

    async fn feedback_aggregates(&self) -> EngineResult<FeedbackAggregates> {
        let feedback = self.feedback.read().await;
        let mut sums: HashMap<String, (f64, f64, u64)> = HashMap::new();
        for entry in feedback.values() {
            let sum = sums.entry(entry.variant_type.clone()).or_default();
            sum.0 += entry.actual_engagement;
            sum.1 += entry.prediction_error;
            sum.2 += 1;
        }
        let by_variant = sums
            .into_iter()
            .map(|(variant, (actual, error, count))| {
                (
                    variant,
                    VariantAggregate {
                        mean_actual: actual / count as f64,
                        mean_error: error / count as f64,
                        sample_count: count,
                    },
                )
            })
            .collect();
        Ok(FeedbackAggregates { by_variant })
    }

    async fn append_records(&self, records: &[ContentRecord]) -> EngineResult<()> {
        store_records(&mut *self.corpus.write().await, records);
        Ok(())
    }

    async fn record_outcome(&self, feedback: &PerformanceFeedback, records: &[ContentRecord]) -> EngineResult<()> {
        let mut stored = self.feedback.write().await;
        let mut corpus = self.corpus.write().await;
        stored.insert(feedback.content_id.clone(), feedback.clone());
        store_records(&mut corpus, records);
        Ok(())
    }

    async fn load_corpus(&self) -> EngineResult<Vec<ContentRecord>> {
        Ok(self.corpus.read().await.clone())
    }

    async fn track_content(&self, tracked: &TrackedContent) -> EngineResult<()> {
        self.tracked
            .write()
            .await
            .insert(tracked.tracking_id.clone(), tracked.clone());
        Ok(())
    }

    async fn tracked_content(&self, tracking_id: &str) -> EngineResult<Option<TrackedContent>> {
        Ok(self.tracked.read().await.get(tracking_id).cloned())
    }
}
