//! Performance feedback loop
//!
//! Real outcomes are validated, stored and folded into the learning corpus.
//! Each accepted outcome or record batch triggers a learning cycle that
//! re-mines patterns and insights over the whole corpus and commits them in
//! one transaction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use shared::{
    component_error, component_info, component_warn, ComponentId, ContentRecord, PerformanceFeedback, PerformanceTier,
    VariantKind,
};

use crate::config::{EngineConfig, FeedbackConfig};
use crate::core::{InsightGenerator, PatternExtractor};
use crate::error::{EngineError, EngineResult};
use crate::traits::{FeedbackStore, PatternStore};

/// Key in `content_features` carrying the content text for untracked ids
pub const TEXT_FEATURE: &str = "text";

/// One observed outcome as submitted by a caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub content_id: String,
    pub variant_type: String,
    pub actual_engagement: f64,
    pub predicted_engagement: f64,
    #[serde(default)]
    pub audience_signals: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub content_features: HashMap<String, serde_json::Value>,
}

impl FeedbackSubmission {
    pub fn new(
        content_id: impl Into<String>,
        variant_type: impl Into<String>,
        actual_engagement: f64,
        predicted_engagement: f64,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            variant_type: variant_type.into(),
            actual_engagement,
            predicted_engagement,
            audience_signals: HashMap::new(),
            content_features: HashMap::new(),
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.content_features.insert(name.into(), value);
        self
    }

    pub fn with_signal(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.audience_signals.insert(name.into(), value);
        self
    }
}

/// Outcome of one learning cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningCycleReport {
    pub records_analyzed: usize,
    pub high_performers: usize,
    pub patterns: usize,
    pub insights: usize,
}

/// Result of ingesting one outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub feedback: PerformanceFeedback,
    /// Whether the outcome could be folded into the corpus
    pub corpus_updated: bool,
    pub cycle: Option<LearningCycleReport>,
}

pub struct FeedbackLoop<P, F>
where
    P: PatternStore,
    F: FeedbackStore,
{
    config: FeedbackConfig,
    patterns: Arc<P>,
    feedback: Arc<F>,
    extractor: PatternExtractor,
    insights: InsightGenerator,
}

impl<P, F> FeedbackLoop<P, F>
where
    P: PatternStore,
    F: FeedbackStore,
{
    pub fn new(config: &EngineConfig, patterns: Arc<P>, feedback: Arc<F>) -> EngineResult<Self> {
        Ok(Self {
            config: config.feedback.clone(),
            patterns,
            feedback,
            extractor: PatternExtractor::new(config.extractor.clone())?,
            insights: InsightGenerator::new(config.insights.clone()),
        })
    }

    /// Validate, store and learn from one observed outcome
    ///
    /// Malformed submissions are rejected before anything is written.
    pub async fn ingest(&self, submission: FeedbackSubmission) -> EngineResult<IngestOutcome> {
        if let Err(error) = validate(&submission) {
            component_warn!(
                ComponentId::FeedbackLoop,
                content_id = %submission.content_id,
                error = %error,
                "Rejected feedback"
            );
            return Err(error);
        }

        let feedback = PerformanceFeedback {
            prediction_error: (submission.actual_engagement - submission.predicted_engagement).abs(),
            tier: PerformanceTier::classify(submission.actual_engagement, &self.config.tiers),
            content_id: submission.content_id,
            variant_type: submission.variant_type,
            actual_engagement: submission.actual_engagement,
            predicted_engagement: submission.predicted_engagement,
            audience_signals: submission.audience_signals,
            content_features: submission.content_features,
            recorded_at: Utc::now(),
        };
        let records: Vec<ContentRecord> = self.corpus_record(&feedback).await?.into_iter().collect();
        self.feedback.record_outcome(&feedback, &records).await?;
        component_info!(
            ComponentId::FeedbackLoop,
            content_id = %feedback.content_id,
            tier = feedback.tier.as_str(),
            error = feedback.prediction_error,
            "Feedback recorded"
        );

        let corpus_updated = !records.is_empty();
        if !corpus_updated {
            component_warn!(
                ComponentId::FeedbackLoop,
                content_id = %feedback.content_id,
                "No content text for feedback, corpus unchanged"
            );
        }

        let cycle = if corpus_updated && self.config.relearn_on_ingest {
            Some(self.run_learning_cycle().await?)
        } else {
            None
        };

        Ok(IngestOutcome {
            feedback,
            corpus_updated,
            cycle,
        })
    }

    /// Append a batch of historical records and learn from the corpus
    pub async fn submit_batch(&self, records: &[ContentRecord]) -> EngineResult<LearningCycleReport> {
        if let Some(bad) = records
            .iter()
            .find(|record| !record.engagement_rate.is_finite() || !(0.0..=1.0).contains(&record.engagement_rate))
        {
            return Err(EngineError::MalformedFeedback {
                content_id: bad.content_id.clone().unwrap_or_else(|| "<batch>".to_string()),
                reason: format!("engagement_rate {} outside [0, 1]", bad.engagement_rate),
            });
        }
        self.feedback.append_records(records).await?;
        self.run_learning_cycle().await
    }

    /// Re-mine patterns and insights over the whole corpus
    pub async fn run_learning_cycle(&self) -> EngineResult<LearningCycleReport> {
        let corpus = self.feedback.load_corpus().await?;
        let now = Utc::now();
        let high_performers = self.extractor.high_performers(&corpus).len();
        let patterns = self.extractor.extract(&corpus, now);
        let insights = self.insights.generate(&corpus, &patterns, now);

        if let Err(error) = self.patterns.commit_cycle(&patterns, &insights).await {
            component_error!(
                ComponentId::FeedbackLoop,
                error = %error,
                patterns = patterns.len(),
                "Learning cycle rolled back"
            );
            return Err(error);
        }

        let report = LearningCycleReport {
            records_analyzed: corpus.len(),
            high_performers,
            patterns: patterns.len(),
            insights: insights.len(),
        };
        component_info!(
            ComponentId::FeedbackLoop,
            records = report.records_analyzed,
            high_performers = report.high_performers,
            patterns = report.patterns,
            insights = report.insights,
            "Learning cycle committed"
        );
        Ok(report)
    }

    /// Corpus record for stored feedback, if its text can be resolved
    ///
    /// Tracked ids resolve to the variant text the optimizer produced;
    /// anything else needs a `text` content feature.
    async fn corpus_record(&self, feedback: &PerformanceFeedback) -> EngineResult<Option<ContentRecord>> {
        let tracked = self.feedback.tracked_content(&feedback.content_id).await?;
        let resolved = tracked.and_then(|tracked| {
            let variant: VariantKind = feedback.variant_type.parse().ok()?;
            let text = tracked.variants.get(&variant)?.clone();
            Some((text, tracked.domains))
        });

        let (text, domains) = match resolved {
            Some(found) => found,
            None => match feedback.content_features.get(TEXT_FEATURE).and_then(|v| v.as_str()) {
                Some(text) if !text.trim().is_empty() => (text.to_string(), Vec::new()),
                _ => return Ok(None),
            },
        };

        let record = ContentRecord::new(text, feedback.actual_engagement, feedback.variant_type.clone())
            .with_content_id(feedback.content_id.clone())
            .with_domains(domains);
        Ok(Some(ContentRecord {
            timestamp: feedback.recorded_at,
            ..record
        }))
    }
}

fn validate(submission: &FeedbackSubmission) -> EngineResult<()> {
    let reject = |reason: String| EngineError::MalformedFeedback {
        content_id: submission.content_id.clone(),
        reason,
    };
    if submission.content_id.trim().is_empty() {
        return Err(reject("content_id is empty".to_string()));
    }
    if submission.variant_type.trim().is_empty() {
        return Err(reject("variant_type is empty".to_string()));
    }
    for (field, value) in [
        ("actual_engagement", submission.actual_engagement),
        ("predicted_engagement", submission.predicted_engagement),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(reject(format!("{field} {value} outside [0, 1]")));
        }
    }
    Ok(())
}

/// Simulated outcome for demos and tests: prediction plus uniform noise
pub fn simulate(predicted: f64, range: (f64, f64)) -> f64 {
    let (low, high) = range;
    let noise = if low < high {
        rand::thread_rng().gen_range(low..high)
    } else {
        low
    };
    (predicted + noise).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockFeedbackStore, MockPatternStore};
    use shared::TrackedContent;
    use std::collections::BTreeMap;

    fn feedback_loop(
        patterns: MockPatternStore,
        feedback: MockFeedbackStore,
    ) -> FeedbackLoop<MockPatternStore, MockFeedbackStore> {
        FeedbackLoop::new(&EngineConfig::default(), Arc::new(patterns), Arc::new(feedback)).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_feedback_writes_nothing() {
        let mut feedback = MockFeedbackStore::new();
        feedback.expect_record_outcome().never();
        feedback.expect_upsert_feedback().never();
        feedback.expect_append_records().never();
        let looped = feedback_loop(MockPatternStore::new(), feedback);

        for submission in [
            FeedbackSubmission::new("", "analytical", 0.5, 0.5),
            FeedbackSubmission::new("c1", "analytical", 1.2, 0.5),
            FeedbackSubmission::new("c1", "analytical", 0.5, f64::NAN),
            FeedbackSubmission::new("c1", " ", 0.5, 0.5),
        ] {
            assert!(matches!(
                looped.ingest(submission).await,
                Err(EngineError::MalformedFeedback { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_tracked_feedback_folds_variant_text() {
        let mut feedback = MockFeedbackStore::new();
        feedback.expect_tracked_content().returning(|id| {
            let mut variants = BTreeMap::new();
            variants.insert(VariantKind::Engaging, "Engaging text?".to_string());
            Ok(Some(TrackedContent {
                tracking_id: id.to_string(),
                topic: "rates".to_string(),
                domains: vec!["fintech".to_string()],
                variants,
                created_at: Utc::now(),
            }))
        });
        feedback
            .expect_record_outcome()
            .withf(|f, records| {
                f.content_id == "track-1"
                    && f.tier == PerformanceTier::Viral
                    && (f.prediction_error - 0.2).abs() < 1e-9
                    && records.len() == 1
                    && records[0].text == "Engaging text?"
                    && records[0].content_id.as_deref() == Some("track-1")
                    && records[0].domains == vec!["fintech".to_string()]
            })
            .times(1)
            .returning(|_, _| Ok(()));
        feedback.expect_load_corpus().returning(|| Ok(Vec::new()));

        let mut patterns = MockPatternStore::new();
        patterns
            .expect_commit_cycle()
            .withf(|p, i| p.is_empty() && i.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = feedback_loop(patterns, feedback)
            .ingest(FeedbackSubmission::new("track-1", "engaging", 0.85, 0.65))
            .await
            .unwrap();
        assert!(outcome.corpus_updated);
        assert_eq!(outcome.cycle, Some(LearningCycleReport::default()));
    }

    #[tokio::test]
    async fn test_untracked_feedback_without_text_skips_corpus() {
        let mut feedback = MockFeedbackStore::new();
        feedback.expect_tracked_content().returning(|_| Ok(None));
        feedback
            .expect_record_outcome()
            .withf(|f, records| f.content_id == "post-9" && records.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));
        let mut patterns = MockPatternStore::new();
        patterns.expect_commit_cycle().never();

        let outcome = feedback_loop(patterns, feedback)
            .ingest(FeedbackSubmission::new("post-9", "analytical", 0.3, 0.5))
            .await
            .unwrap();
        assert!(!outcome.corpus_updated);
        assert_eq!(outcome.feedback.tier, PerformanceTier::Medium);
        assert!(outcome.cycle.is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let mut feedback = MockFeedbackStore::new();
        feedback.expect_append_records().returning(|_| {
            Err(EngineError::Storage {
                operation: "append_records".to_string(),
                message: "disk full".to_string(),
            })
        });
        let mut patterns = MockPatternStore::new();
        patterns.expect_commit_cycle().never();

        let result = feedback_loop(patterns, feedback)
            .submit_batch(&[ContentRecord::new("x", 0.5, "analytical")])
            .await;
        assert!(matches!(result, Err(EngineError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_failed_outcome_write_skips_learning() {
        let mut feedback = MockFeedbackStore::new();
        feedback.expect_tracked_content().returning(|_| Ok(None));
        feedback.expect_record_outcome().times(1).returning(|_, _| {
            Err(EngineError::Storage {
                operation: "record_outcome".to_string(),
                message: "disk full".to_string(),
            })
        });
        feedback.expect_upsert_feedback().never();
        feedback.expect_append_records().never();
        let mut patterns = MockPatternStore::new();
        patterns.expect_commit_cycle().never();

        let submission =
            FeedbackSubmission::new("post-3", "engaging", 0.7, 0.6).with_feature(TEXT_FEATURE, "Body?".into());
        let result = feedback_loop(patterns, feedback).ingest(submission).await;
        assert!(matches!(result, Err(EngineError::Storage { .. })));
    }

    #[test]
    fn test_simulate_stays_in_unit_interval() {
        for _ in 0..200 {
            let value = simulate(0.9, (-0.15, 0.25));
            assert!((0.75..=1.0).contains(&value));
            let value = simulate(0.05, (-0.15, 0.25));
            assert!((0.0..0.3).contains(&value));
        }
        assert!((simulate(0.5, (0.1, 0.1)) - 0.6).abs() < 1e-12);
    }
}
