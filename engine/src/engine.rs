//! Engine facade wiring the optimizer and the feedback loop to shared stores

use std::sync::Arc;

use generator::GenerationService;
use shared::{
    ContentRecord, FeedbackAggregates, Insight, OptimizedContent, QueryContext, Recommendations, VariantKind,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::feedback::{FeedbackLoop, FeedbackSubmission, IngestOutcome, LearningCycleReport};
use crate::optimizer::LearningOptimizer;
use crate::traits::{FeedbackStore, PatternStore, SourceProvider};

/// Upper bound on insights returned by a single listing
pub const DEFAULT_INSIGHT_LIMIT: usize = 10;

/// The self-improving loop: optimize, observe, learn
pub struct ContentEngine<P, F, G, S>
where
    P: PatternStore,
    F: FeedbackStore,
    G: GenerationService,
    S: SourceProvider,
{
    patterns: Arc<P>,
    feedback: Arc<F>,
    optimizer: LearningOptimizer<P, F, G, S>,
    feedback_loop: FeedbackLoop<P, F>,
}

impl<P, F, G, S> ContentEngine<P, F, G, S>
where
    P: PatternStore,
    F: FeedbackStore,
    G: GenerationService,
    S: SourceProvider,
{
    pub fn new(
        config: &EngineConfig,
        patterns: Arc<P>,
        feedback: Arc<F>,
        generator: Arc<G>,
        sources: Arc<S>,
    ) -> EngineResult<Self> {
        Ok(Self {
            optimizer: LearningOptimizer::new(config, patterns.clone(), feedback.clone(), generator, sources)?,
            feedback_loop: FeedbackLoop::new(config, patterns.clone(), feedback.clone())?,
            patterns,
            feedback,
        })
    }

    pub fn optimizer(&self) -> &LearningOptimizer<P, F, G, S> {
        &self.optimizer
    }

    pub async fn optimize(&self, query: &QueryContext) -> OptimizedContent {
        self.optimizer.optimize(query).await
    }

    pub async fn ingest(&self, submission: FeedbackSubmission) -> EngineResult<IngestOutcome> {
        self.feedback_loop.ingest(submission).await
    }

    pub async fn submit_batch(&self, records: &[ContentRecord]) -> EngineResult<LearningCycleReport> {
        self.feedback_loop.submit_batch(records).await
    }

    pub async fn run_learning_cycle(&self) -> EngineResult<LearningCycleReport> {
        self.feedback_loop.run_learning_cycle().await
    }

    /// Ranked patterns per category; `variant_type` only tags the log line
    pub async fn get_content_recommendations(
        &self,
        domains: &[String],
        variant_type: Option<VariantKind>,
    ) -> EngineResult<Recommendations> {
        self.optimizer.get_content_recommendations(domains, variant_type).await
    }

    /// Insights created in the last `days` days, strongest first
    pub async fn get_learning_insights(&self, days: u32, limit: usize) -> EngineResult<Vec<Insight>> {
        self.patterns.query_insights(days, limit).await
    }

    pub async fn feedback_aggregates(&self) -> EngineResult<FeedbackAggregates> {
        self.feedback.feedback_aggregates().await
    }
}
