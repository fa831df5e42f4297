//! Learning-enhanced optimizer
//!
//! One `optimize` call generates the four base variants, applies learned
//! patterns to each, predicts engagement with and without the learning boost
//! and plans an A/B test. It never fails: store or generation outages
//! degrade the result to template variants without boost.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::join_all;
use generator::core::{variant_prompt, PromptContext};
use generator::{GenerationError, GenerationService};
use shared::{
    component_debug, component_info, component_warn, ComponentId, FeedbackAggregates, LearningMetadata,
    OptimizedContent, Pattern, PatternCategory, QueryContext, Recommendation, Recommendations, RunMetrics,
    SourceSnippet, TrackedContent, VariantKind, GENERAL_DOMAIN,
};
use uuid::Uuid;

use crate::config::{EngineConfig, OptimizerConfig};
use crate::core::scoring::{ranked_variants, recommend};
use crate::core::{templates, DetectorSet, EngagementPredictor, PatternTransformer, TransformedText, VariantScorer};
use crate::error::EngineResult;
use crate::traits::{FeedbackStore, PatternQuery, PatternStore, SourceProvider};

/// Optimizer over injected stores, generation service and source provider
pub struct LearningOptimizer<P, F, G, S>
where
    P: PatternStore,
    F: FeedbackStore,
    G: GenerationService,
    S: SourceProvider,
{
    config: OptimizerConfig,
    patterns: Arc<P>,
    feedback: Arc<F>,
    generator: Arc<G>,
    sources: Arc<S>,
    predictor: EngagementPredictor,
    transformer: PatternTransformer,
    scorer: VariantScorer,
}

impl<P, F, G, S> LearningOptimizer<P, F, G, S>
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
        let detectors = DetectorSet::from_config(&config.extractor)?;
        Ok(Self {
            predictor: EngagementPredictor::new(config.predictor.clone())?,
            transformer: PatternTransformer::new(
                detectors,
                &config.optimizer,
                config.extractor.closing.question_insertion.clone(),
            ),
            scorer: VariantScorer::new(&config.optimizer, &config.predictor.hashtag_pattern)?,
            config: config.optimizer.clone(),
            patterns,
            feedback,
            generator,
            sources,
        })
    }

    pub fn predictor(&self) -> &EngagementPredictor {
        &self.predictor
    }

    pub fn scorer(&self) -> &VariantScorer {
        &self.scorer
    }

    pub fn transformer(&self) -> &PatternTransformer {
        &self.transformer
    }

    /// Produce optimized content for one query
    pub async fn optimize(&self, query: &QueryContext) -> OptimizedContent {
        let started = Instant::now();
        let mut metrics = RunMetrics::zeroed();
        component_info!(
            ComponentId::Optimizer,
            topic = %query.topic,
            domains = ?query.domains,
            "Optimizing content"
        );

        let snippets = self.fetch_sources(query).await;
        let variants = self.base_variants(query, &snippets, &mut metrics).await;

        let recommendations = match self.get_content_recommendations(&query.domains, None).await {
            Ok(recommendations) => recommendations,
            Err(error) => {
                component_warn!(
                    ComponentId::Optimizer,
                    error = %error,
                    "Pattern store unavailable, optimizing without learned patterns"
                );
                metrics.store_degraded = true;
                Recommendations::new()
            }
        };
        let aggregates = match self.feedback.feedback_aggregates().await {
            Ok(aggregates) => aggregates,
            Err(error) => {
                component_warn!(
                    ComponentId::Optimizer,
                    error = %error,
                    "Feedback aggregates unavailable, using neutral history"
                );
                metrics.store_degraded = true;
                FeedbackAggregates::default()
            }
        };

        let transformed: BTreeMap<VariantKind, TransformedText> = variants
            .iter()
            .map(|(variant, text)| (*variant, self.transformer.apply_recommendations(text, &recommendations)))
            .collect();
        let model_factors = self.model_factors(&transformed).await;

        let mut final_variants = BTreeMap::new();
        let mut base_predictions = BTreeMap::new();
        let mut enhanced_predictions = BTreeMap::new();
        let mut optimization_scores = BTreeMap::new();
        let mut applied_ids = BTreeSet::new();

        for (variant, result) in &transformed {
            let model_factor = model_factors.get(variant).copied().flatten();
            let base = self
                .predictor
                .predict(&result.text, variant.as_str(), query, &aggregates, model_factor);
            let boost = self.scorer.learning_boost(&result.applied);
            let enhanced = (base + boost).min(1.0);

            optimization_scores.insert(*variant, self.scorer.optimization_score(&result.text, base));
            base_predictions.insert(*variant, base);
            enhanced_predictions.insert(*variant, enhanced);
            final_variants.insert(*variant, result.text.clone());
            applied_ids.extend(result.applied.iter().map(|applied| applied.pattern_id.clone()));
        }

        let applied_patterns: Vec<String> = applied_ids.into_iter().collect();
        if !applied_patterns.is_empty() {
            if let Err(error) = self.patterns.record_usage(&applied_patterns).await {
                component_warn!(ComponentId::Optimizer, error = %error, "Failed to record pattern usage");
                metrics.store_degraded = true;
            }
        }

        let recommended_variant = recommend(&enhanced_predictions);
        let learning_applied = !applied_patterns.is_empty();
        let tracking_id = Uuid::new_v4().to_string();
        let experiment = self.scorer.experiment_config(
            &format!("exp-{tracking_id}"),
            &final_variants,
            &enhanced_predictions,
            learning_applied,
        );

        let created_at = Utc::now();
        let tracked = TrackedContent {
            tracking_id: tracking_id.clone(),
            topic: query.topic.clone(),
            domains: query.domains.clone(),
            variants: final_variants.clone(),
            created_at,
        };
        if let Err(error) = self.feedback.track_content(&tracked).await {
            component_warn!(ComponentId::Optimizer, error = %error, "Failed to track optimized content");
            metrics.store_degraded = true;
        }

        let best = |predictions: &BTreeMap<VariantKind, f64>| {
            ranked_variants(predictions).first().map(|(_, p)| *p).unwrap_or(0.0)
        };
        metrics.engagement_potential = best(&enhanced_predictions);
        metrics.latency_ms = started.elapsed().as_millis() as u64;

        let metadata = LearningMetadata {
            learning_applied,
            patterns_applied: applied_patterns.len(),
            boost: enhanced_predictions.get(&recommended_variant).copied().unwrap_or(0.0)
                - base_predictions.get(&recommended_variant).copied().unwrap_or(0.0),
            recommendations_consumed: recommendations.values().filter(|r| !r.is_empty()).count(),
            learning_improvement: best(&enhanced_predictions) - best(&base_predictions),
            generation_degraded: metrics.template_fallbacks > 0,
            metrics,
        };

        component_info!(
            ComponentId::Optimizer,
            tracking_id = %tracking_id,
            recommended = %recommended_variant,
            patterns_applied = metadata.patterns_applied,
            boost = metadata.boost,
            latency_ms = metadata.metrics.latency_ms,
            "Optimization complete"
        );

        OptimizedContent {
            primary_content: final_variants.get(&recommended_variant).cloned().unwrap_or_default(),
            variants: final_variants,
            base_predictions,
            enhanced_predictions,
            optimization_scores,
            recommended_variant,
            applied_patterns,
            recommendations,
            experiment,
            tracking_id,
            metadata,
            created_at,
        }
    }

    /// Ranked learned patterns grouped by category for the given domains
    ///
    /// Each domain (or `general` when none is given) is queried separately;
    /// results are merged by id and the best few per category are kept.
    /// Learned patterns are not variant-specific, so `variant_type` only tags
    /// the log line and never changes the result.
    pub async fn get_content_recommendations(
        &self,
        domains: &[String],
        variant_type: Option<VariantKind>,
    ) -> EngineResult<Recommendations> {
        let queried: Vec<String> = if domains.is_empty() {
            vec![GENERAL_DOMAIN.to_string()]
        } else {
            domains.to_vec()
        };

        let mut merged: HashMap<String, Pattern> = HashMap::new();
        for domain in &queried {
            let query = PatternQuery::new(
                domain.as_str(),
                self.config.recommendation_min_confidence,
                self.config.recommendation_query_limit,
            );
            for pattern in self.patterns.query_patterns(&query).await? {
                merged.entry(pattern.id.clone()).or_insert(pattern);
            }
        }

        let mut by_category: BTreeMap<PatternCategory, Vec<Pattern>> = BTreeMap::new();
        for pattern in merged.into_values() {
            by_category.entry(pattern.category).or_default().push(pattern);
        }

        let recommendations: Recommendations = by_category
            .into_iter()
            .map(|(category, mut patterns)| {
                patterns.sort_by(|a, b| b.strength().total_cmp(&a.strength()).then_with(|| a.id.cmp(&b.id)));
                patterns.truncate(self.config.recommendations_per_category);
                (category, patterns.into_iter().map(recommendation).collect())
            })
            .collect();

        component_debug!(
            ComponentId::Optimizer,
            domains = ?queried,
            variant = ?variant_type.map(|v| v.as_str()),
            categories = recommendations.len(),
            "Recommendations resolved"
        );
        Ok(recommendations)
    }

    async fn fetch_sources(&self, query: &QueryContext) -> Vec<SourceSnippet> {
        let keywords: Vec<String> = query
            .topic
            .split_whitespace()
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|word| word.chars().count() > 2)
            .collect();
        match self.sources.fetch(&query.domains, &keywords).await {
            Ok(mut snippets) => {
                snippets.truncate(self.config.source_limit);
                snippets
            }
            Err(error) => {
                component_warn!(ComponentId::Optimizer, error = %error, "Source lookup failed");
                Vec::new()
            }
        }
    }

    /// Generated variants, with templates standing in for failed generations
    async fn base_variants(
        &self,
        query: &QueryContext,
        snippets: &[SourceSnippet],
        metrics: &mut RunMetrics,
    ) -> BTreeMap<VariantKind, String> {
        let top = snippets.first();
        let template = |variant: VariantKind| templates::render(variant, query, top);

        if !self.generator.is_available().await {
            component_info!(ComponentId::Optimizer, "Generation unavailable, using templates");
            metrics.template_fallbacks = VariantKind::ALL.len() as u32;
            return VariantKind::ALL.iter().map(|v| (*v, template(*v))).collect();
        }

        let context = PromptContext {
            topic: &query.topic,
            domains: &query.domains,
            frameworks: &query.frameworks,
            evidence: top.map(|snippet| snippet.content.as_str()),
        };
        let timeout = Duration::from_secs(self.config.generation_timeout_secs);
        let calls = VariantKind::ALL.iter().map(|variant| {
            let prompt = variant_prompt(*variant, &context);
            async move {
                let outcome = match tokio::time::timeout(timeout, self.generator.generate(&prompt)).await {
                    Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
                    Ok(Ok(_)) => Err(GenerationError::InvalidResponse {
                        message: "empty generation".to_string(),
                    }),
                    Ok(Err(error)) => Err(error),
                    Err(_) => Err(GenerationError::Timeout {
                        seconds: timeout.as_secs(),
                    }),
                };
                (*variant, outcome)
            }
        });

        let mut variants = BTreeMap::new();
        for (variant, outcome) in join_all(calls).await {
            let text = match outcome {
                Ok(text) => text,
                Err(error) => {
                    component_warn!(
                        ComponentId::Optimizer,
                        variant = %variant,
                        error = %error,
                        "Generation failed, falling back to template"
                    );
                    metrics.generation_failures += 1;
                    metrics.template_fallbacks += 1;
                    template(variant)
                }
            };
            variants.insert(variant, text);
        }
        variants
    }

    /// Model judgment per variant, `None` where none could be obtained
    async fn model_factors(
        &self,
        transformed: &BTreeMap<VariantKind, TransformedText>,
    ) -> BTreeMap<VariantKind, Option<f64>> {
        if !self.generator.is_available().await {
            return transformed.keys().map(|variant| (*variant, None)).collect();
        }

        let timeout = Duration::from_secs(self.config.generation_timeout_secs);
        let calls = transformed.iter().map(|(variant, result)| async move {
            let judged = tokio::time::timeout(timeout, self.generator.judge_engagement(&result.text, *variant)).await;
            let factor = match judged {
                Ok(Ok(score)) => Some(score),
                Ok(Err(error)) => {
                    component_debug!(ComponentId::Optimizer, variant = %variant, error = %error, "Judgment failed");
                    None
                }
                Err(_) => None,
            };
            (*variant, factor)
        });
        join_all(calls).await.into_iter().collect()
    }
}

fn recommendation(pattern: Pattern) -> Recommendation {
    Recommendation {
        pattern_id: pattern.id,
        pattern_key: pattern.key,
        title: pattern.descriptor,
        expected_engagement: pattern.avg_engagement,
        confidence: pattern.confidence,
        sample_size: pattern.sample_size,
    }
}
