//! Output-side types produced by one optimization call

use super::{PatternCategory, VariantKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A learned pattern surfaced as a suggestion for new content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub pattern_id: String,
    pub pattern_key: String,
    pub title: String,
    pub expected_engagement: f64,
    pub confidence: f64,
    pub sample_size: u32,
}

impl Recommendation {
    pub fn strength(&self) -> f64 {
        self.expected_engagement * self.confidence
    }
}

/// Ranked recommendations grouped by pattern category
pub type Recommendations = BTreeMap<PatternCategory, Vec<Recommendation>>;

/// One arm of an A/B test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentArm {
    pub variant: VariantKind,
    pub content: String,
    pub predicted_engagement: f64,
    /// Share of traffic in percent
    pub traffic_percent: u8,
}

/// A/B test plan for the best variants of one optimization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub experiment_id: String,
    pub arms: Vec<ExperimentArm>,
    pub success_metrics: Vec<String>,
    pub min_sample_size: u32,
    pub confidence_level: f64,
    pub duration_days: u32,
    pub learning_enhanced: bool,
    pub expected_improvement: f64,
}

/// Per-run counters collected by the optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub latency_ms: u64,
    pub generation_failures: u32,
    pub template_fallbacks: u32,
    pub store_degraded: bool,
    /// Highest enhanced prediction across variants
    pub engagement_potential: f64,
}

impl RunMetrics {
    /// Zero-valued metrics for a fresh run
    pub fn zeroed() -> Self {
        Self {
            latency_ms: 0,
            generation_failures: 0,
            template_fallbacks: 0,
            store_degraded: false,
            engagement_potential: 0.0,
        }
    }
}

/// Summary of how learning influenced one optimization call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningMetadata {
    pub learning_applied: bool,
    pub patterns_applied: usize,
    /// Boost of the recommended variant
    pub boost: f64,
    pub recommendations_consumed: usize,
    /// Best enhanced prediction minus best base prediction
    pub learning_improvement: f64,
    pub generation_degraded: bool,
    pub metrics: RunMetrics,
}

/// Result of one optimization call, correlated with later feedback by `tracking_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizedContent {
    pub primary_content: String,
    pub variants: BTreeMap<VariantKind, String>,
    pub base_predictions: BTreeMap<VariantKind, f64>,
    pub enhanced_predictions: BTreeMap<VariantKind, f64>,
    pub optimization_scores: BTreeMap<VariantKind, f64>,
    pub recommended_variant: VariantKind,
    pub applied_patterns: Vec<String>,
    pub recommendations: Recommendations,
    pub experiment: ExperimentConfig,
    pub tracking_id: String,
    pub metadata: LearningMetadata,
    pub created_at: DateTime<Utc>,
}

impl OptimizedContent {
    /// Boost of a variant over its base prediction
    pub fn boost(&self, variant: VariantKind) -> f64 {
        let base = self.base_predictions.get(&variant).copied().unwrap_or(0.0);
        let enhanced = self.enhanced_predictions.get(&variant).copied().unwrap_or(0.0);
        enhanced - base
    }
}

/// Variant texts remembered so feedback can resolve them later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedContent {
    pub tracking_id: String,
    pub topic: String,
    pub domains: Vec<String>,
    pub variants: BTreeMap<VariantKind, String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_metrics() {
        let metrics = RunMetrics::zeroed();
        assert_eq!(metrics.latency_ms, 0);
        assert_eq!(metrics.generation_failures, 0);
        assert!(!metrics.store_degraded);
        assert_eq!(metrics.engagement_potential, 0.0);
    }

    #[test]
    fn test_recommendations_serialize_by_category_name() {
        let mut recommendations = Recommendations::new();
        recommendations.insert(
            PatternCategory::ClosingCta,
            vec![Recommendation {
                pattern_id: "closing_question_cta".to_string(),
                pattern_key: "question_cta".to_string(),
                title: "Question Cta".to_string(),
                expected_engagement: 0.85,
                confidence: 1.0,
                sample_size: 3,
            }],
        );

        let json = serde_json::to_value(&recommendations).unwrap();
        assert!(json.get("closing_cta").is_some());
    }
}
