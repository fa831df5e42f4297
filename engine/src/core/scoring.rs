//! Boost, quality scoring, variant selection and experiment planning

use regex::Regex;
use shared::{ExperimentArm, ExperimentConfig, VariantKind};
use std::collections::BTreeMap;

use crate::config::{ExperimentDefaults, OptimizerConfig, ScoreConfig};
use crate::core::detectors::compile;
use crate::core::stats::char_len;
use crate::core::transforms::AppliedPattern;
use crate::error::EngineResult;

pub const ENGAGEMENT_RATE_METRIC: &str = "engagement_rate";
pub const VIRAL_COEFFICIENT_METRIC: &str = "viral_coefficient";
pub const LEARNING_ACCURACY_METRIC: &str = "learning_accuracy";

#[derive(Debug, Clone)]
pub struct VariantScorer {
    score: ScoreConfig,
    experiment: ExperimentDefaults,
    boost_factor: f64,
    boost_cap: f64,
    hashtag: Regex,
}

impl VariantScorer {
    /// `hashtag_pattern` is shared with the predictor so both count the same tags
    pub fn new(config: &OptimizerConfig, hashtag_pattern: &str) -> EngineResult<Self> {
        Ok(Self {
            score: config.score.clone(),
            experiment: config.experiment.clone(),
            boost_factor: config.boost_factor,
            boost_cap: config.boost_cap,
            hashtag: compile("predictor.hashtag_pattern", hashtag_pattern)?,
        })
    }

    /// Summed `confidence × expected engagement × factor`, capped
    pub fn learning_boost(&self, applied: &[AppliedPattern]) -> f64 {
        let raw: f64 = applied
            .iter()
            .map(|pattern| pattern.confidence * pattern.expected_engagement * self.boost_factor)
            .sum();
        raw.clamp(0.0, self.boost_cap)
    }

    /// Base prediction blended with length, hashtag and question quality
    pub fn optimization_score(&self, content: &str, base_prediction: f64) -> f64 {
        let rules = &self.score;
        let band = |value: usize, range: (usize, usize)| {
            if (range.0..=range.1).contains(&value) {
                rules.in_range_score
            } else {
                rules.out_of_range_score
            }
        };
        let length_score = band(char_len(content), rules.length_range);
        let hashtag_score = band(self.hashtag.find_iter(content).count(), rules.hashtag_range);
        let question_score = if content.trim_end().ends_with('?') {
            rules.question_score
        } else {
            rules.no_question_score
        };

        rules.base_weight * base_prediction + rules.quality_weight * (length_score + hashtag_score + question_score)
    }

    /// Experiment arms from the best variants by enhanced prediction
    pub fn experiment_config(
        &self,
        experiment_id: &str,
        variants: &BTreeMap<VariantKind, String>,
        enhanced: &BTreeMap<VariantKind, f64>,
        learning_applied: bool,
    ) -> ExperimentConfig {
        let defaults = &self.experiment;
        let split = if learning_applied {
            &defaults.learning_split
        } else {
            &defaults.baseline_split
        };

        let arms: Vec<ExperimentArm> = ranked_variants(enhanced)
            .into_iter()
            .take(defaults.arms)
            .zip(split.iter())
            .map(|((variant, predicted), traffic)| ExperimentArm {
                variant,
                content: variants.get(&variant).cloned().unwrap_or_default(),
                predicted_engagement: predicted,
                traffic_percent: *traffic,
            })
            .collect();

        let mut success_metrics = vec![ENGAGEMENT_RATE_METRIC.to_string(), VIRAL_COEFFICIENT_METRIC.to_string()];
        if learning_applied {
            success_metrics.push(LEARNING_ACCURACY_METRIC.to_string());
        }

        let values = enhanced.values().copied();
        let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
        let min = values.fold(f64::INFINITY, f64::min);
        let expected_improvement = if enhanced.is_empty() { 0.0 } else { max - min };

        ExperimentConfig {
            experiment_id: experiment_id.to_string(),
            arms,
            success_metrics,
            min_sample_size: defaults.min_sample_size,
            confidence_level: defaults.confidence_level,
            duration_days: defaults.duration_days,
            learning_enhanced: learning_applied,
            expected_improvement,
        }
    }
}

/// Variants by descending prediction, ties in declaration order
pub fn ranked_variants(predictions: &BTreeMap<VariantKind, f64>) -> Vec<(VariantKind, f64)> {
    let mut ranked: Vec<(VariantKind, f64)> = VariantKind::ALL
        .iter()
        .filter_map(|variant| predictions.get(variant).map(|p| (*variant, *p)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// The variant with the highest prediction, first in declaration order on ties
pub fn recommend(predictions: &BTreeMap<VariantKind, f64>) -> VariantKind {
    ranked_variants(predictions)
        .first()
        .map(|(variant, _)| *variant)
        .unwrap_or(VariantKind::Analytical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_HASHTAG_PATTERN;
    use crate::error::EngineError;
    use shared::PatternCategory;

    fn scorer() -> VariantScorer {
        VariantScorer::new(&OptimizerConfig::default(), DEFAULT_HASHTAG_PATTERN).unwrap()
    }

    fn applied(confidence: f64, expected: f64) -> AppliedPattern {
        AppliedPattern {
            pattern_id: "p".to_string(),
            category: PatternCategory::Structure,
            confidence,
            expected_engagement: expected,
            modified: true,
        }
    }

    fn predictions(values: [f64; 4]) -> BTreeMap<VariantKind, f64> {
        VariantKind::ALL.iter().copied().zip(values).collect()
    }

    #[test]
    fn test_boost_sums_and_caps() {
        let s = scorer();
        assert_eq!(s.learning_boost(&[]), 0.0);
        let boost = s.learning_boost(&[applied(1.0, 0.9), applied(0.8, 0.5)]);
        assert!((boost - 0.13).abs() < 1e-12);
        let capped = s.learning_boost(&vec![applied(1.0, 1.0); 6]);
        assert!((capped - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_optimization_score() {
        let s = scorer();
        let ideal = format!("{} #a #b #c?", "z".repeat(240));
        assert!((s.optimization_score(&ideal, 0.5) - 0.65).abs() < 1e-9);
        assert!((s.optimization_score("short", 0.5) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_custom_tag_pattern_drives_quality_score() {
        let cashtags = VariantScorer::new(&OptimizerConfig::default(), r"\$[A-Za-z]+").unwrap();
        let content = format!("{} $a $b $c?", "z".repeat(240));
        assert!((cashtags.optimization_score(&content, 0.5) - 0.65).abs() < 1e-9);
        assert!((scorer().optimization_score(&content, 0.5) - 0.63).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_tag_pattern_names_predictor_key() {
        let result = VariantScorer::new(&OptimizerConfig::default(), "#(");
        assert!(matches!(
            result,
            Err(EngineError::Configuration { ref field, .. }) if field == "predictor.hashtag_pattern"
        ));
    }

    #[test]
    fn test_recommend_breaks_ties_by_declaration_order() {
        assert_eq!(recommend(&predictions([0.5, 0.7, 0.7, 0.6])), VariantKind::Engaging);
        assert_eq!(recommend(&predictions([0.4, 0.4, 0.4, 0.4])), VariantKind::Analytical);
        assert_eq!(recommend(&predictions([0.1, 0.2, 0.3, 0.9])), VariantKind::DataDriven);
    }

    #[test]
    fn test_experiment_uses_top_three_and_learning_split() {
        let s = scorer();
        let enhanced = predictions([0.5, 0.8, 0.6, 0.7]);
        let variants: BTreeMap<VariantKind, String> =
            VariantKind::ALL.iter().map(|v| (*v, v.as_str().to_string())).collect();

        let learned = s.experiment_config("exp", &variants, &enhanced, true);
        let order: Vec<VariantKind> = learned.arms.iter().map(|a| a.variant).collect();
        assert_eq!(order, vec![VariantKind::Engaging, VariantKind::DataDriven, VariantKind::Contrarian]);
        let split: Vec<u8> = learned.arms.iter().map(|a| a.traffic_percent).collect();
        assert_eq!(split, vec![40, 30, 30]);
        assert_eq!(learned.arms[0].content, "engaging");
        assert!(learned.success_metrics.contains(&LEARNING_ACCURACY_METRIC.to_string()));
        assert!((learned.expected_improvement - 0.3).abs() < 1e-12);
        assert_eq!(learned.min_sample_size, 500);
        assert_eq!(learned.duration_days, 7);

        let baseline = s.experiment_config("exp", &variants, &enhanced, false);
        let split: Vec<u8> = baseline.arms.iter().map(|a| a.traffic_percent).collect();
        assert_eq!(split, vec![50, 25, 25]);
        assert_eq!(baseline.success_metrics.len(), 2);
        assert!(!baseline.learning_enhanced);
    }
}
