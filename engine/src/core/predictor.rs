//! Weighted engagement prediction
//!
//! The predictor never performs I/O: feedback aggregates and the model
//! judgment are handed in by the caller, so equal inputs give equal scores.

use regex::Regex;
use serde::{Deserialize, Serialize};
use shared::{Complexity, FeedbackAggregates, QueryContext};

use crate::config::PredictorConfig;
use crate::core::detectors::compile;
use crate::core::stats::char_len;
use crate::error::EngineResult;

/// Signal names read from the query context
pub const CONTROVERSY_SIGNAL: &str = "controversy";
pub const INNOVATION_SIGNAL: &str = "innovation";

/// The four factors behind one prediction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionFactors {
    pub content: f64,
    pub historical: f64,
    pub context: f64,
    pub model: f64,
}

#[derive(Debug, Clone)]
pub struct EngagementPredictor {
    config: PredictorConfig,
    emoji: Regex,
    hashtag: Regex,
    data_points: Vec<Regex>,
    contrarian_words: Vec<String>,
    personal_phrases: Vec<String>,
    call_to_action_phrases: Vec<String>,
}

fn lowered(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

fn in_range(value: usize, range: (usize, usize)) -> bool {
    (range.0..=range.1).contains(&value)
}

impl EngagementPredictor {
    pub fn new(config: PredictorConfig) -> EngineResult<Self> {
        let data_points = config
            .data_patterns
            .iter()
            .map(|p| compile("predictor.data_patterns", p))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self {
            emoji: compile("predictor.emoji_pattern", &config.emoji_pattern)?,
            hashtag: compile("predictor.hashtag_pattern", &config.hashtag_pattern)?,
            data_points,
            contrarian_words: lowered(&config.contrarian_words),
            personal_phrases: lowered(&config.personal_phrases),
            call_to_action_phrases: lowered(&config.call_to_action_phrases),
            config,
        })
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Intrinsic quality of the text, capped at 1.0
    pub fn content_factor(&self, content: &str) -> f64 {
        let bonuses = &self.config.bonuses;
        let text = content.to_lowercase();
        let contains_any = |phrases: &[String]| phrases.iter().any(|p| text.contains(p.as_str()));

        let mut score = self.config.content_base;
        if in_range(char_len(content), self.config.length_range) {
            score += bonuses.length;
        }
        if content.trim_end().ends_with('?') {
            score += bonuses.question;
        }
        if in_range(self.emoji.find_iter(content).count(), self.config.emoji_range) {
            score += bonuses.emoji;
        }
        if in_range(self.hashtag.find_iter(content).count(), self.config.hashtag_range) {
            score += bonuses.hashtags;
        }
        if contains_any(&self.contrarian_words) {
            score += bonuses.contrarian;
        }
        if self.data_points.iter().any(|p| p.is_match(&text)) {
            score += bonuses.data;
        }
        if contains_any(&self.personal_phrases) {
            score += bonuses.personal;
        }
        if contains_any(&self.call_to_action_phrases) {
            score += bonuses.call_to_action;
        }
        score.min(1.0)
    }

    /// Observed mean engagement of the variant type, neutral when unseen
    pub fn historical_factor(&self, variant_type: &str, aggregates: &FeedbackAggregates) -> f64 {
        aggregates
            .mean_engagement(variant_type)
            .map(|mean| mean.clamp(0.0, 1.0))
            .unwrap_or(self.config.neutral_factor)
    }

    pub fn context_factor(&self, query: &QueryContext) -> f64 {
        let bonuses = &self.config.context;
        let mut score = self.config.context_base;
        match query.complexity {
            Complexity::CrossDomain => score += bonuses.cross_domain,
            Complexity::Contrarian => score += bonuses.contrarian,
            Complexity::Simple => {}
        }
        if query.signal(CONTROVERSY_SIGNAL) > bonuses.controversy_threshold {
            score += bonuses.controversy;
        }
        if query.signal(INNOVATION_SIGNAL) > bonuses.innovation_threshold {
            score += bonuses.innovation;
        }
        score.min(1.0)
    }

    pub fn breakdown(
        &self,
        content: &str,
        variant_type: &str,
        query: &QueryContext,
        aggregates: &FeedbackAggregates,
        model_factor: Option<f64>,
    ) -> PredictionFactors {
        PredictionFactors {
            content: self.content_factor(content),
            historical: self.historical_factor(variant_type, aggregates),
            context: self.context_factor(query),
            model: model_factor
                .filter(|m| m.is_finite())
                .map(|m| m.clamp(0.0, 1.0))
                .unwrap_or(self.config.neutral_factor),
        }
    }

    /// Weighted engagement prediction in [0, 1]
    ///
    /// `model_factor` is the generation service's judgment, `None` when the
    /// service could not provide one.
    pub fn predict(
        &self,
        content: &str,
        variant_type: &str,
        query: &QueryContext,
        aggregates: &FeedbackAggregates,
        model_factor: Option<f64>,
    ) -> f64 {
        let factors = self.breakdown(content, variant_type, query, aggregates, model_factor);
        let weights = &self.config.weights;
        let score = weights.content * factors.content
            + weights.historical * factors.historical
            + weights.context * factors.context
            + weights.model * factors.model;
        score.clamp(0.0, 1.0)
    }
}
