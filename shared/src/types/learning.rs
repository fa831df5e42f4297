//! Learned entities: patterns, insights and performance feedback

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Domain tag every pattern query also matches
pub const GENERAL_DOMAIN: &str = "general";

/// Category of a mined pattern, one per detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    OpeningHook,
    Structure,
    ClosingCta,
    HashtagCombo,
    EngagementTrigger,
    ViralElement,
}

impl PatternCategory {
    /// All categories in application order
    pub const ALL: [PatternCategory; 6] = [
        PatternCategory::OpeningHook,
        PatternCategory::Structure,
        PatternCategory::ClosingCta,
        PatternCategory::HashtagCombo,
        PatternCategory::EngagementTrigger,
        PatternCategory::ViralElement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::OpeningHook => "opening_hook",
            PatternCategory::Structure => "structure",
            PatternCategory::ClosingCta => "closing_cta",
            PatternCategory::HashtagCombo => "hashtag_combo",
            PatternCategory::EngagementTrigger => "engagement_trigger",
            PatternCategory::ViralElement => "viral_element",
        }
    }

    /// Prefix used when building pattern ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            PatternCategory::OpeningHook => "opening",
            PatternCategory::Structure => "structure",
            PatternCategory::ClosingCta => "closing",
            PatternCategory::HashtagCombo => "hashtags",
            PatternCategory::EngagementTrigger => "trigger",
            PatternCategory::ViralElement => "viral",
        }
    }

    /// Build the stable id for a sub-pattern key of this category
    pub fn pattern_id(&self, key: &str) -> String {
        format!("{}_{}", self.id_prefix(), key)
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PatternCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternCategory::ALL
            .iter()
            .find(|category| category.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Unknown pattern category: {s}"))
    }
}

/// A structural or linguistic trait associated with high engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub category: PatternCategory,
    /// Detector sub-pattern key, e.g. `question_cta`
    pub key: String,
    /// Human-readable title
    pub descriptor: String,
    pub avg_engagement: f64,
    pub sample_size: u32,
    pub domains: Vec<String>,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub discovered_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
    pub usage_count: u64,
}

impl Pattern {
    /// Ranking strength used by every pattern ordering
    pub fn strength(&self) -> f64 {
        self.avg_engagement * self.confidence
    }

    /// True if the pattern applies to `domain` (or is tagged general)
    pub fn matches_domain(&self, domain: &str) -> bool {
        self.domains
            .iter()
            .any(|d| d == domain || d == GENERAL_DOMAIN)
    }
}

/// Class of derived insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    VariantPerformance,
    TopPattern,
    OptimalLength,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::VariantPerformance => "variant_performance",
            InsightKind::TopPattern => "top_pattern",
            InsightKind::OptimalLength => "optimal_length",
        }
    }
}

impl std::str::FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "variant_performance" => Ok(InsightKind::VariantPerformance),
            "top_pattern" => Ok(InsightKind::TopPattern),
            "optimal_length" => Ok(InsightKind::OptimalLength),
            _ => Err(format!("Unknown insight kind: {s}")),
        }
    }
}

/// Human-readable recommendation synthesized from a learning cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub kind: InsightKind,
    pub description: String,
    pub recommendation: String,
    /// Expected improvement in [0, 1]
    pub impact_score: f64,
    /// Confidence in the evidence in [0, 1]
    pub evidence_strength: f64,
    pub applicable_domains: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Insight {
    pub fn priority(&self) -> f64 {
        self.impact_score * self.evidence_strength
    }
}

/// Performance tier of an observed outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceTier {
    Viral,
    High,
    Medium,
    Low,
}

impl PerformanceTier {
    /// Classify an engagement value; every boundary is inclusive
    pub fn classify(actual: f64, thresholds: &TierThresholds) -> Self {
        if actual >= thresholds.viral {
            PerformanceTier::Viral
        } else if actual >= thresholds.high {
            PerformanceTier::High
        } else if actual >= thresholds.medium {
            PerformanceTier::Medium
        } else {
            PerformanceTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceTier::Viral => "viral",
            PerformanceTier::High => "high",
            PerformanceTier::Medium => "medium",
            PerformanceTier::Low => "low",
        }
    }
}

impl std::str::FromStr for PerformanceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viral" => Ok(PerformanceTier::Viral),
            "high" => Ok(PerformanceTier::High),
            "medium" => Ok(PerformanceTier::Medium),
            "low" => Ok(PerformanceTier::Low),
            _ => Err(format!("Unknown performance tier: {s}")),
        }
    }
}

/// Lower bounds of each performance tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    pub viral: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            viral: 0.8,
            high: 0.6,
            medium: 0.3,
        }
    }
}

/// Real outcome of published content, upserted by `content_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceFeedback {
    pub content_id: String,
    pub variant_type: String,
    pub actual_engagement: f64,
    pub predicted_engagement: f64,
    pub prediction_error: f64,
    pub tier: PerformanceTier,
    pub audience_signals: HashMap<String, serde_json::Value>,
    pub content_features: HashMap<String, serde_json::Value>,
    pub recorded_at: DateTime<Utc>,
}

/// Calibration aggregate for one variant type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantAggregate {
    pub mean_actual: f64,
    pub mean_error: f64,
    pub sample_count: u64,
}

/// Calibration aggregates over all stored feedback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAggregates {
    pub by_variant: HashMap<String, VariantAggregate>,
}

impl FeedbackAggregates {
    /// Mean observed engagement for a variant type, if any feedback exists
    pub fn mean_engagement(&self, variant_type: &str) -> Option<f64> {
        self.by_variant
            .get(variant_type)
            .filter(|aggregate| aggregate.sample_count > 0)
            .map(|aggregate| aggregate.mean_actual)
    }
}
