//! Engine configuration
//!
//! Every threshold, lexicon and regex the learning loop uses lives here so the
//! detectors and scorers stay data-driven. Configuration is read from a TOML
//! file; any missing section or field falls back to its default.

use serde::{Deserialize, Serialize};
use shared::TierThresholds;
use std::path::{Path, PathBuf};

use crate::error::EngineResult;

/// Environment variable naming a config file when `--config` is absent
pub const CONFIG_ENV_VAR: &str = "CONTENT_ENGINE_CONFIG";

/// Regex matching one emoji codepoint in the common pictograph blocks
pub const DEFAULT_EMOJI_PATTERN: &str = r"[\x{1F300}-\x{1FAFF}\x{2600}-\x{27BF}]";

/// Regex matching one hashtag
pub const DEFAULT_HASHTAG_PATTERN: &str = r"#\w+";

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub extractor: ExtractorConfig,
    pub insights: InsightConfig,
    pub predictor: PredictorConfig,
    pub optimizer: OptimizerConfig,
    pub feedback: FeedbackConfig,
    pub store: StoreConfig,
}

impl EngineConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> EngineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load from an explicit path, then `CONTENT_ENGINE_CONFIG`, else defaults
    pub fn load(explicit: Option<&Path>) -> EngineResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }
}

/// A named detector rule matched by phrase substrings or regexes
///
/// Phrases are matched case-insensitively against the inspected text. The
/// optional `insertion` is the text a transformation adds to make content
/// exhibit this rule; rules without one are mined but never applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRule {
    pub key: String,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub insertion: Option<String>,
}

impl MatchRule {
    fn phrases(key: &str, phrases: &[&str], insertion: &str) -> Self {
        Self {
            key: key.to_string(),
            phrases: strings(phrases),
            patterns: Vec::new(),
            insertion: Some(insertion.to_string()),
        }
    }

    fn patterns(key: &str, patterns: &[&str], insertion: &str) -> Self {
        Self {
            key: key.to_string(),
            phrases: Vec::new(),
            patterns: strings(patterns),
            insertion: Some(insertion.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Share of the batch treated as high performers
    pub high_performer_fraction: f64,
    /// Records at or above this engagement always count as high performers
    pub high_performer_floor: f64,
    /// Minimum exhibiting records for a pattern
    pub min_occurrences: usize,
    /// Patterns at or below this confidence are dropped
    pub min_confidence: f64,
    pub max_patterns: usize,
    pub opening: OpeningDetectorConfig,
    pub structure: StructureDetectorConfig,
    pub closing: ClosingDetectorConfig,
    pub hashtags: HashtagDetectorConfig,
    pub triggers: TriggerDetectorConfig,
    pub viral: ViralDetectorConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            high_performer_fraction: 0.2,
            high_performer_floor: 0.8,
            min_occurrences: 2,
            min_confidence: 0.6,
            max_patterns: 20,
            opening: OpeningDetectorConfig::default(),
            structure: StructureDetectorConfig::default(),
            closing: ClosingDetectorConfig::default(),
            hashtags: HashtagDetectorConfig::default(),
            triggers: TriggerDetectorConfig::default(),
            viral: ViralDetectorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningDetectorConfig {
    pub confidence_divisor: f64,
    /// The first sentence is cut to this many characters
    pub sentence_chars: usize,
    pub start_emojis: Vec<String>,
    pub rules: Vec<MatchRule>,
}

impl Default for OpeningDetectorConfig {
    fn default() -> Self {
        Self {
            confidence_divisor: 5.0,
            sentence_chars: 100,
            start_emojis: strings(&["🧠", "💡", "🔥", "📊"]),
            rules: vec![
                MatchRule::phrases("heres_what_pattern", &["here's what"], "Here's what most people miss:"),
                MatchRule::phrases(
                    "everyone_misses_pattern",
                    &["everyone misses", "most people miss"],
                    "Here's what most people miss:",
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureDetectorConfig {
    pub confidence_divisor: f64,
    pub numbered_list_pattern: String,
    pub bullet_markers: Vec<String>,
    pub min_bullets: usize,
    pub framework_pattern: String,
    pub story_words: Vec<String>,
    pub min_story_words: usize,
}

impl Default for StructureDetectorConfig {
    fn default() -> Self {
        Self {
            confidence_divisor: 4.0,
            numbered_list_pattern: r"\n\d+\.".to_string(),
            bullet_markers: strings(&["•", "-"]),
            min_bullets: 3,
            framework_pattern: r"\b\d+-\d+-\d+\b".to_string(),
            story_words: strings(&["first", "then", "finally", "initially", "eventually"]),
            min_story_words: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosingDetectorConfig {
    pub confidence_divisor: f64,
    /// Number of trailing lines inspected
    pub tail_lines: usize,
    /// Inserted when content should close on a question
    pub question_insertion: String,
    pub rules: Vec<MatchRule>,
}

impl Default for ClosingDetectorConfig {
    fn default() -> Self {
        Self {
            confidence_divisor: 3.0,
            tail_lines: 3,
            question_insertion: "What's your take on this?".to_string(),
            rules: vec![
                MatchRule::phrases(
                    "opinion_request",
                    &["what do you think", "what's your take"],
                    "What do you think about this?",
                ),
                MatchRule::phrases(
                    "share_request",
                    &["share your"],
                    "Will you share your experience with similar challenges?",
                ),
                MatchRule::phrases("feedback_request", &["let me know"], "Let me know: what would you add?"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashtagDetectorConfig {
    pub confidence_divisor: f64,
    pub pattern: String,
    pub min_tags: usize,
}

impl Default for HashtagDetectorConfig {
    fn default() -> Self {
        Self {
            confidence_divisor: 3.0,
            pattern: DEFAULT_HASHTAG_PATTERN.to_string(),
            min_tags: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerDetectorConfig {
    pub confidence_divisor: f64,
    pub rules: Vec<MatchRule>,
}

impl Default for TriggerDetectorConfig {
    fn default() -> Self {
        Self {
            confidence_divisor: 3.0,
            rules: vec![
                MatchRule::phrases(
                    "contrarian_words",
                    &["however", "but", "contrarian", "unpopular", "different"],
                    "However, my cross-domain analysis reveals a different perspective.",
                ),
                MatchRule::patterns(
                    "data_points",
                    &[r"\d+%", r"\d+x", r"\$\d+", r"\d+\.\d+"],
                    "The data shows 73% improvement with this approach.",
                ),
                MatchRule::phrases(
                    "personal_experience",
                    &["my experience", "i learned", "when i", "i discovered"],
                    "In my experience, the details matter more than the headline.",
                ),
                MatchRule::phrases(
                    "urgency_words",
                    &["now", "today", "urgent", "critical", "immediately"],
                    "This matters today more than ever.",
                ),
                MatchRule::phrases(
                    "curiosity_gaps",
                    &["secret", "hidden", "unknown", "surprising", "shocking"],
                    "The hidden lesson is rarely discussed.",
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViralDetectorConfig {
    /// Percentile of high-performer engagement that marks viral posts
    pub percentile: f64,
    pub length_range: (usize, usize),
    pub emoji_range: (usize, usize),
    pub emoji_pattern: String,
    /// Fixed confidence for viral patterns
    pub confidence: f64,
}

impl Default for ViralDetectorConfig {
    fn default() -> Self {
        Self {
            percentile: 95.0,
            length_range: (200, 300),
            emoji_range: (2, 5),
            emoji_pattern: DEFAULT_EMOJI_PATTERN.to_string(),
            confidence: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub min_variant_gap: f64,
    pub gap_impact_multiplier: f64,
    pub gap_evidence_divisor: f64,
    pub top_pattern_min_confidence: f64,
    pub top_pattern_min_engagement: f64,
    /// Batches must be larger than this for a length insight
    pub length_min_batch: usize,
    pub length_band: usize,
    pub length_impact: f64,
    pub length_evidence_divisor: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            min_variant_gap: 0.1,
            gap_impact_multiplier: 2.0,
            gap_evidence_divisor: 10.0,
            top_pattern_min_confidence: 0.8,
            top_pattern_min_engagement: 0.6,
            length_min_batch: 10,
            length_band: 50,
            length_impact: 0.7,
            length_evidence_divisor: 20.0,
        }
    }
}

/// Weights of the four prediction factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorWeights {
    pub content: f64,
    pub historical: f64,
    pub context: f64,
    pub model: f64,
}

impl Default for PredictorWeights {
    fn default() -> Self {
        Self {
            content: 0.30,
            historical: 0.25,
            context: 0.20,
            model: 0.25,
        }
    }
}

/// Additive content-factor bonuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentBonuses {
    pub length: f64,
    pub question: f64,
    pub emoji: f64,
    pub hashtags: f64,
    pub contrarian: f64,
    pub data: f64,
    pub personal: f64,
    pub call_to_action: f64,
}

impl Default for ContentBonuses {
    fn default() -> Self {
        Self {
            length: 0.15,
            question: 0.10,
            emoji: 0.08,
            hashtags: 0.07,
            contrarian: 0.20,
            data: 0.15,
            personal: 0.12,
            call_to_action: 0.13,
        }
    }
}

/// Context-factor bonuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextBonuses {
    pub cross_domain: f64,
    pub contrarian: f64,
    pub controversy_threshold: f64,
    pub controversy: f64,
    pub innovation_threshold: f64,
    pub innovation: f64,
}

impl Default for ContextBonuses {
    fn default() -> Self {
        Self {
            cross_domain: 0.2,
            contrarian: 0.15,
            controversy_threshold: 0.7,
            controversy: 0.1,
            innovation_threshold: 0.8,
            innovation: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub weights: PredictorWeights,
    pub content_base: f64,
    pub context_base: f64,
    /// Used for historical and model factors when no signal exists
    pub neutral_factor: f64,
    pub bonuses: ContentBonuses,
    pub context: ContextBonuses,
    pub length_range: (usize, usize),
    pub emoji_range: (usize, usize),
    pub hashtag_range: (usize, usize),
    pub emoji_pattern: String,
    pub hashtag_pattern: String,
    pub contrarian_words: Vec<String>,
    pub data_patterns: Vec<String>,
    pub personal_phrases: Vec<String>,
    pub call_to_action_phrases: Vec<String>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            weights: PredictorWeights::default(),
            content_base: 0.5,
            context_base: 0.5,
            neutral_factor: 0.5,
            bonuses: ContentBonuses::default(),
            context: ContextBonuses::default(),
            length_range: (150, 300),
            emoji_range: (2, 5),
            hashtag_range: (3, 7),
            emoji_pattern: DEFAULT_EMOJI_PATTERN.to_string(),
            hashtag_pattern: DEFAULT_HASHTAG_PATTERN.to_string(),
            contrarian_words: strings(&["however", "but", "contrarian", "different", "alternative", "unpopular"]),
            data_patterns: strings(&[r"\d+%|\d+x|\$\d+"]),
            personal_phrases: strings(&["my experience", "i learned", "when i", "i discovered"]),
            call_to_action_phrases: strings(&["what do you think", "share your", "let me know", "thoughts?"]),
        }
    }
}

/// Quality scoring rules applied on top of the base prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub base_weight: f64,
    pub quality_weight: f64,
    pub length_range: (usize, usize),
    pub hashtag_range: (usize, usize),
    pub in_range_score: f64,
    pub out_of_range_score: f64,
    pub question_score: f64,
    pub no_question_score: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            base_weight: 0.7,
            quality_weight: 0.1,
            length_range: (200, 300),
            hashtag_range: (3, 7),
            in_range_score: 1.0,
            out_of_range_score: 0.8,
            question_score: 1.0,
            no_question_score: 0.9,
        }
    }
}

/// A/B test plan defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentDefaults {
    pub arms: usize,
    pub min_sample_size: u32,
    pub confidence_level: f64,
    pub duration_days: u32,
    /// Traffic percentages when learning was applied
    pub learning_split: Vec<u8>,
    /// Traffic percentages for the non-learning baseline
    pub baseline_split: Vec<u8>,
}

impl Default for ExperimentDefaults {
    fn default() -> Self {
        Self {
            arms: 3,
            min_sample_size: 500,
            confidence_level: 0.95,
            duration_days: 7,
            learning_split: vec![40, 30, 30],
            baseline_split: vec![50, 25, 25],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub recommendation_min_confidence: f64,
    pub recommendations_per_category: usize,
    /// Patterns fetched per domain query
    pub recommendation_query_limit: usize,
    pub boost_factor: f64,
    pub boost_cap: f64,
    pub generation_timeout_secs: u64,
    pub source_limit: usize,
    /// Filler line used to pad short content towards the viral length
    pub length_filler: String,
    /// Content longer than this is trimmed towards the viral length
    pub trim_above_chars: usize,
    pub trim_keep_lines: usize,
    pub score: ScoreConfig,
    pub experiment: ExperimentDefaults,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            recommendation_min_confidence: 0.7,
            recommendations_per_category: 3,
            recommendation_query_limit: 50,
            boost_factor: 0.1,
            boost_cap: 0.3,
            generation_timeout_secs: 20,
            source_limit: 3,
            length_filler: "This cross-domain insight comes from experience bridging engineering, policy, and product management."
                .to_string(),
            trim_above_chars: 350,
            trim_keep_lines: 8,
            score: ScoreConfig::default(),
            experiment: ExperimentDefaults::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub tiers: TierThresholds,
    /// Range of the uniform noise `simulate` adds to a prediction
    pub simulation_range: (f64, f64),
    /// Re-run a learning cycle after every ingested outcome
    pub relearn_on_ingest: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            tiers: TierThresholds::default(),
            simulation_range: (-0.15, 0.25),
            relearn_on_ingest: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/learning_loop.db"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [optimizer]
            boost_cap = 0.2

            [feedback.tiers]
            viral = 0.9
            "#,
        )
        .unwrap();

        assert_eq!(config.optimizer.boost_cap, 0.2);
        assert_eq!(config.optimizer.boost_factor, 0.1);
        assert_eq!(config.feedback.tiers.viral, 0.9);
        assert_eq!(config.feedback.tiers.high, 0.6);
        assert_eq!(config.extractor, ExtractorConfig::default());
    }

    #[test]
    fn test_custom_trigger_rule_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [[extractor.triggers.rules]]
            key = "social_proof"
            phrases = ["thousands of", "everyone is"]
            "#,
        )
        .unwrap();

        let rules = &config.extractor.triggers.rules;
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].key, "social_proof");
        assert!(rules[0].insertion.is_none());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(EngineConfig::from_toml_str("[optimizer\nboost_cap = ").is_err());
    }

    #[test]
    fn test_explicit_path_loads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "[store]\ndatabase_path = \"custom.db\"\n").unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store.database_path, PathBuf::from("custom.db"));
    }
}
