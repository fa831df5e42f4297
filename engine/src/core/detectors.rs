//! Category detectors compiled from the extractor configuration
//!
//! A detector reports which sub-pattern keys a text exhibits. The same
//! predicates decide whether a transformation is already satisfied, so mining
//! and application can never disagree about what a pattern means.

use regex::Regex;
use shared::PatternCategory;
use std::collections::BTreeSet;

use crate::config::{
    ClosingDetectorConfig, ExtractorConfig, MatchRule, OpeningDetectorConfig, StructureDetectorConfig,
    ViralDetectorConfig,
};
use crate::core::stats::char_len;
use crate::error::{EngineError, EngineResult};

/// Fixed keys emitted by built-in detectors
pub mod keys {
    pub const EMOJI_START_PREFIX: &str = "emoji_start_";
    pub const QUESTION_OPENING: &str = "question_opening";
    pub const NUMBERED_LIST: &str = "numbered_list";
    pub const BULLET_POINTS: &str = "bullet_points";
    pub const FRAMEWORK_STRUCTURE: &str = "framework_structure";
    pub const STORY_STRUCTURE: &str = "story_structure";
    pub const QUESTION_CTA: &str = "question_cta";
    pub const OPTIMAL_LENGTH: &str = "optimal_length";
    pub const OPTIMAL_EMOJI: &str = "optimal_emoji";
    pub const QUESTION_ENDING: &str = "question_ending";
}

pub(crate) fn compile(field: &str, pattern: &str) -> EngineResult<Regex> {
    Regex::new(pattern).map_err(|e| EngineError::configuration(field, e.to_string()))
}

/// A configured rule with its regexes compiled
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub key: String,
    phrases: Vec<String>,
    patterns: Vec<Regex>,
    pub insertion: Option<String>,
}

impl CompiledRule {
    fn compile(field: &str, rule: &MatchRule) -> EngineResult<Self> {
        let patterns = rule
            .patterns
            .iter()
            .map(|p| compile(field, p))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self {
            key: rule.key.clone(),
            phrases: rule.phrases.iter().map(|p| p.to_lowercase()).collect(),
            patterns,
            insertion: rule.insertion.clone(),
        })
    }

    /// Match against already lowercased text
    fn matches(&self, lowered: &str) -> bool {
        self.phrases.iter().any(|phrase| lowered.contains(phrase.as_str()))
            || self.patterns.iter().any(|pattern| pattern.is_match(lowered))
    }
}

#[derive(Debug, Clone)]
struct OpeningDetector {
    sentence_chars: usize,
    start_emojis: Vec<String>,
    rules: Vec<CompiledRule>,
}

impl OpeningDetector {
    fn new(config: &OpeningDetectorConfig) -> EngineResult<Self> {
        Ok(Self {
            sentence_chars: config.sentence_chars,
            start_emojis: config.start_emojis.clone(),
            rules: compile_rules("extractor.opening.rules", &config.rules)?,
        })
    }

    /// First sentence of the first line, cut to the configured length
    fn first_sentence(&self, text: &str) -> String {
        let sentence = text.split('.').next().unwrap_or("");
        let line = sentence.split('\n').next().unwrap_or("");
        line.chars().take(self.sentence_chars).collect()
    }

    fn detect(&self, text: &str) -> Vec<String> {
        let sentence = self.first_sentence(text);
        let lowered = sentence.to_lowercase();
        let mut found = Vec::new();

        if let Some(emoji) = self.start_emojis.iter().find(|e| sentence.starts_with(e.as_str())) {
            found.push(format!("{}{}", keys::EMOJI_START_PREFIX, emoji));
        }
        for rule in &self.rules {
            if rule.matches(&lowered) {
                found.push(rule.key.clone());
            }
        }
        if sentence.trim().ends_with('?') {
            found.push(keys::QUESTION_OPENING.to_string());
        }
        found
    }
}

#[derive(Debug, Clone)]
struct StructureDetector {
    numbered_list: Regex,
    bullet_markers: Vec<String>,
    min_bullets: usize,
    framework: Regex,
    story_words: Vec<String>,
    min_story_words: usize,
}

impl StructureDetector {
    fn new(config: &StructureDetectorConfig) -> EngineResult<Self> {
        Ok(Self {
            numbered_list: compile("extractor.structure.numbered_list_pattern", &config.numbered_list_pattern)?,
            bullet_markers: config.bullet_markers.clone(),
            min_bullets: config.min_bullets,
            framework: compile("extractor.structure.framework_pattern", &config.framework_pattern)?,
            story_words: config.story_words.iter().map(|w| w.to_lowercase()).collect(),
            min_story_words: config.min_story_words,
        })
    }

    fn detect(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        if self.numbered_list.is_match(text) {
            found.push(keys::NUMBERED_LIST.to_string());
        }
        if self
            .bullet_markers
            .iter()
            .any(|marker| !marker.is_empty() && text.matches(marker.as_str()).count() >= self.min_bullets)
        {
            found.push(keys::BULLET_POINTS.to_string());
        }
        if self.framework.is_match(text) {
            found.push(keys::FRAMEWORK_STRUCTURE.to_string());
        }
        let lowered = text.to_lowercase();
        let story_hits = self
            .story_words
            .iter()
            .filter(|word| lowered.contains(word.as_str()))
            .count();
        if story_hits >= self.min_story_words {
            found.push(keys::STORY_STRUCTURE.to_string());
        }
        found
    }
}

#[derive(Debug, Clone)]
struct ClosingDetector {
    tail_lines: usize,
    rules: Vec<CompiledRule>,
}

impl ClosingDetector {
    fn new(config: &ClosingDetectorConfig) -> EngineResult<Self> {
        Ok(Self {
            tail_lines: config.tail_lines.max(1),
            rules: compile_rules("extractor.closing.rules", &config.rules)?,
        })
    }

    /// Last lines joined by spaces, lowercased
    fn closing_text(&self, text: &str) -> String {
        let lines: Vec<&str> = text.split('\n').collect();
        let start = lines.len().saturating_sub(self.tail_lines);
        lines[start..].join(" ").to_lowercase()
    }

    fn detect(&self, text: &str) -> Vec<String> {
        let closing = self.closing_text(text);
        let mut found = Vec::new();
        if closing.ends_with('?') {
            found.push(keys::QUESTION_CTA.to_string());
        }
        for rule in &self.rules {
            if rule.matches(&closing) {
                found.push(rule.key.clone());
            }
        }
        found
    }
}

#[derive(Debug, Clone)]
struct ViralDetector {
    length_range: (usize, usize),
    emoji_range: (usize, usize),
    emoji: Regex,
}

impl ViralDetector {
    fn new(config: &ViralDetectorConfig) -> EngineResult<Self> {
        Ok(Self {
            length_range: config.length_range,
            emoji_range: config.emoji_range,
            emoji: compile("extractor.viral.emoji_pattern", &config.emoji_pattern)?,
        })
    }

    fn detect(&self, text: &str) -> Vec<String> {
        let mut found = Vec::new();
        let length = char_len(text);
        if (self.length_range.0..=self.length_range.1).contains(&length) {
            found.push(keys::OPTIMAL_LENGTH.to_string());
        }
        let emojis = self.emoji.find_iter(text).count();
        if (self.emoji_range.0..=self.emoji_range.1).contains(&emojis) {
            found.push(keys::OPTIMAL_EMOJI.to_string());
        }
        if text.trim().ends_with('?') {
            found.push(keys::QUESTION_ENDING.to_string());
        }
        found
    }
}

fn compile_rules(field: &str, rules: &[MatchRule]) -> EngineResult<Vec<CompiledRule>> {
    rules.iter().map(|rule| CompiledRule::compile(field, rule)).collect()
}

/// All six category detectors
#[derive(Debug, Clone)]
pub struct DetectorSet {
    opening: OpeningDetector,
    structure: StructureDetector,
    closing: ClosingDetector,
    hashtag: Regex,
    min_hashtags: usize,
    triggers: Vec<CompiledRule>,
    viral: ViralDetector,
    divisors: [f64; 5],
    viral_confidence: f64,
}

impl DetectorSet {
    /// Compile every detector, failing on an invalid regex
    pub fn from_config(config: &ExtractorConfig) -> EngineResult<Self> {
        let divisors = [
            config.opening.confidence_divisor,
            config.structure.confidence_divisor,
            config.closing.confidence_divisor,
            config.hashtags.confidence_divisor,
            config.triggers.confidence_divisor,
        ];
        if divisors.iter().any(|d| d.is_nan() || *d <= 0.0) {
            return Err(EngineError::configuration(
                "extractor.*.confidence_divisor",
                "confidence divisors must be positive",
            ));
        }

        Ok(Self {
            opening: OpeningDetector::new(&config.opening)?,
            structure: StructureDetector::new(&config.structure)?,
            closing: ClosingDetector::new(&config.closing)?,
            hashtag: compile("extractor.hashtags.pattern", &config.hashtags.pattern)?,
            min_hashtags: config.hashtags.min_tags,
            triggers: compile_rules("extractor.triggers.rules", &config.triggers.rules)?,
            viral: ViralDetector::new(&config.viral)?,
            divisors,
            viral_confidence: config.viral.confidence.clamp(0.0, 1.0),
        })
    }

    /// Keys of `category` the text exhibits
    pub fn detect(&self, category: PatternCategory, text: &str) -> Vec<String> {
        match category {
            PatternCategory::OpeningHook => self.opening.detect(text),
            PatternCategory::Structure => self.structure.detect(text),
            PatternCategory::ClosingCta => self.closing.detect(text),
            PatternCategory::HashtagCombo => {
                let tags = self.hashtags(text);
                if tags.len() >= self.min_hashtags {
                    vec![hashtag_combo_key(&tags)]
                } else {
                    Vec::new()
                }
            }
            PatternCategory::EngagementTrigger => {
                let lowered = text.to_lowercase();
                self.triggers
                    .iter()
                    .filter(|rule| rule.matches(&lowered))
                    .map(|rule| rule.key.clone())
                    .collect()
            }
            PatternCategory::ViralElement => self.viral.detect(text),
        }
    }

    /// Whether the text satisfies one sub-pattern
    ///
    /// A hashtag combo is satisfied when every tag of the combo is present,
    /// even alongside extra tags.
    pub fn exhibits(&self, category: PatternCategory, key: &str, text: &str) -> bool {
        match category {
            PatternCategory::HashtagCombo => {
                let present: BTreeSet<String> = self.hashtags(text).into_iter().collect();
                let wanted = hashtag_combo_tags(key);
                !wanted.is_empty() && wanted.iter().all(|tag| present.contains(tag))
            }
            _ => self.detect(category, text).iter().any(|found| found == key),
        }
    }

    /// Distinct hashtags in sorted order
    pub fn hashtags(&self, text: &str) -> Vec<String> {
        self.hashtag
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Confidence for a pattern seen `sample_size` times
    pub fn confidence(&self, category: PatternCategory, sample_size: usize) -> f64 {
        let divisor = match category {
            PatternCategory::OpeningHook => self.divisors[0],
            PatternCategory::Structure => self.divisors[1],
            PatternCategory::ClosingCta => self.divisors[2],
            PatternCategory::HashtagCombo => self.divisors[3],
            PatternCategory::EngagementTrigger => self.divisors[4],
            PatternCategory::ViralElement => return self.viral_confidence,
        };
        (sample_size as f64 / divisor).min(1.0)
    }

    /// The configured rule behind a key, if it is rule-based
    pub fn rule(&self, category: PatternCategory, key: &str) -> Option<&CompiledRule> {
        let rules = match category {
            PatternCategory::OpeningHook => &self.opening.rules,
            PatternCategory::ClosingCta => &self.closing.rules,
            PatternCategory::EngagementTrigger => &self.triggers,
            _ => return None,
        };
        rules.iter().find(|rule| rule.key == key)
    }

    pub fn start_emojis(&self) -> &[String] {
        &self.opening.start_emojis
    }

    pub fn emoji_count(&self, text: &str) -> usize {
        self.viral.emoji.find_iter(text).count()
    }

    pub fn viral_length_range(&self) -> (usize, usize) {
        self.viral.length_range
    }

    pub fn viral_emoji_range(&self) -> (usize, usize) {
        self.viral.emoji_range
    }
}

/// Key for a set of hashtags: sorted tags joined by `_`
pub fn hashtag_combo_key(tags: &[String]) -> String {
    let sorted: BTreeSet<&String> = tags.iter().collect();
    sorted.into_iter().map(String::as_str).collect::<Vec<_>>().join("_")
}

/// Recover the tags of a hashtag combo key
pub fn hashtag_combo_tags(key: &str) -> Vec<String> {
    key.split('#')
        .map(|part| part.trim_end_matches('_'))
        .filter(|part| !part.is_empty())
        .map(|part| format!("#{part}"))
        .collect()
}

/// Human-readable title for a pattern key
pub fn descriptor(category: PatternCategory, key: &str) -> String {
    match category {
        PatternCategory::HashtagCombo => hashtag_combo_tags(key).join(" "),
        PatternCategory::ViralElement => format!("Viral {}", title_case(key)),
        _ => title_case(key),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
