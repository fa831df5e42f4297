//! Idempotent text transformations that make content exhibit a pattern
//!
//! Every transformation first asks the detector whether the text already
//! exhibits the pattern, and only reports an insertion when the changed text
//! passes the same detector afterwards.

use shared::{PatternCategory, Recommendation, Recommendations};

use crate::config::OptimizerConfig;
use crate::core::detectors::{hashtag_combo_tags, keys, DetectorSet};
use crate::core::stats::char_len;

/// Order in which categories are applied to a variant
pub const APPLICATION_ORDER: [PatternCategory; 6] = [
    PatternCategory::OpeningHook,
    PatternCategory::Structure,
    PatternCategory::EngagementTrigger,
    PatternCategory::HashtagCombo,
    PatternCategory::ClosingCta,
    PatternCategory::ViralElement,
];

const QUESTION_OPENING_LINE: &str = "What if the usual playbook is wrong?";
const NUMBERED_BLOCK: &str = "Key insights:\n1. Cross-domain analysis reveals hidden opportunities\n2. Traditional approaches miss critical connections\n3. Framework-driven thinking delivers better results";
const BULLET_BLOCK: &str = "• Cross-domain analysis reveals hidden opportunities\n• Traditional approaches miss critical connections\n• Framework-driven thinking delivers better results";
const FRAMEWORK_LINE: &str = "The 3-2-1 framework: 3 signals, 2 decisions, 1 action";
const STORY_LINE: &str =
    "First I mapped the problem, then I tested the assumptions, and finally the pattern became clear.";
const EMOJI_FILL: [&str; 4] = ["💡", "🔥", "📊", "🧠"];
const EMOJI_LINE_SUFFIX: &str = "Key insight ahead";
const QUESTION_ENDING_LINE: &str = "What patterns are you seeing in your domain?";

/// Line index after which structural blocks are inserted
const BODY_INSERT_LINE: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    Inserted(String),
    AlreadySatisfied,
    /// No transformation exists for the key or it could not reach the pattern
    NotApplicable,
}

/// A recommendation that the final text exhibits
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPattern {
    pub pattern_id: String,
    pub category: PatternCategory,
    pub confidence: f64,
    pub expected_engagement: f64,
    /// False when the text already exhibited the pattern
    pub modified: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformedText {
    pub text: String,
    pub applied: Vec<AppliedPattern>,
}

#[derive(Debug, Clone)]
pub struct PatternTransformer {
    detectors: DetectorSet,
    length_filler: String,
    trim_above_chars: usize,
    trim_keep_lines: usize,
    question_insertion: String,
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}

fn insert_line(text: &str, index: usize, line: &str) -> String {
    let mut lines = split_lines(text);
    let at = index.min(lines.len());
    lines.insert(at, line.to_string());
    lines.join("\n")
}

fn append_paragraph(text: &str, paragraph: &str) -> String {
    let body = text.trim_end();
    if body.is_empty() {
        paragraph.to_string()
    } else {
        format!("{body}\n\n{paragraph}")
    }
}

impl PatternTransformer {
    pub fn new(detectors: DetectorSet, config: &OptimizerConfig, question_insertion: impl Into<String>) -> Self {
        Self {
            detectors,
            length_filler: config.length_filler.clone(),
            trim_above_chars: config.trim_above_chars,
            trim_keep_lines: config.trim_keep_lines.max(2),
            question_insertion: question_insertion.into(),
        }
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// Make `text` exhibit the sub-pattern `key` of `category`
    pub fn apply(&self, category: PatternCategory, key: &str, text: &str) -> TransformOutcome {
        if self.detectors.exhibits(category, key, text) {
            return TransformOutcome::AlreadySatisfied;
        }
        let candidate = match category {
            PatternCategory::OpeningHook => self.opening(key, text),
            PatternCategory::Structure => self.structure(key, text),
            PatternCategory::EngagementTrigger => self
                .rule_insertion(category, key)
                .map(|line| insert_line(text, BODY_INSERT_LINE, line)),
            PatternCategory::HashtagCombo => self.hashtags(key, text),
            PatternCategory::ClosingCta => self.closing(key, text),
            PatternCategory::ViralElement => self.viral(key, text),
        };
        match candidate {
            Some(updated) if self.detectors.exhibits(category, key, &updated) => TransformOutcome::Inserted(updated),
            _ => TransformOutcome::NotApplicable,
        }
    }

    /// Apply at most one recommendation per category
    ///
    /// Within a category the best-ranked recommendation the text can exhibit
    /// wins; recommendations without a working transformation are skipped.
    /// Later transformations may undo earlier ones (a length trim drops
    /// inserted lines), so only patterns the final text still exhibits are
    /// reported.
    pub fn apply_recommendations(&self, text: &str, recommendations: &Recommendations) -> TransformedText {
        let mut current = text.to_string();
        let mut applied: Vec<(&str, AppliedPattern)> = Vec::new();

        for category in APPLICATION_ORDER {
            let Some(ranked) = recommendations.get(&category) else {
                continue;
            };
            for recommendation in ranked {
                let modified = match self.apply(category, &recommendation.pattern_key, &current) {
                    TransformOutcome::Inserted(updated) => {
                        current = updated;
                        true
                    }
                    TransformOutcome::AlreadySatisfied => false,
                    TransformOutcome::NotApplicable => continue,
                };
                applied.push((
                    recommendation.pattern_key.as_str(),
                    applied_pattern(category, recommendation, modified),
                ));
                break;
            }
        }

        let applied = applied
            .into_iter()
            .filter(|(key, pattern)| self.detectors.exhibits(pattern.category, key, &current))
            .map(|(_, pattern)| pattern)
            .collect();
        TransformedText { text: current, applied }
    }

    fn rule_insertion(&self, category: PatternCategory, key: &str) -> Option<&str> {
        self.detectors.rule(category, key)?.insertion.as_deref()
    }

    fn opening(&self, key: &str, text: &str) -> Option<String> {
        if let Some(emoji) = key.strip_prefix(keys::EMOJI_START_PREFIX) {
            if emoji.is_empty() {
                return None;
            }
            return Some(format!("{emoji} {}", text.trim_start()));
        }
        if key == keys::QUESTION_OPENING {
            return Some(insert_line(text, 0, QUESTION_OPENING_LINE));
        }
        let phrase = self.rule_insertion(PatternCategory::OpeningHook, key)?;
        Some(format!("{phrase} {}", text.trim_start()))
    }

    fn structure(&self, key: &str, text: &str) -> Option<String> {
        let block = match key {
            keys::NUMBERED_LIST => NUMBERED_BLOCK,
            keys::BULLET_POINTS => BULLET_BLOCK,
            keys::FRAMEWORK_STRUCTURE => FRAMEWORK_LINE,
            keys::STORY_STRUCTURE => STORY_LINE,
            _ => return None,
        };
        Some(insert_line(text, BODY_INSERT_LINE, block))
    }

    /// Add the missing tags of a combo without disturbing a closing question
    fn hashtags(&self, key: &str, text: &str) -> Option<String> {
        let present = self.detectors.hashtags(text);
        let missing: Vec<String> = hashtag_combo_tags(key)
            .into_iter()
            .filter(|tag| !present.contains(tag))
            .collect();
        if missing.is_empty() {
            return None;
        }
        let tags = missing.join(" ");
        let mut lines = split_lines(text);

        let tag_line = lines
            .iter()
            .rposition(|line| !self.detectors.hashtags(line).is_empty() && !line.trim_end().ends_with('?'));
        if let Some(index) = tag_line {
            lines[index] = format!("{} {tags}", lines[index].trim_end());
        } else if lines.len() > 1 && lines.last().is_some_and(|line| line.trim_end().ends_with('?')) {
            let at = lines.len() - 1;
            lines.insert(at, tags);
        } else {
            lines.push(tags);
        }
        Some(lines.join("\n"))
    }

    fn closing(&self, key: &str, text: &str) -> Option<String> {
        let line = if key == keys::QUESTION_CTA {
            self.question_insertion.as_str()
        } else {
            self.rule_insertion(PatternCategory::ClosingCta, key)?
        };
        Some(append_paragraph(text, line))
    }

    fn viral(&self, key: &str, text: &str) -> Option<String> {
        match key {
            keys::OPTIMAL_LENGTH => self.fit_length(text),
            keys::OPTIMAL_EMOJI => {
                let (low, _) = self.detectors.viral_emoji_range();
                let needed = low.checked_sub(self.detectors.emoji_count(text))?;
                let emojis: String = EMOJI_FILL.iter().cycle().take(needed).copied().collect();
                Some(insert_line(text, 1, &format!("{emojis} {EMOJI_LINE_SUFFIX}")))
            }
            keys::QUESTION_ENDING => Some(append_paragraph(text, QUESTION_ENDING_LINE)),
            _ => None,
        }
    }

    /// Pad short text with filler words or trim long text to its leading lines
    fn fit_length(&self, text: &str) -> Option<String> {
        let (low, _) = self.detectors.viral_length_range();
        let length = char_len(text);

        if length < low {
            let words: Vec<&str> = self.length_filler.split_whitespace().collect();
            if words.is_empty() {
                return None;
            }
            // One separator newline plus the padding line itself
            let mut padding = String::new();
            for word in words.iter().cycle() {
                if length + 1 + char_len(&padding) >= low {
                    break;
                }
                if !padding.is_empty() {
                    padding.push(' ');
                }
                padding.push_str(word);
            }
            let lines = split_lines(text);
            let at = lines.len().saturating_sub(1);
            return Some(insert_line(text, at, &padding));
        }

        if length > self.trim_above_chars {
            let lines = split_lines(text);
            if lines.len() <= self.trim_keep_lines {
                return None;
            }
            let mut kept: Vec<String> = lines[..self.trim_keep_lines - 1].to_vec();
            kept.extend(lines.last().cloned());
            return Some(kept.join("\n"));
        }

        None
    }
}

fn applied_pattern(category: PatternCategory, recommendation: &Recommendation, modified: bool) -> AppliedPattern {
    AppliedPattern {
        pattern_id: recommendation.pattern_id.clone(),
        category,
        confidence: recommendation.confidence,
        expected_engagement: recommendation.expected_engagement,
        modified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClosingDetectorConfig, ExtractorConfig};

    fn transformer() -> PatternTransformer {
        let detectors = DetectorSet::from_config(&ExtractorConfig::default()).unwrap();
        PatternTransformer::new(
            detectors,
            &OptimizerConfig::default(),
            ClosingDetectorConfig::default().question_insertion,
        )
    }

    fn recommendation(category: PatternCategory, key: &str, confidence: f64) -> Recommendation {
        Recommendation {
            pattern_id: category.pattern_id(key),
            pattern_key: key.to_string(),
            title: key.to_string(),
            expected_engagement: 0.9,
            confidence,
            sample_size: 3,
        }
    }

    const BASE: &str = "Rates are moving\nSecond line\nThird line";

    #[test]
    fn test_every_default_key_reaches_its_pattern() {
        let t = transformer();
        let cases = [
            (PatternCategory::OpeningHook, "emoji_start_🔥"),
            (PatternCategory::OpeningHook, "heres_what_pattern"),
            (PatternCategory::OpeningHook, "everyone_misses_pattern"),
            (PatternCategory::OpeningHook, keys::QUESTION_OPENING),
            (PatternCategory::Structure, keys::NUMBERED_LIST),
            (PatternCategory::Structure, keys::BULLET_POINTS),
            (PatternCategory::Structure, keys::FRAMEWORK_STRUCTURE),
            (PatternCategory::Structure, keys::STORY_STRUCTURE),
            (PatternCategory::EngagementTrigger, "contrarian_words"),
            (PatternCategory::EngagementTrigger, "data_points"),
            (PatternCategory::EngagementTrigger, "personal_experience"),
            (PatternCategory::EngagementTrigger, "urgency_words"),
            (PatternCategory::EngagementTrigger, "curiosity_gaps"),
            (PatternCategory::HashtagCombo, "#ai_#growth_#policy"),
            (PatternCategory::ClosingCta, keys::QUESTION_CTA),
            (PatternCategory::ClosingCta, "opinion_request"),
            (PatternCategory::ClosingCta, "share_request"),
            (PatternCategory::ClosingCta, "feedback_request"),
            (PatternCategory::ViralElement, keys::OPTIMAL_LENGTH),
            (PatternCategory::ViralElement, keys::OPTIMAL_EMOJI),
            (PatternCategory::ViralElement, keys::QUESTION_ENDING),
        ];

        for (category, key) in cases {
            match t.apply(category, key, BASE) {
                TransformOutcome::Inserted(updated) => {
                    assert!(t.detectors().exhibits(category, key, &updated), "{key}");
                    // Re-application is a no-op
                    assert_eq!(t.apply(category, key, &updated), TransformOutcome::AlreadySatisfied, "{key}");
                }
                other => panic!("{key}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_key_is_not_applicable() {
        let t = transformer();
        assert_eq!(
            t.apply(PatternCategory::Structure, "zigzag", BASE),
            TransformOutcome::NotApplicable
        );
        assert_eq!(
            t.apply(PatternCategory::EngagementTrigger, "social_proof", BASE),
            TransformOutcome::NotApplicable
        );
    }

    #[test]
    fn test_hashtags_complete_existing_line() {
        let t = transformer();
        let text = "Body\n#ai #extra";
        let TransformOutcome::Inserted(updated) = t.apply(PatternCategory::HashtagCombo, "#ai_#growth", text) else {
            panic!("expected insertion");
        };
        assert_eq!(updated, "Body\n#ai #extra #growth");
    }

    #[test]
    fn test_hashtags_keep_closing_question_last() {
        let t = transformer();
        let text = "Body\nWhat do you think?";
        let TransformOutcome::Inserted(updated) = t.apply(PatternCategory::HashtagCombo, "#ai_#growth", text) else {
            panic!("expected insertion");
        };
        assert_eq!(updated, "Body\n#ai #growth\nWhat do you think?");
    }

    #[test]
    fn test_emoji_completion_respects_range() {
        let t = transformer();
        let crowded = format!("{BASE} 🧠💡🔥📊🧠💡");
        assert_eq!(
            t.apply(PatternCategory::ViralElement, keys::OPTIMAL_EMOJI, &crowded),
            TransformOutcome::NotApplicable
        );
    }

    #[test]
    fn test_long_text_is_trimmed() {
        let t = transformer();
        let lines: Vec<String> = (0..12).map(|i| format!("Line {i} {}", "w".repeat(25))).collect();
        let text = lines.join("\n");
        let TransformOutcome::Inserted(updated) = t.apply(PatternCategory::ViralElement, keys::OPTIMAL_LENGTH, &text)
        else {
            panic!("expected trim");
        };
        assert_eq!(updated.split('\n').count(), 8);
        assert!(updated.ends_with(&lines[11]));
    }

    #[test]
    fn test_one_recommendation_per_category() {
        let t = transformer();
        let mut recommendations = Recommendations::new();
        recommendations.insert(
            PatternCategory::Structure,
            vec![
                recommendation(PatternCategory::Structure, "zigzag", 1.0),
                recommendation(PatternCategory::Structure, keys::NUMBERED_LIST, 0.9),
                recommendation(PatternCategory::Structure, keys::STORY_STRUCTURE, 0.8),
            ],
        );
        recommendations.insert(
            PatternCategory::ClosingCta,
            vec![recommendation(PatternCategory::ClosingCta, keys::QUESTION_CTA, 1.0)],
        );

        let result = t.apply_recommendations(BASE, &recommendations);
        let ids: Vec<&str> = result.applied.iter().map(|a| a.pattern_id.as_str()).collect();
        assert_eq!(ids, vec!["structure_numbered_list", "closing_question_cta"]);
        assert!(result.applied.iter().all(|a| a.modified));
        assert!(!t.detectors().exhibits(PatternCategory::Structure, keys::STORY_STRUCTURE, &result.text));

        let again = t.apply_recommendations(&result.text, &recommendations);
        assert_eq!(again.text, result.text);
        assert_eq!(again.applied.len(), 2);
        assert!(again.applied.iter().all(|a| !a.modified));
    }

    #[test]
    fn test_trim_drops_patterns_it_removed() {
        let t = transformer();
        let lines: Vec<String> = (0..12).map(|i| format!("Line {i} {}", "w".repeat(24))).collect();
        let text = lines.join("\n");

        let mut recommendations = Recommendations::new();
        recommendations.insert(
            PatternCategory::HashtagCombo,
            vec![recommendation(PatternCategory::HashtagCombo, "#ai_#growth", 1.0)],
        );
        recommendations.insert(
            PatternCategory::ClosingCta,
            vec![recommendation(PatternCategory::ClosingCta, keys::QUESTION_CTA, 1.0)],
        );
        recommendations.insert(
            PatternCategory::ViralElement,
            vec![recommendation(PatternCategory::ViralElement, keys::OPTIMAL_LENGTH, 1.0)],
        );

        let result = t.apply_recommendations(&text, &recommendations);
        assert!(t.detectors().hashtags(&result.text).is_empty());
        let ids: Vec<&str> = result.applied.iter().map(|a| a.pattern_id.as_str()).collect();
        assert!(!ids.contains(&"hashtags_#ai_#growth"), "{ids:?}");
        assert!(ids.contains(&"closing_question_cta"), "{ids:?}");
        assert!(ids.contains(&"viral_optimal_length"), "{ids:?}");
    }

    #[test]
    fn test_conflicting_categories_report_only_exhibited_patterns() {
        let t = transformer();
        let long: Vec<String> = (0..14).map(|i| format!("Point {i} {}", "x".repeat(30))).collect();
        let text = long.join("\n");

        let mut recommendations = Recommendations::new();
        recommendations.insert(
            PatternCategory::Structure,
            vec![recommendation(PatternCategory::Structure, keys::FRAMEWORK_STRUCTURE, 1.0)],
        );
        recommendations.insert(
            PatternCategory::EngagementTrigger,
            vec![recommendation(PatternCategory::EngagementTrigger, "urgency_words", 1.0)],
        );
        recommendations.insert(
            PatternCategory::HashtagCombo,
            vec![recommendation(PatternCategory::HashtagCombo, "#ai_#policy", 1.0)],
        );
        recommendations.insert(
            PatternCategory::ClosingCta,
            vec![recommendation(PatternCategory::ClosingCta, keys::QUESTION_CTA, 1.0)],
        );
        recommendations.insert(
            PatternCategory::ViralElement,
            vec![recommendation(PatternCategory::ViralElement, keys::OPTIMAL_LENGTH, 1.0)],
        );

        let result = t.apply_recommendations(&text, &recommendations);
        for applied in &result.applied {
            let key = recommendations[&applied.category][0].pattern_key.as_str();
            assert!(
                t.detectors().exhibits(applied.category, key, &result.text),
                "{} not exhibited",
                applied.pattern_id
            );
        }
    }
}
