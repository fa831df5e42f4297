//! Parsing of numeric engagement judgments from free-form model output

use regex::Regex;
use std::sync::OnceLock;

fn score_regex() -> Option<&'static Regex> {
    static SCORE: OnceLock<Option<Regex>> = OnceLock::new();
    SCORE
        .get_or_init(|| Regex::new(r"0\.\d+|1\.0|0\.0").ok())
        .as_ref()
}

/// Extract the first score in [0, 1] from a model reply
pub fn parse_judgment_score(reply: &str) -> Option<f64> {
    score_regex()?
        .find(reply)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|score| score.clamp(0.0, 1.0))
}
