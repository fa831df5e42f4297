//! Service-specific tests
//!
//! Each store implementation gets its own file; both stores are also run
//! through the same contract checks in `memory_store` so their semantics
//! cannot drift apart.

#[cfg(test)]
mod memory_store;
#[cfg(test)]
mod source_provider;

// Common test utilities for services
#[cfg(test)]
pub mod common {
    use chrono::{Duration, Utc};
    use shared::{Insight, InsightKind, Pattern, PatternCategory, PerformanceFeedback, PerformanceTier};
    use std::collections::HashMap;

    /// Pattern with the given strength inputs, discovered now
    pub fn pattern(category: PatternCategory, key: &str, avg_engagement: f64, confidence: f64, domains: &[&str]) -> Pattern {
        Pattern {
            id: category.pattern_id(key),
            category,
            key: key.to_string(),
            descriptor: key.replace('_', " "),
            avg_engagement,
            sample_size: 4,
            domains: domains.iter().map(|d| d.to_string()).collect(),
            confidence,
            discovered_at: Utc::now(),
            last_used: None,
            usage_count: 0,
        }
    }

    /// Insight created `age_days` ago
    pub fn insight(id: &str, impact: f64, evidence: f64, age_days: i64) -> Insight {
        Insight {
            id: id.to_string(),
            kind: InsightKind::TopPattern,
            description: format!("insight {id}"),
            recommendation: "Lead with a question".to_string(),
            impact_score: impact,
            evidence_strength: evidence,
            applicable_domains: vec!["general".to_string()],
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    pub fn feedback(content_id: &str, variant: &str, actual: f64, predicted: f64) -> PerformanceFeedback {
        PerformanceFeedback {
            content_id: content_id.to_string(),
            variant_type: variant.to_string(),
            actual_engagement: actual,
            predicted_engagement: predicted,
            prediction_error: (actual - predicted).abs(),
            tier: PerformanceTier::Medium,
            audience_signals: HashMap::new(),
            content_features: HashMap::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }
}
