//! Insight synthesis from a learning batch and its mined patterns

use chrono::{DateTime, Utc};
use shared::{ContentRecord, Insight, InsightKind, Pattern, GENERAL_DOMAIN};
use std::collections::BTreeMap;

use crate::config::InsightConfig;
use crate::core::stats::{char_len, mean};

/// Derives human-readable recommendations for one learning cycle
///
/// Each insight class is independent and silently omitted when the batch
/// does not carry enough evidence for it.
#[derive(Debug, Clone, Default)]
pub struct InsightGenerator {
    config: InsightConfig,
}

impl InsightGenerator {
    pub fn new(config: InsightConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, records: &[ContentRecord], patterns: &[Pattern], now: DateTime<Utc>) -> Vec<Insight> {
        [
            self.variant_performance(records, now),
            self.top_pattern(patterns, now),
            self.optimal_length(records, now),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn insight_id(kind: InsightKind, now: DateTime<Utc>) -> String {
        format!("{}_{}", kind.as_str(), now.format("%Y%m%d"))
    }

    /// Gap between the best and worst variant types by mean engagement
    fn variant_performance(&self, records: &[ContentRecord], now: DateTime<Utc>) -> Option<Insight> {
        let mut by_variant: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for record in records {
            by_variant
                .entry(record.variant_type.as_str())
                .or_default()
                .push(record.engagement_rate);
        }
        if by_variant.len() < 2 {
            return None;
        }

        let means: Vec<(&str, f64, usize)> = by_variant
            .iter()
            .filter_map(|(variant, values)| mean(values).map(|m| (*variant, m, values.len())))
            .collect();
        let best = means.iter().max_by(|a, b| a.1.total_cmp(&b.1))?;
        let worst = means.iter().min_by(|a, b| a.1.total_cmp(&b.1))?;
        let gap = best.1 - worst.1;
        if gap <= self.config.min_variant_gap {
            return None;
        }

        Some(Insight {
            id: Self::insight_id(InsightKind::VariantPerformance, now),
            kind: InsightKind::VariantPerformance,
            description: format!(
                "{} content outperforms {} by {:.1} points of engagement",
                best.0,
                worst.0,
                gap * 100.0
            ),
            recommendation: format!("Prioritize {} variants for higher engagement", best.0),
            impact_score: (gap * self.config.gap_impact_multiplier).min(1.0),
            evidence_strength: (best.2 as f64 / self.config.gap_evidence_divisor).min(1.0),
            applicable_domains: vec![GENERAL_DOMAIN.to_string()],
            created_at: now,
        })
    }

    /// The strongest well-evidenced pattern
    fn top_pattern(&self, patterns: &[Pattern], now: DateTime<Utc>) -> Option<Insight> {
        let top = patterns
            .iter()
            .filter(|p| {
                p.confidence > self.config.top_pattern_min_confidence
                    && p.avg_engagement > self.config.top_pattern_min_engagement
            })
            .max_by(|a, b| a.strength().total_cmp(&b.strength()))?;

        Some(Insight {
            id: Self::insight_id(InsightKind::TopPattern, now),
            kind: InsightKind::TopPattern,
            description: format!(
                "Pattern '{}' averages {:.1}% engagement across {} posts",
                top.descriptor,
                top.avg_engagement * 100.0,
                top.sample_size
            ),
            recommendation: format!("Apply the {} pattern in new content", top.descriptor),
            impact_score: top.avg_engagement.clamp(0.0, 1.0),
            evidence_strength: top.confidence,
            applicable_domains: top.domains.clone(),
            created_at: now,
        })
    }

    /// Length band of the top quartile of the batch
    fn optimal_length(&self, records: &[ContentRecord], now: DateTime<Utc>) -> Option<Insight> {
        if records.len() <= self.config.length_min_batch {
            return None;
        }
        let mut sorted: Vec<&ContentRecord> = records.iter().collect();
        sorted.sort_by(|a, b| b.engagement_rate.total_cmp(&a.engagement_rate));
        let quartile = &sorted[..records.len() / 4];

        let lengths: Vec<f64> = quartile.iter().map(|record| char_len(&record.text) as f64).collect();
        let avg_length = mean(&lengths)?.round() as usize;
        let low = avg_length.saturating_sub(self.config.length_band);
        let high = avg_length + self.config.length_band;

        Some(Insight {
            id: Self::insight_id(InsightKind::OptimalLength, now),
            kind: InsightKind::OptimalLength,
            description: format!("Top performing content averages {avg_length} characters"),
            recommendation: format!("Target {low}-{high} characters for optimal engagement"),
            impact_score: self.config.length_impact,
            evidence_strength: (quartile.len() as f64 / self.config.length_evidence_divisor).min(1.0),
            applicable_domains: vec![GENERAL_DOMAIN.to_string()],
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::PatternCategory;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn record(variant: &str, engagement: f64, length: usize) -> ContentRecord {
        ContentRecord::new("x".repeat(length), engagement, variant)
    }

    fn pattern(confidence: f64, avg: f64) -> Pattern {
        Pattern {
            id: "closing_question_cta".to_string(),
            category: PatternCategory::ClosingCta,
            key: "question_cta".to_string(),
            descriptor: "Question Cta".to_string(),
            avg_engagement: avg,
            sample_size: 3,
            domains: vec!["general".to_string(), "fintech".to_string()],
            confidence,
            discovered_at: now(),
            last_used: None,
            usage_count: 0,
        }
    }

    #[test]
    fn test_variant_gap_insight() {
        let records = vec![
            record("contrarian", 0.9, 10),
            record("contrarian", 0.8, 10),
            record("analytical", 0.3, 10),
        ];
        let insights = InsightGenerator::default().generate(&records, &[], now());

        assert_eq!(insights.len(), 1);
        let insight = &insights[0];
        assert_eq!(insight.id, "variant_performance_20261016");
        assert!((insight.impact_score - 1.0).abs() < 1e-12);
        assert!((insight.evidence_strength - 0.2).abs() < 1e-12);
        assert!(insight.recommendation.contains("contrarian"));
    }

    #[test]
    fn test_single_variant_has_no_gap_insight() {
        let records = vec![record("analytical", 0.9, 10), record("analytical", 0.1, 10)];
        assert!(InsightGenerator::default().generate(&records, &[], now()).is_empty());
    }

    #[test]
    fn test_small_gap_is_omitted() {
        let records = vec![record("analytical", 0.5, 10), record("engaging", 0.55, 10)];
        assert!(InsightGenerator::default().generate(&records, &[], now()).is_empty());
    }

    #[test]
    fn test_top_pattern_insight() {
        let patterns = vec![pattern(1.0, 0.85), pattern(0.8, 0.95)];
        let insights = InsightGenerator::default().generate(&[], &patterns, now());

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::TopPattern);
        assert_eq!(insights[0].impact_score, 0.85);
        assert_eq!(insights[0].evidence_strength, 1.0);
        assert_eq!(insights[0].applicable_domains, vec!["general", "fintech"]);
    }

    #[test]
    fn test_optimal_length_needs_more_than_ten_records() {
        let ten: Vec<ContentRecord> = (0..10).map(|i| record("analytical", i as f64 / 10.0, 200)).collect();
        assert!(InsightGenerator::default()
            .generate(&ten, &[], now())
            .iter()
            .all(|i| i.kind != InsightKind::OptimalLength));

        let twelve: Vec<ContentRecord> = (0..12)
            .map(|i| record("analytical", i as f64 / 12.0, 100 + i * 10))
            .collect();
        let insights = InsightGenerator::default().generate(&twelve, &[], now());
        let length = insights
            .iter()
            .find(|i| i.kind == InsightKind::OptimalLength)
            .unwrap();

        // Top quartile is the 3 longest records: 210, 200, 190
        assert_eq!(length.recommendation, "Target 150-250 characters for optimal engagement");
        assert_eq!(length.impact_score, 0.7);
        assert!((length.evidence_strength - 0.15).abs() < 1e-12);
    }
}
