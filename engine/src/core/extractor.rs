//! Pattern extraction from historical engagement data
//!
//! High performers are the top slice of a batch by engagement. Each category
//! detector scans them for sub-pattern keys; keys seen often enough become
//! [`Pattern`]s with a confidence proportional to their sample size.

use chrono::{DateTime, Utc};
use shared::{ContentRecord, Pattern, PatternCategory, GENERAL_DOMAIN};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ExtractorConfig;
use crate::core::detectors::{descriptor, DetectorSet};
use crate::core::stats::{mean, percentile, top_count};
use crate::error::EngineResult;

/// Mines recurring traits of high-performing content
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    config: ExtractorConfig,
    detectors: DetectorSet,
}

impl PatternExtractor {
    pub fn new(config: ExtractorConfig) -> EngineResult<Self> {
        let detectors = DetectorSet::from_config(&config)?;
        Ok(Self { config, detectors })
    }

    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// High performers in descending engagement order
    ///
    /// The top fraction of the batch, widened to include every record at or
    /// above the high-performer floor. The sort is stable so ties keep batch
    /// order.
    pub fn high_performers<'a>(&self, records: &'a [ContentRecord]) -> Vec<&'a ContentRecord> {
        let mut sorted: Vec<&ContentRecord> = records.iter().collect();
        sorted.sort_by(|a, b| b.engagement_rate.total_cmp(&a.engagement_rate));

        let by_fraction = top_count(sorted.len(), self.config.high_performer_fraction);
        let by_floor = sorted
            .iter()
            .take_while(|record| record.engagement_rate >= self.config.high_performer_floor)
            .count();
        sorted.truncate(by_fraction.max(by_floor).min(records.len()));
        sorted
    }

    /// Extract ranked patterns from a batch
    pub fn extract(&self, records: &[ContentRecord], now: DateTime<Utc>) -> Vec<Pattern> {
        let high = self.high_performers(records);
        if high.is_empty() {
            return Vec::new();
        }

        let mut patterns = Vec::new();
        for category in PatternCategory::ALL {
            let candidates: Vec<&ContentRecord> = if category == PatternCategory::ViralElement {
                self.viral_posts(&high)
            } else {
                high.clone()
            };
            patterns.extend(self.patterns_for(category, &candidates, now));
        }

        patterns.retain(|pattern| pattern.confidence > self.config.min_confidence);
        patterns.sort_by(|a, b| b.strength().total_cmp(&a.strength()).then_with(|| a.id.cmp(&b.id)));
        patterns.truncate(self.config.max_patterns);
        patterns
    }

    /// High performers at or above the viral percentile
    fn viral_posts<'a>(&self, high: &[&'a ContentRecord]) -> Vec<&'a ContentRecord> {
        let engagements: Vec<f64> = high.iter().map(|record| record.engagement_rate).collect();
        let Some(threshold) = percentile(&engagements, self.config.viral.percentile) else {
            return Vec::new();
        };
        let viral: Vec<&ContentRecord> = high
            .iter()
            .copied()
            .filter(|record| record.engagement_rate >= threshold)
            .collect();
        if viral.len() >= self.config.min_occurrences.max(2) {
            viral
        } else {
            Vec::new()
        }
    }

    fn patterns_for(&self, category: PatternCategory, records: &[&ContentRecord], now: DateTime<Utc>) -> Vec<Pattern> {
        let mut exhibiting: BTreeMap<String, Vec<&ContentRecord>> = BTreeMap::new();
        for record in records.iter().copied() {
            for key in self.detectors.detect(category, &record.text) {
                exhibiting.entry(key).or_default().push(record);
            }
        }

        exhibiting
            .into_iter()
            .filter(|(_, matched)| matched.len() >= self.config.min_occurrences)
            .filter_map(|(key, matched)| {
                let engagements: Vec<f64> = matched.iter().map(|record| record.engagement_rate).collect();
                let avg_engagement = mean(&engagements)?;
                Some(Pattern {
                    id: category.pattern_id(&key),
                    category,
                    descriptor: descriptor(category, &key),
                    avg_engagement,
                    sample_size: matched.len() as u32,
                    domains: pattern_domains(&matched),
                    confidence: self.detectors.confidence(category, matched.len()),
                    discovered_at: now,
                    last_used: None,
                    usage_count: 0,
                    key,
                })
            })
            .collect()
    }
}

/// `general` followed by the sorted union of the records' domain tags
fn pattern_domains(records: &[&ContentRecord]) -> Vec<String> {
    let tagged: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.domains.iter().map(String::as_str))
        .filter(|domain| *domain != GENERAL_DOMAIN)
        .collect();
    std::iter::once(GENERAL_DOMAIN.to_string())
        .chain(tagged.into_iter().map(str::to_string))
        .collect()
}
