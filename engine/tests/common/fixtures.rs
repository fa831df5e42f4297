//! Test fixtures and data for engine tests
//!
//! Record batches are built so the patterns they produce are known in advance.

use chrono::Utc;
use shared::{ContentRecord, Pattern, PatternCategory, QueryContext, GENERAL_DOMAIN};

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const DOMAIN: &'static str = "fintech";
    pub const TOPIC: &'static str = "stablecoin regulation in emerging markets";

    /// Pattern every question-closing corpus produces
    pub const QUESTION_CTA_ID: &'static str = "closing_question_cta";

    /// Five records where only one performs well (sample too small to learn from)
    pub fn single_standout_batch() -> Vec<ContentRecord> {
        vec![
            ContentRecord::new("🔥 Bold call on rate cuts this year?", 0.95, "contrarian"),
            ContentRecord::new("Rates held steady this quarter", 0.3, "analytical"),
            ContentRecord::new("Markets were quiet on Friday", 0.25, "analytical"),
            ContentRecord::new("A short note on bond yields", 0.4, "analytical"),
            ContentRecord::new("Weekly recap of earnings", 0.2, "analytical"),
        ]
    }

    /// Ten records, three strong ones all closing on a question
    pub fn question_closing_batch() -> Vec<ContentRecord> {
        let mut records = vec![
            ContentRecord::new("Stablecoin rules are changing fast\nWhich bank moves first?", 0.85, "engaging"),
            ContentRecord::new("Payment rails are being rebuilt\nWould you trust them?", 0.9, "engaging"),
            ContentRecord::new("Cross-border fees keep falling\nWho captures the margin?", 0.95, "engaging"),
        ];
        let weak = [
            "Rates held steady this quarter",
            "Markets were quiet on Friday",
            "A short note on bond yields",
            "Weekly recap of earnings",
            "Treasury auction results are in",
            "Card volumes grew modestly",
            "Loan books look healthy",
        ];
        records.extend(
            weak.iter()
                .enumerate()
                .map(|(i, text)| ContentRecord::new(*text, 0.2 + i as f64 * 0.04, "analytical")),
        );
        records
    }

    /// `question_closing_batch` tagged with the test domain
    pub fn domain_corpus() -> Vec<ContentRecord> {
        Self::question_closing_batch()
            .into_iter()
            .map(|record| record.with_domains(vec![Self::DOMAIN.to_string()]))
            .collect()
    }

    pub fn query() -> QueryContext {
        QueryContext::new(Self::TOPIC).with_domains(vec![Self::DOMAIN.to_string()])
    }

    /// 250 characters, closing question, three hashtags, no emoji
    pub fn scenario_c_content() -> String {
        format!("{} #ai #policy #growth?", "z".repeat(229))
    }

    /// Text a mocked provider returns for every prompt
    pub fn generated_text() -> String {
        "Stablecoin oversight is converging across regions\nThe firms that prepare early will set the terms".to_string()
    }

    /// Twelve 32-character lines, long enough to be trimmed to the viral length
    pub fn long_generated_text() -> String {
        (0..12)
            .map(|i| format!("Signal {i:02} {}", "w".repeat(22)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Confident general pattern as a previous learning cycle would store it
    pub fn learned_pattern(category: PatternCategory, key: &str) -> Pattern {
        Pattern {
            id: category.pattern_id(key),
            category,
            key: key.to_string(),
            descriptor: key.replace('_', " "),
            avg_engagement: 0.9,
            sample_size: 5,
            domains: vec![GENERAL_DOMAIN.to_string()],
            confidence: 1.0,
            discovered_at: Utc::now(),
            last_used: None,
            usage_count: 0,
        }
    }
}
