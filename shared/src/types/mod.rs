//! Core types used throughout the content optimization system

pub mod content;
pub mod learning;
pub mod optimized;

pub use content::*;
pub use learning::*;
pub use optimized::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a component of the learning loop, attached to every log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentId {
    Extractor,
    PatternStore,
    InsightGenerator,
    Predictor,
    Optimizer,
    FeedbackLoop,
    Generator,
    Cli,
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentId::Extractor => write!(f, "extractor"),
            ComponentId::PatternStore => write!(f, "pattern_store"),
            ComponentId::InsightGenerator => write!(f, "insight_generator"),
            ComponentId::Predictor => write!(f, "predictor"),
            ComponentId::Optimizer => write!(f, "optimizer"),
            ComponentId::FeedbackLoop => write!(f, "feedback_loop"),
            ComponentId::Generator => write!(f, "generator"),
            ComponentId::Cli => write!(f, "cli"),
        }
    }
}

/// Stylistic rendering of content for a query
///
/// The declaration order is the tie-break order used when ranking variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantKind {
    Analytical,
    Engaging,
    Contrarian,
    DataDriven,
}

impl VariantKind {
    /// All variants in tie-break order
    pub const ALL: [VariantKind; 4] = [
        VariantKind::Analytical,
        VariantKind::Engaging,
        VariantKind::Contrarian,
        VariantKind::DataDriven,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Analytical => "analytical",
            VariantKind::Engaging => "engaging",
            VariantKind::Contrarian => "contrarian",
            VariantKind::DataDriven => "data_driven",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "analytical" => Ok(VariantKind::Analytical),
            "engaging" => Ok(VariantKind::Engaging),
            "contrarian" => Ok(VariantKind::Contrarian),
            "data_driven" | "datadriven" => Ok(VariantKind::DataDriven),
            _ => Err(format!("Unknown variant: {s}")),
        }
    }
}
