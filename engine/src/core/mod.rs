//! Core learning logic
//!
//! Pure computation with no I/O: pattern mining, insight synthesis,
//! prediction, transformation and scoring. Every function here is
//! deterministic given its inputs and is tested in isolation.

pub mod detectors;
pub mod extractor;
pub mod insights;
pub mod predictor;
pub mod scoring;
pub mod stats;
pub mod templates;
pub mod transforms;

pub use detectors::DetectorSet;
pub use extractor::PatternExtractor;
pub use insights::InsightGenerator;
pub use predictor::{EngagementPredictor, PredictionFactors};
pub use scoring::VariantScorer;
pub use transforms::{AppliedPattern, PatternTransformer, TransformOutcome, TransformedText};
