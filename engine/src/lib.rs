//! Self-improving content optimization engine
//!
//! Mines engagement patterns from published content, applies them to newly
//! generated variants, predicts engagement and feeds observed outcomes back
//! into the next learning cycle. Storage, generation and source lookup are
//! injected through traits so every component runs against mocks in tests.

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod optimizer;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::EngineConfig;
pub use core::{EngagementPredictor, InsightGenerator, PatternExtractor};
pub use engine::ContentEngine;
pub use error::{EngineError, EngineResult};
pub use feedback::{simulate, FeedbackLoop, FeedbackSubmission, IngestOutcome, LearningCycleReport, TEXT_FEATURE};
pub use optimizer::LearningOptimizer;
pub use services::{InMemoryStore, JsonSourceProvider, SqliteStore};
pub use traits::{FeedbackStore, PatternQuery, PatternStore, SourceProvider};
