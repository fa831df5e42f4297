//! Test helpers and builder patterns for engine tests
//!
//! Cuts the boilerplate of wiring stores, mocked generation and sources into
//! a `ContentEngine`.

use std::sync::Arc;

use engine::{ContentEngine, EngineConfig, EngineError, InMemoryStore, JsonSourceProvider};
use generator::traits::MockGenerationService;
use generator::GenerationError;
use shared::{OptimizedContent, SourceSnippet, VariantKind};

use super::fixtures::TestFixtures;

pub type MemoryEngine = ContentEngine<InMemoryStore, InMemoryStore, MockGenerationService, JsonSourceProvider>;

/// Builder for engines over one shared in-memory store
pub struct EngineBuilder {
    config: EngineConfig,
    store: Arc<InMemoryStore>,
    generator: MockGenerationService,
    sources: JsonSourceProvider,
}

impl EngineBuilder {
    /// Engine with no generation backend and no sources
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: Arc::new(InMemoryStore::new()),
            generator: TestHelpers::unavailable_generator(),
            sources: JsonSourceProvider::empty(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_generator(mut self, generator: MockGenerationService) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_sources(mut self, snippets: Vec<SourceSnippet>) -> Self {
        self.sources = JsonSourceProvider::new(snippets);
        self
    }

    pub fn build(self) -> (MemoryEngine, Arc<InMemoryStore>) {
        let engine = ContentEngine::new(
            &self.config,
            self.store.clone(),
            self.store.clone(),
            Arc::new(self.generator),
            Arc::new(self.sources),
        )
        .expect("default configuration is valid");
        (engine, self.store)
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Common helpers for mocks and assertions
pub struct TestHelpers;

impl TestHelpers {
    /// Generator that reports itself unavailable and must never be called
    pub fn unavailable_generator() -> MockGenerationService {
        let mut generator = MockGenerationService::new();
        generator.expect_is_available().returning(|| false);
        generator.expect_generate().times(0);
        generator.expect_judge_engagement().times(0);
        generator
    }

    /// Generator returning the fixture text and a fixed judgment
    pub fn available_generator(judgment: f64) -> MockGenerationService {
        Self::generator_returning(TestFixtures::generated_text(), judgment)
    }

    /// Generator returning `text` for every variant and a fixed judgment
    pub fn generator_returning(text: String, judgment: f64) -> MockGenerationService {
        let mut generator = MockGenerationService::new();
        generator.expect_is_available().returning(|| true);
        generator
            .expect_generate()
            .times(VariantKind::ALL.len())
            .returning(move |_| Ok(text.clone()));
        generator
            .expect_judge_engagement()
            .times(VariantKind::ALL.len())
            .returning(move |_, _| Ok(judgment));
        generator
    }

    /// Generator whose every call fails although it claims to be available
    pub fn failing_generator() -> MockGenerationService {
        let mut generator = MockGenerationService::new();
        generator.expect_is_available().returning(|| true);
        generator.expect_generate().returning(|_| {
            Err(GenerationError::Provider {
                provider: "openai".to_string(),
                message: "503 Service Unavailable".to_string(),
            })
        });
        generator.expect_judge_engagement().returning(|_, _| {
            Err(GenerationError::Timeout { seconds: 20 })
        });
        generator
    }

    pub fn storage_error(operation: &str) -> EngineError {
        EngineError::Storage {
            operation: operation.to_string(),
            message: "database is locked".to_string(),
        }
    }

    pub fn snippet(title: &str, content: &str) -> SourceSnippet {
        SourceSnippet {
            title: title.to_string(),
            content: content.to_string(),
            source_name: "Regulatory Wire".to_string(),
            url: Some("https://example.com/wire".to_string()),
            domains: vec![TestFixtures::DOMAIN.to_string()],
            credibility: 0.9,
            freshness: 0.8,
            relevance: 0.85,
        }
    }

    /// Invariants every optimization result must satisfy
    pub fn assert_well_formed(result: &OptimizedContent, boost_cap: f64) {
        assert_eq!(result.variants.len(), VariantKind::ALL.len());
        for variant in VariantKind::ALL {
            let base = result.base_predictions[&variant];
            let enhanced = result.enhanced_predictions[&variant];
            assert!((0.0..=1.0).contains(&base), "{variant} base {base}");
            assert!((0.0..=1.0).contains(&enhanced), "{variant} enhanced {enhanced}");
            assert!(enhanced >= base, "{variant} enhanced below base");
            assert!(enhanced - base <= boost_cap + 1e-9, "{variant} boost above cap");
            assert!((0.0..=1.0).contains(&result.optimization_scores[&variant]));
        }

        let best = result
            .enhanced_predictions
            .values()
            .copied()
            .fold(f64::MIN, f64::max);
        assert_eq!(result.enhanced_predictions[&result.recommended_variant], best);
        assert_eq!(result.primary_content, result.variants[&result.recommended_variant]);
        assert_eq!(result.experiment.experiment_id, format!("exp-{}", result.tracking_id));
    }
}
