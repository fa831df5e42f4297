//! Main entry point for the content engine binary
//!
//! Wires the SQLite store, a generation service and the JSON source provider
//! into a `ContentEngine` and exposes the learning loop as subcommands. Every
//! command prints its result as pretty JSON on stdout.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use engine::{
    simulate, ContentEngine, EngineConfig, FeedbackSubmission, JsonSourceProvider, SqliteStore, TEXT_FEATURE,
};
use generator::{GenerationService, LlmGenerationService, OfflineGenerator};
use shared::{
    component_debug, component_info, logging, ComponentId, Complexity, ContentRecord, QueryContext, VariantKind,
};

/// Self-improving content optimization engine
#[derive(Parser)]
#[command(name = "engine")]
#[command(about = "Learns engagement patterns from published content and applies them to new content")]
pub struct Cli {
    /// SQLite database path (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML configuration file (falls back to CONTENT_ENGINE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Never call a provider; variants come from templates
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add historical records (JSON array or JSONL) and run a learning cycle
    Learn {
        /// Records file; without it the cycle runs over the stored corpus
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Generate, enhance and rank variants for a query
    Optimize(QueryArgs),
    /// Report the observed engagement of published content
    Feedback {
        /// Content id, usually the tracking id printed by `optimize`
        #[arg(long)]
        content_id: String,
        #[arg(long)]
        variant: VariantKind,
        #[arg(long)]
        actual: f64,
        #[arg(long)]
        predicted: f64,
        /// Content text, for ids that were not produced by `optimize`
        #[arg(long)]
        text: Option<String>,
    },
    /// Optimize repeatedly and feed back simulated outcomes
    Simulate {
        #[command(flatten)]
        query: QueryArgs,
        /// Number of optimize/feedback rounds
        #[arg(long, default_value = "3")]
        rounds: u32,
    },
    /// List recent learning insights with calibration aggregates
    Insights {
        #[arg(long, default_value = "7")]
        days: u32,
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Show the learned patterns that would be applied for some domains
    Recommendations {
        #[arg(long = "domain")]
        domains: Vec<String>,
        #[arg(long)]
        variant: Option<VariantKind>,
    },
}

#[derive(Args)]
pub struct QueryArgs {
    #[arg(long)]
    pub topic: String,
    /// Domain tag, repeatable
    #[arg(long = "domain")]
    pub domains: Vec<String>,
    #[arg(long, default_value = "simple")]
    pub complexity: Complexity,
    /// Context signal as name=value, repeatable
    #[arg(long = "signal", value_parser = parse_signal)]
    pub signals: Vec<(String, f64)>,
    /// Framework name, repeatable
    #[arg(long = "framework")]
    pub frameworks: Vec<String>,
    /// JSON file of source snippets used as evidence
    #[arg(long)]
    pub sources: Option<PathBuf>,
}

impl QueryArgs {
    fn context(&self) -> QueryContext {
        self.signals.iter().fold(
            QueryContext::new(self.topic.clone())
                .with_domains(self.domains.clone())
                .with_complexity(self.complexity)
                .with_frameworks(self.frameworks.clone()),
            |query, (name, value)| query.with_signal(name.clone(), *value),
        )
    }
}

fn parse_signal(raw: &str) -> Result<(String, f64), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected name=value, got '{raw}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("Invalid signal value '{value}': {e}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("Signal {name} must be within [0, 1]"));
    }
    Ok((name.trim().to_string(), value))
}

/// Parse a JSON array of records, or one record per line
fn parse_records(text: &str) -> anyhow::Result<Vec<ContentRecord>> {
    if text.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(text)?);
    }
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid record on line {}", index + 1))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn load_sources(path: Option<&Path>) -> anyhow::Result<JsonSourceProvider> {
    match path {
        Some(path) => JsonSourceProvider::load(path)
            .await
            .with_context(|| format!("Failed to load sources from {}", path.display())),
        None => Ok(JsonSourceProvider::empty()),
    }
}

async fn run<G>(cli: Cli, config: EngineConfig, store: Arc<SqliteStore>, generator: G) -> anyhow::Result<()>
where
    G: GenerationService + 'static,
{
    let sources = match &cli.command {
        Command::Optimize(query) | Command::Simulate { query, .. } => load_sources(query.sources.as_deref()).await?,
        _ => JsonSourceProvider::empty(),
    };
    let engine = ContentEngine::new(&config, store.clone(), store, Arc::new(generator), Arc::new(sources))?;

    match cli.command {
        Command::Learn { input } => {
            let report = match input {
                Some(path) => {
                    let text = tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let records = parse_records(&text)?;
                    component_info!(ComponentId::Cli, records = records.len(), "Submitting record batch");
                    engine.submit_batch(&records).await?
                }
                None => engine.run_learning_cycle().await?,
            };
            logging::log_success(
                &ComponentId::Cli,
                &format!("Learned {} patterns from {} records", report.patterns, report.records_analyzed),
            );
            print_json(&report)?;
        }
        Command::Optimize(query) => {
            let optimized = engine.optimize(&query.context()).await;
            print_json(&optimized)?;
        }
        Command::Feedback {
            content_id,
            variant,
            actual,
            predicted,
            text,
        } => {
            let mut submission = FeedbackSubmission::new(content_id, variant.as_str(), actual, predicted);
            if let Some(text) = text {
                submission = submission.with_feature(TEXT_FEATURE, json!(text));
            }
            let outcome = engine.ingest(submission).await?;
            print_json(&outcome)?;
        }
        Command::Simulate { query, rounds } => {
            let context = query.context();
            let mut summaries = Vec::new();
            for round in 1..=rounds {
                logging::log_progress(&ComponentId::Cli, "Simulation", &format!("round {round} of {rounds}"));
                let optimized = engine.optimize(&context).await;
                let variant = optimized.recommended_variant;
                let predicted = optimized
                    .enhanced_predictions
                    .get(&variant)
                    .copied()
                    .unwrap_or_default();
                let actual = simulate(predicted, config.feedback.simulation_range);
                component_debug!(
                    ComponentId::Cli,
                    round,
                    variant = %variant,
                    predicted,
                    actual,
                    "Simulated outcome"
                );
                let outcome = engine
                    .ingest(FeedbackSubmission::new(
                        optimized.tracking_id.clone(),
                        variant.as_str(),
                        actual,
                        predicted,
                    ))
                    .await?;
                summaries.push(json!({
                    "round": round,
                    "tracking_id": optimized.tracking_id,
                    "recommended_variant": variant,
                    "predicted_engagement": predicted,
                    "actual_engagement": actual,
                    "patterns_applied": optimized.metadata.patterns_applied,
                    "tier": outcome.feedback.tier,
                    "patterns_learned": outcome.cycle.as_ref().map(|cycle| cycle.patterns),
                }));
            }
            print_json(&json!({
                "rounds": summaries,
                "calibration": engine.feedback_aggregates().await?,
            }))?;
        }
        Command::Insights { days, limit } => {
            let insights = engine.get_learning_insights(days, limit).await?;
            print_json(&json!({
                "insights": insights,
                "calibration": engine.feedback_aggregates().await?,
            }))?;
        }
        Command::Recommendations { domains, variant } => {
            let recommendations = engine.get_content_recommendations(&domains, variant).await?;
            print_json(&recommendations)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Missing .env is fine
    let _ = dotenv::dotenv();
    logging::init_tracing(Some(&cli.log_level));
    logging::log_startup(&ComponentId::Cli, "content engine");

    let mut config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(db) = &cli.db {
        config.store.database_path = db.clone();
    }
    let store = Arc::new(SqliteStore::open(&config.store.database_path).with_context(|| {
        format!("Failed to open database {}", config.store.database_path.display())
    })?);

    let result = dispatch(cli, config, store).await;
    match &result {
        Ok(()) => logging::log_shutdown(&ComponentId::Cli, "command finished"),
        Err(error) => logging::log_error(&ComponentId::Cli, "Command", error),
    }
    result
}

/// Pick the generation backend and run the command with it
async fn dispatch(cli: Cli, config: EngineConfig, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    if cli.offline {
        component_info!(ComponentId::Cli, "🔌 Offline mode, variants come from templates");
        return run(cli, config, store, OfflineGenerator::new()).await;
    }

    let timeout = Duration::from_secs(config.optimizer.generation_timeout_secs);
    let generator = LlmGenerationService::from_env(timeout)?;
    if generator.providers().is_empty() {
        component_info!(ComponentId::Cli, "🔑 No provider API keys found, falling back to templates");
    } else {
        component_debug!(ComponentId::Cli, providers = ?generator.providers(), "Generation providers configured");
    }
    run(cli, config, store, generator).await
}
