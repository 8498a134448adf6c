// This is the entry point of the content moderator.
//
// **Architecture Overview:**
// - `core/` = Business logic (provider-agnostic moderation pipeline)
// - `infra/` = Implementations of core traits (LLM HTTP clients)
// - `console/` = Console adapter (reads submissions, prints verdicts)
//
// This file's job is to:
// 1. Load configuration
// 2. Build the judgment provider and the workflow (dependency injection)
// 3. Hand stdin/stdout to the console session

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "console/console_layer.rs"]
mod console;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

mod app_config;

use crate::app_config::{AppConfig, ProviderSettings};
use crate::core::ai::AiProvider;
use crate::core::moderation::{LlmSeverityClassifier, ModerationWorkflow, INSTRUCTION_VERSION};
use crate::infra::ai::{GeminiClient, OpenRouterClient};
use anyhow::Context;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

/// Build the HTTP-backed provider selected in the config.
///
/// The shared `reqwest::Client` carries a request timeout slightly above the
/// classifier's own bound, so the classifier's timeout is the one that fires.
fn build_provider(config: &AppConfig) -> anyhow::Result<Box<dyn AiProvider>> {
    let http = reqwest::Client::builder()
        .timeout(config.classifier.timeout + std::time::Duration::from_secs(5))
        .build()
        .context("Failed to build HTTP client")?;

    let provider: Box<dyn AiProvider> = match &config.provider {
        ProviderSettings::OpenRouter { api_key, base_url } => Box::new(
            OpenRouterClient::with_base_url(http, api_key.clone(), base_url.clone()),
        ),
        ProviderSettings::Gemini { api_key } => Box::new(GeminiClient::new(http, api_key.clone())),
    };

    Ok(provider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Log to stderr so verdicts on stdout stay readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env().context("Invalid moderation configuration")?;

    tracing::info!(
        provider = config.provider.name(),
        model = %config.classifier.model,
        timeout_secs = config.classifier.timeout.as_secs(),
        instruction_version = INSTRUCTION_VERSION,
        "Starting content moderator"
    );

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let provider = build_provider(&config)?;
    let classifier = LlmSeverityClassifier::new(provider, config.classifier.clone());
    let workflow = ModerationWorkflow::new(classifier);

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    let summary = console::session::run_session(&workflow, stdin, stdout)
        .await
        .context("Console session failed")?;

    tracing::info!(
        submissions = summary.submissions,
        approved = summary.approved,
        errors = summary.errors,
        "Session finished"
    );

    Ok(())
}
