mod bot;
mod config;
mod language;
mod translator;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,translatorbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A .env file is optional; deployments set the variables directly
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  DeepL endpoint: {}", config.deepl.api_url);

    // Create shared state
    let state = Arc::new(AppState::new(config)?);

    // Fail fast on a bad API key before accepting any messages
    state.translator().verify_credentials().await?;
    info!("DeepL translator initialized successfully");

    // Run the Telegram bot
    info!("Bot is starting...");
    bot::run(state).await?;

    Ok(())
}
