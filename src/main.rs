mod bot;
mod config;
mod engagement;
mod history;
mod moderation;
mod scheduler;
mod selector;
mod types;
mod workflow;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::AppState;
use crate::config::Config;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,memebot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Source channels: {:?}", config.channels.sources);
    info!("  Target channel: {}", config.channels.target);
    info!("  Moderation chat: {}", config.channels.moderation);
    info!(
        "  Popularity threshold: {}%",
        config.curation.min_engagement_percentage
    );
    info!(
        "  Channel cooldown: {}h",
        config.curation.channel_cooldown_hours
    );

    let bot = Bot::new(&config.telegram.bot_token);
    let state = Arc::new(AppState::new(&config, bot.clone()));

    // Periodic popularity scan: first run shortly after startup, then on a
    // fixed interval.
    let scheduler = Scheduler::new().await?;
    let scan_state = state.clone();
    scheduler
        .add_one_shot_job(
            Duration::from_secs(config.curation.scan_initial_delay_secs),
            "initial-scan",
            move || {
                let state = scan_state.clone();
                Box::pin(async move { state.workflow.run_scan().await })
            },
        )
        .await?;
    let scan_state = state.clone();
    scheduler
        .add_repeated_job(
            Duration::from_secs(config.curation.scan_interval_minutes * 60),
            "channel-scan",
            move || {
                let state = scan_state.clone();
                Box::pin(async move { state.workflow.run_scan().await })
            },
        )
        .await?;
    scheduler.start().await?;

    // Run the Telegram dispatcher
    info!("Bot is starting...");
    bot::run(bot, state).await?;

    Ok(())
}
