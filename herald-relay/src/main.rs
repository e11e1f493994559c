//! Herald Relay
//!
//! Forwards lesson review results from the review server to a Telegram chat.
//!
//! Architecture:
//! - Configuration: Load credentials and tuning from the environment (or `.env`)
//! - Services: Review source (long polling), notifier (Telegram), chat log bridge
//! - Scheduler: The long polling loop that threads the cursor between requests
//!
//! The relay runs until interrupted; it is meant to be kept alive by a
//! process supervisor.

mod config;
mod scheduler;
mod service;

use anyhow::{Context, Result};
use herald_client::{DevmanClient, TelegramClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::scheduler::ReviewPoller;
use crate::service::chat_log::spawn_log_sender;
use crate::service::{
    CHAT_TARGET, ChatLogBuffer, ChatLogLayer, DevmanReviewSource, Notifier, ReviewSource,
    TelegramNotifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = load_config()?;

    // Initialize logging
    let chat_buffer = config.chat_logs.then(ChatLogBuffer::new);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "herald_relay=info,herald_client=info,herald=info".into()),
                ),
        )
        .with(chat_buffer.clone().map(ChatLogLayer::new))
        .init();

    info!("Loaded configuration: {:?}", config);

    // Initialize clients
    let http = reqwest::Client::new();
    let telegram = TelegramClient::with_api_url(&config.telegram_api_url, &config.bot_token, http.clone())
        .with_send_timeout(config.send_timeout);
    let devman = DevmanClient::with_client(&config.poll_url, &config.dvmn_token, http);

    // Initialize services
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
        telegram,
        config.chat_id.clone(),
        config.site_url.clone(),
    ));
    let source: Arc<dyn ReviewSource> =
        Arc::new(DevmanReviewSource::new(devman, config.read_timeout));

    let shutdown = CancellationToken::new();
    spawn_shutdown_listener(shutdown.clone());

    let log_sender = chat_buffer.map(|buffer| {
        spawn_log_sender(
            buffer,
            Arc::clone(&notifier),
            config.log_send_interval,
            shutdown.clone(),
        )
    });

    info!(target: CHAT_TARGET, "Бот запущен");

    // Start polling loop
    let poller = ReviewPoller::new(source, notifier, config.retry_delay);
    let result = poller.run(shutdown.clone()).await;
    if let Err(e) = &result {
        error!("Poller error: {:#}", e);
    }

    // Flush whatever the chat log bridge still holds
    shutdown.cancel();
    if let Some(handle) = log_sender {
        if let Err(e) = handle.await {
            warn!("Chat log sender panicked: {}", e);
        }
    }

    result
}

/// Loads configuration from the environment and validates it
fn load_config() -> Result<Config> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Cancels `shutdown` on Ctrl-C
fn spawn_shutdown_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
}
