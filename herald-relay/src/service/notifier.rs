//! Notifier service
//!
//! Delivers review notifications and forwarded log lines to the chat.

use anyhow::{Context, Result};
use async_trait::async_trait;
use herald_client::TelegramClient;
use herald_core::domain::ReviewAttempt;
use herald_core::message;
use url::Url;

/// Service trait for outbound chat messages
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one message describing a reviewed attempt
    async fn notify(&self, attempt: &ReviewAttempt) -> Result<()>;

    /// Sends arbitrary text to the same chat
    async fn send_text(&self, text: &str) -> Result<()>;
}

/// Notifier that posts to a single Telegram chat
pub struct TelegramNotifier {
    client: TelegramClient,
    chat_id: String,
    site_url: Url,
}

impl TelegramNotifier {
    /// Creates a new Telegram notifier
    ///
    /// # Arguments
    /// * `client` - The bot API client
    /// * `chat_id` - The recipient chat
    /// * `site_url` - Origin relative lesson paths are resolved against
    pub fn new(client: TelegramClient, chat_id: String, site_url: Url) -> Self {
        Self {
            client,
            chat_id,
            site_url,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, attempt: &ReviewAttempt) -> Result<()> {
        let text = message::review_message(&self.site_url, attempt)
            .with_context(|| format!("Invalid lesson url {:?}", attempt.lesson_url))?;

        self.send_text(&text).await
    }

    async fn send_text(&self, text: &str) -> Result<()> {
        self.client
            .send_message(&self.chat_id, text)
            .await
            .context("Failed to send Telegram message")?;

        Ok(())
    }
}
