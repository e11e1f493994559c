//! Telegram Bot API endpoints

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ClientError, Result};

/// Default Telegram Bot API origin
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Default limit for a single Bot API call
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Telegram Bot API
///
/// Only the calls the relay needs are implemented.
#[derive(Clone)]
pub struct TelegramClient {
    /// Base URL of the bot API (e.g., "https://api.telegram.org")
    api_url: String,
    /// Bot token, part of every request path
    token: String,
    /// HTTP client instance
    client: Client,
    /// Limit for a whole Bot API call, body included
    send_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<u16>,
}

/// The part of a sent message the relay cares about
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

impl TelegramClient {
    /// Create a new bot client against the public Bot API
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_url(DEFAULT_API_URL, token, Client::new())
    }

    /// Create a new bot client against a custom API origin
    ///
    /// # Arguments
    /// * `api_url` - The Bot API origin, e.g. a local Bot API server
    /// * `token` - The bot token
    /// * `client` - A configured reqwest Client
    pub fn with_api_url(api_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        let api_url = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Set how long a single Bot API call may take
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Get the Bot API origin
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// Send a plain text message
    ///
    /// # Arguments
    /// * `chat_id` - Target chat identifier (numeric id or `@channel` name)
    /// * `text` - Message text
    ///
    /// # Returns
    /// The sent message
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<SentMessage> {
        if text.is_empty() {
            return Err(ClientError::InvalidRequest(
                "message text cannot be empty".to_string(),
            ));
        }

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage { chat_id, text })
            .timeout(self.send_timeout)
            .send()
            .await?;

        let message: SentMessage = self.handle_response(response).await?;
        debug!("Sent message {} to chat {}", message.message_id, chat_id);

        Ok(message)
    }

    /// Handle a Bot API response
    ///
    /// The Bot API reports failures both through the status code and the
    /// `ok` flag of the envelope; the envelope's description is preferred.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(ClientError::api_error(status.as_u16(), body));
            }
            Err(e) => {
                return Err(ClientError::ParseError(format!(
                    "Failed to parse JSON response: {}",
                    e
                )));
            }
        };

        if !envelope.ok || !status.is_success() {
            return Err(ClientError::api_error(
                envelope.error_code.unwrap_or(status.as_u16()),
                envelope
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        envelope
            .result
            .ok_or_else(|| ClientError::ParseError("Missing result in response".to_string()))
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}
