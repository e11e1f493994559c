//! Herald HTTP Clients
//!
//! Small, type-safe HTTP clients for the two remote APIs the relay talks to:
//! - [`DevmanClient`]: the review long polling endpoint
//! - [`TelegramClient`]: the bot API used to deliver chat messages
//!
//! # Example
//!
//! ```no_run
//! use herald_client::{DevmanClient, TelegramClient};
//! use herald_core::dto::PollOutcome;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reviews = DevmanClient::new("https://dvmn.org/api/long_polling/", "Token abc");
//!     let bot = TelegramClient::new("123:bot-token");
//!
//!     if let PollOutcome::Response(response) = reviews.long_poll(None, Duration::from_secs(91)).await? {
//!         if let Some(attempt) = response.first_attempt() {
//!             bot.send_message("42", &attempt.lesson_title).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod devman;
pub mod error;
mod telegram;

// Re-export commonly used types
pub use devman::DevmanClient;
pub use error::{ClientError, Result};
pub use herald_core::dto::{PollOutcome, PollResponse};
pub use telegram::{DEFAULT_API_URL, DEFAULT_SEND_TIMEOUT, TelegramClient};

// =============================================================================
// Response Handlers
// =============================================================================

/// Check the status code of an API response
///
/// Returns the response untouched when the request succeeded, or an
/// [`ClientError::ApiError`] carrying the body text otherwise.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(response)
}
