//! Review long polling endpoint

use herald_core::domain::Cursor;
use herald_core::dto::{PollOutcome, PollResponse};
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use tracing::debug;

use crate::check_status;
use crate::error::{ClientError, Result};

/// HTTP client for the review long polling API
///
/// The server holds each request open until a review arrives or its own
/// timeout elapses, so every call is given an explicit read timeout.
#[derive(Clone)]
pub struct DevmanClient {
    /// Full URL of the long polling endpoint
    poll_url: String,
    /// Value sent verbatim in the `Authorization` header
    token: String,
    /// HTTP client instance
    client: Client,
}

impl DevmanClient {
    /// Create a new review client
    ///
    /// # Arguments
    /// * `poll_url` - The long polling endpoint (e.g., "https://dvmn.org/api/long_polling/")
    /// * `token` - The `Authorization` header value
    pub fn new(poll_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(poll_url, token, Client::new())
    }

    /// Create a new review client with a custom HTTP client
    ///
    /// Useful to configure proxies or TLS settings. Do not set a global
    /// timeout on `client`; the read timeout is passed per request.
    pub fn with_client(
        poll_url: impl Into<String>,
        token: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            poll_url: poll_url.into(),
            token: token.into(),
            client,
        }
    }

    /// Get the long polling endpoint
    pub fn poll_url(&self) -> &str {
        &self.poll_url
    }

    /// Wait for new reviews
    ///
    /// # Arguments
    /// * `cursor` - The cursor returned by the previous response, if any
    /// * `read_timeout` - How long to wait for the server to answer
    ///
    /// # Returns
    /// [`PollOutcome::TimedOut`] when the read timeout expires, otherwise the
    /// decoded response body.
    pub async fn long_poll(
        &self,
        cursor: Option<&Cursor>,
        read_timeout: Duration,
    ) -> Result<PollOutcome> {
        let mut request = self
            .client
            .get(&self.poll_url)
            .header(AUTHORIZATION, &self.token)
            .timeout(read_timeout);

        if let Some(cursor) = cursor {
            request = request.query(&[("timestamp", cursor.as_str())]);
        }

        let response = match request.send().await {
            Ok(response) => response,
            // A connect timeout is a connection failure, not a quiet poll
            Err(e) if e.is_timeout() && !e.is_connect() => {
                debug!("Long polling request timed out after {:?}", read_timeout);
                return Ok(PollOutcome::TimedOut);
            }
            Err(e) => return Err(e.into()),
        };

        let response = check_status(response).await?;

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => {
                debug!("Long polling body read timed out after {:?}", read_timeout);
                return Ok(PollOutcome::TimedOut);
            }
            Err(e) => return Err(e.into()),
        };

        decode_poll_body(&body).map(PollOutcome::Response)
    }
}

impl std::fmt::Debug for DevmanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevmanClient")
            .field("poll_url", &self.poll_url)
            .finish_non_exhaustive()
    }
}

/// Decode a long polling body
///
/// A body carrying an `error` field is reported as [`ClientError::Remote`]
/// even though the HTTP status was a success.
fn decode_poll_body(body: &[u8]) -> Result<PollResponse> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))?;

    if let Some(error) = value.get("error") {
        let message = match error {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(ClientError::Remote(message));
    }

    serde_json::from_value(value)
        .map_err(|e| ClientError::ParseError(format!("Unexpected long polling response: {}", e)))
}
