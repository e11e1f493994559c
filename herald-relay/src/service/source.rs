//! Review source service
//!
//! Abstracts the long polling endpoint the poller reads from.

use async_trait::async_trait;
use herald_client::{ClientError, DevmanClient};
use herald_core::domain::Cursor;
use herald_core::dto::PollOutcome;
use std::time::Duration;

/// Service trait for waiting on new reviews
#[async_trait]
pub trait ReviewSource: Send + Sync {
    /// Issues one long polling request
    ///
    /// # Arguments
    /// * `cursor` - The cursor from the previous response, absent on the first call
    ///
    /// # Returns
    /// The decoded response, or [`PollOutcome::TimedOut`] if the server
    /// did not answer within the read timeout
    async fn poll(&self, cursor: Option<&Cursor>) -> Result<PollOutcome, ClientError>;
}

/// Review source backed by the review long polling API
pub struct DevmanReviewSource {
    client: DevmanClient,
    read_timeout: Duration,
}

impl DevmanReviewSource {
    /// Creates a new review source
    ///
    /// # Arguments
    /// * `client` - The long polling client
    /// * `read_timeout` - Fresh timeout applied to every request
    pub fn new(client: DevmanClient, read_timeout: Duration) -> Self {
        Self {
            client,
            read_timeout,
        }
    }
}

#[async_trait]
impl ReviewSource for DevmanReviewSource {
    async fn poll(&self, cursor: Option<&Cursor>) -> Result<PollOutcome, ClientError> {
        self.client.long_poll(cursor, self.read_timeout).await
    }
}
