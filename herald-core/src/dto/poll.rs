//! Long polling DTOs

use serde::{Deserialize, Serialize};

use crate::domain::{Cursor, ReviewAttempt};

/// Body of a successful long polling response
///
/// Discriminated by the `status` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PollResponse {
    /// No reviews arrived before the server-side timeout
    Timeout { timestamp_to_request: Cursor },

    /// One or more reviews are ready
    Found {
        new_attempts: Vec<ReviewAttempt>,
        last_attempt_timestamp: Cursor,
    },
}

impl PollResponse {
    /// The cursor to send with the next request
    pub fn next_cursor(&self) -> &Cursor {
        match self {
            PollResponse::Timeout {
                timestamp_to_request,
            } => timestamp_to_request,
            PollResponse::Found {
                last_attempt_timestamp,
                ..
            } => last_attempt_timestamp,
        }
    }

    /// The attempt to notify about, if any
    ///
    /// Only the first pending attempt is reported.
    pub fn first_attempt(&self) -> Option<&ReviewAttempt> {
        match self {
            PollResponse::Timeout { .. } => None,
            PollResponse::Found { new_attempts, .. } => new_attempts.first(),
        }
    }
}

/// Result of a single long polling request
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The server answered with a decodable body
    Response(PollResponse),

    /// The client read timeout expired before the server answered
    TimedOut,
}
