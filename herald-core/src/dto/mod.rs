//! Data Transfer Objects for the review API
//!
//! These types mirror the JSON bodies returned by the long polling endpoint.

pub mod poll;

pub use poll::{PollOutcome, PollResponse};
