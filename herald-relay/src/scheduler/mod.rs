//! Scheduler layer for the relay
//!
//! This layer runs the long polling loop and decides, for every response,
//! whether to notify, advance the cursor or pause before retrying.

pub mod poller;

pub use poller::ReviewPoller;
