//! Core domain types
//!
//! This module contains the domain structures shared between the HTTP
//! clients (which decode them) and the relay (which acts on them).

pub mod attempt;
pub mod cursor;
pub mod log;

pub use attempt::{ReviewAttempt, Verdict};
pub use cursor::Cursor;
pub use log::{ChatLogEntry, LogLevel};
