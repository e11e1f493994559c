//! Herald Core
//!
//! Core types shared by the Herald relay crates.
//!
//! This crate contains:
//! - Domain types: Long polling cursor, review attempts, chat log entries
//! - DTOs: The wire format of the review long polling endpoint
//! - Message: The text template for review notifications

pub mod domain;
pub mod dto;
pub mod message;
