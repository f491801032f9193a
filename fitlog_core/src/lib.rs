#![forbid(unsafe_code)]

//! Core domain model and business logic for fitlog.
//!
//! This crate provides:
//! - Domain types (profile, log entries, day summaries)
//! - Calorie and macro target calculation
//! - Daily aggregation of the log
//! - Persistence (key-value store with a versioned envelope)
//! - The advice-service contract and its Gemini implementation
//! - CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod targets;
pub mod summary;
pub mod logbook;
pub mod store;
pub mod tracker;
pub mod advice;
pub mod gemini;
pub mod chat;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use logbook::LogBook;
pub use targets::calculate_targets;
pub use summary::{summarize, summarize_day, DateWindow};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use tracker::Tracker;
pub use advice::{AdviceClient, ChatReply};
pub use gemini::GeminiClient;
pub use chat::{periodic_advice, submit_message, ChatOutcome};
