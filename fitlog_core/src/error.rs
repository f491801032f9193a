//! Error types for the fitlog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for fitlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP transport error talking to the advice service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile fields out of range
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// An operation needs a completed profile
    #[error("No profile found; run `fitlog profile set` first")]
    MissingProfile,

    /// User-supplied input rejected before reaching the core
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persisted state management error
    #[error("State error: {0}")]
    State(String),

    /// The advice service answered with something unusable
    #[error("Advice service error: {0}")]
    Advice(String),
}
