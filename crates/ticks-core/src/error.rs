//! Error types for fetch operations.
//!
//! This module defines [`TicksError`] which covers every failure that can occur
//! while authenticating, fetching, interpreting or writing historical data.

use thiserror::Error;

/// Errors that can occur during fetch operations.
#[derive(Error, Debug)]
pub enum TicksError {
    /// The query is malformed. Detected locally, before any network call.
    #[error("Invalid query: {0}")]
    Validation(String),

    /// The provider rejected the credentials, or they were incomplete.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport-level failure (connection refused, timeout, TLS, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a structured failure.
    #[error("Provider error (status {status}): {payload}")]
    Provider {
        /// Status code reported by the provider.
        status: u16,
        /// Raw provider payload, kept for diagnostics.
        payload: serde_json::Value,
    },

    /// A provider record or an output table could not be interpreted.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Writing or reading an output table failed.
    #[error("Output error: {0}")]
    Output(String),

    /// A run configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TicksError {
    /// Returns true if this error was raised before any provider call was made.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias using [`TicksError`].
pub type Result<T> = std::result::Result<T, TicksError>;
