//! Crate-wide error type and result alias.
//!
//! Pattern analysis itself is total: syntax problems are collected on the
//! parse result and every analysis degrades to a conservative answer
//! instead of failing. Errors here cover the host-facing edges only,
//! configuration loading and validation.

use thiserror::Error;

/// Errors surfaced to hosts embedding the analysis engine.
#[derive(Debug, Error)]
pub enum RexError {
    /// A configuration value is outside its accepted domain.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A configuration blob could not be deserialized.
    #[error("failed to parse configuration: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RexError>;
