//! Error type shared by every stage of the solver.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoaxError>;

/// Top-level error type for the crate.
#[derive(Debug, Error)]
pub enum CoaxError {
    /// Invalid model, medium, table or sweep description. Raised before any
    /// computation starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Interface algebra evaluated on a pair whose impedances sum to zero.
    #[error("domain error: impedances {left} Ω and {right} Ω sum to zero")]
    Domain { left: f64, right: f64 },

    /// A derived quantity was requested before its prerequisite.
    #[error("{stage} requested before {requires} was computed")]
    Ordering {
        stage: &'static str,
        requires: &'static str,
    },

    /// A numerical procedure was handed input it cannot finish on.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Malformed line in a numeric text file (1-based line number).
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl CoaxError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn numerical(message: impl Into<String>) -> Self {
        Self::Numerical(message.into())
    }
}
