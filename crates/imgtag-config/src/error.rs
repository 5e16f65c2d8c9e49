//! Error types for configuration loading.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Base URL could not be parsed or is not usable as an API origin.
    #[error("invalid API base URL '{value}': {reason}")]
    InvalidBaseUrl {
        /// Offending value.
        value: String,
        /// Human-readable reason for the rejection.
        reason: String,
    },
    /// Timeout value was zero or not a number.
    #[error("invalid HTTP timeout '{value}'")]
    InvalidTimeout {
        /// Offending value.
        value: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
