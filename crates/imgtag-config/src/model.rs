//! Typed client configuration and its validation.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Resolved configuration shared by the HTTP client and credential storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Origin (and optional path prefix) every API path is appended to.
    pub base_url: Url,
    /// Transport timeout applied per request.
    pub timeout: Duration,
    /// File holding the durable credential.
    pub state_path: PathBuf,
}

impl ClientConfig {
    /// Validate and assemble a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTimeout`] when `timeout_secs` is zero.
    pub fn new(base_url: Url, timeout_secs: u64, state_path: PathBuf) -> ConfigResult<Self> {
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                value: timeout_secs.to_string(),
            });
        }
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            state_path,
        })
    }
}

/// Parse and validate an API base URL.
///
/// # Errors
///
/// Rejects values that do not parse, use a scheme other than `http`/`https`,
/// or lack a host.
pub fn parse_base_url(input: &str) -> ConfigResult<Url> {
    let trimmed = input.trim();
    let url = trimmed
        .parse::<Url>()
        .map_err(|err| ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: err.to_string(),
        })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidBaseUrl {
            value: trimmed.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}
