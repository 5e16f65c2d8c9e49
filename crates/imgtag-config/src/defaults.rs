//! Fallback configuration values and the environment variables that override
//! them.

use std::path::PathBuf;

/// Local development origin used when no base URL is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
/// Transport timeout applied to every request, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Environment variable overriding the API base URL.
pub const ENV_API_BASE_URL: &str = "IMGTAG_API_BASE_URL";
/// Environment variable overriding the transport timeout.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "IMGTAG_HTTP_TIMEOUT_SECS";
/// Environment variable overriding the credential storage path.
pub const ENV_STATE_PATH: &str = "IMGTAG_STATE_PATH";

const STATE_DIR: &str = "imgtag";
const STATE_FILE: &str = "credentials.json";

/// Default location of the durable credential file.
///
/// Resolves to `$HOME/.config/imgtag/credentials.json`, or a project-local
/// `.imgtag/credentials.json` when no home directory is known.
#[must_use]
pub fn default_state_path() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(
            || PathBuf::from(".imgtag").join(STATE_FILE),
            |home| {
                PathBuf::from(home)
                    .join(".config")
                    .join(STATE_DIR)
                    .join(STATE_FILE)
            },
        )
}
