#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the image tagging API.
//!
//! Field names follow the snake_case wire format emitted by the backend. The
//! client crate decodes responses straight into these types and the state
//! containers hold them as-is, so there is a single definition of each entity.

use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier assigned by the backend to users.
pub type UserId = i64;
/// Identifier assigned by the backend to API keys.
pub type ApiKeyId = i64;

/// Account record returned by register, login, and "who am I".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Server-assigned identifier.
    pub id: UserId,
    /// Account email address.
    pub email: String,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Body for `POST /api/v1/auth/register/`.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Email address for the new account.
    pub email: String,
    /// Chosen password.
    pub password: String,
    /// Password confirmation; the client always mirrors `password`.
    pub password2: String,
}

impl RegisterRequest {
    /// Build a registration payload with the confirmation mirrored.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            email: email.into(),
            password2: password.clone(),
            password,
        }
    }
}

impl Debug for RegisterRequest {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RegisterRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Body for `POST /api/v1/auth/login/`.
#[derive(Clone, Serialize, PartialEq, Eq)]
pub struct LoginRequest {
    /// Account email address.
    pub email: String,
    /// Account password.
    pub password: String,
}

impl Debug for LoginRequest {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Display-safe view of an API key as returned by `GET /api/v1/keys/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeySummary {
    /// Server-assigned identifier.
    pub id: ApiKeyId,
    /// Masked rendering of the key; never sufficient to authenticate.
    pub masked_key: String,
    /// Issue timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time the key authenticated a request, if ever.
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ApiKeySummary {
    /// Whether this listing entry describes `raw`.
    ///
    /// The backend masks keys with its own prefix length, so only the last
    /// four characters are compared.
    #[must_use]
    pub fn matches_raw_key(&self, raw: &str) -> bool {
        const SUFFIX: usize = 4;

        let raw: Vec<char> = raw.trim().chars().collect();
        if raw.len() < SUFFIX {
            return false;
        }
        let suffix: String = raw[raw.len() - SUFFIX..].iter().collect();
        self.masked_key.trim_end().ends_with(&suffix)
    }
}

/// Creation response for `POST /api/v1/keys/`.
///
/// This is the only payload that ever carries the raw key. `Debug` redacts it
/// so the secret cannot leak through logs.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeySecret {
    /// Server-assigned identifier.
    pub id: ApiKeyId,
    /// Raw key value, revealed once.
    pub key: String,
    /// Masked rendering of the key.
    pub masked_key: String,
    /// Issue timestamp.
    pub created_at: DateTime<Utc>,
}

impl ApiKeySecret {
    /// Summary view suitable for the key list.
    #[must_use]
    pub fn summary(&self) -> ApiKeySummary {
        ApiKeySummary {
            id: self.id,
            masked_key: self.masked_key.clone(),
            created_at: self.created_at,
            last_used_at: None,
        }
    }

    /// Identity details installed when the key becomes the active credential.
    #[must_use]
    pub fn info(&self) -> ApiKeyInfo {
        ApiKeyInfo {
            masked_key: self.masked_key.clone(),
            ..ApiKeyInfo::default()
        }
    }
}

impl Debug for ApiKeySecret {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiKeySecret")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .field("masked_key", &self.masked_key)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Details about the credential currently in use.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeyInfo {
    /// Masked rendering of the active key.
    pub masked_key: String,
    /// Weekly quota associated with the key, when known.
    #[serde(default)]
    pub weekly_quota: Option<u64>,
    /// Remaining quota for the current window, when known.
    #[serde(default)]
    pub remaining_quota: Option<u64>,
    /// Last time the key was used.
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Next quota reset.
    #[serde(default)]
    pub quota_reset_at: Option<DateTime<Utc>>,
}

impl ApiKeyInfo {
    /// Info derived from a raw key the user supplied directly.
    #[must_use]
    pub fn from_raw_key(raw: &str) -> Self {
        Self {
            masked_key: mask_key(raw),
            ..Self::default()
        }
    }
}

/// Tagging strategy requested from the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaggingMode {
    /// Single-pass tagging.
    Fast,
    /// Tagging with an intermediate reasoning step.
    Reasoning,
    /// Multi-step reasoning pipeline.
    AdvancedReasoning,
}

impl TaggingMode {
    /// Wire representation of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Reasoning => "reasoning",
            Self::AdvancedReasoning => "advanced_reasoning",
        }
    }
}

impl FromStr for TaggingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "fast" => Ok(Self::Fast),
            "reasoning" => Ok(Self::Reasoning),
            "advanced_reasoning" | "advanced-reasoning" => Ok(Self::AdvancedReasoning),
            other => Err(format!(
                "unknown tagging mode '{other}' (expected fast, reasoning, or advanced_reasoning)"
            )),
        }
    }
}

/// Body for `POST /api/v1/tag/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaggingRequest {
    /// Publicly reachable image URL.
    pub image_url: String,
    /// Optional mode; the server picks its default when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TaggingMode>,
}

impl TaggingRequest {
    /// Request tagging for `image_url` with the server default mode.
    #[must_use]
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            mode: None,
        }
    }

    /// Select an explicit tagging mode.
    #[must_use]
    pub fn with_mode(mut self, mode: TaggingMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Tagging result. `tags` is opaque JSON: an object, a list of strings, or
/// anything else the backend chooses to emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaggingResponse {
    /// Image the tags were produced for.
    pub image_url: String,
    /// Tag payload.
    #[serde(default)]
    pub tags: Value,
}

/// One usage log record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsageEntry {
    /// When the request was served.
    pub timestamp: DateTime<Utc>,
    /// Endpoint path that was called.
    pub endpoint: String,
    /// HTTP status returned.
    pub status: u16,
    /// Whether the call counted as a success.
    pub success: bool,
}

/// Quota accounting for the current window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaSnapshot {
    /// Requests consumed.
    pub used: u64,
    /// Ceiling for the window.
    pub limit: u64,
    /// Requests left; always `max(0, limit - used)`.
    pub remaining: u64,
}

impl QuotaSnapshot {
    /// Build a snapshot with `remaining` derived from `used` and `limit`.
    #[must_use]
    pub const fn new(used: u64, limit: u64) -> Self {
        Self {
            used,
            limit,
            remaining: remaining_quota(used, limit),
        }
    }

    /// Snapshot after one more consumed request.
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self::new(self.used.saturating_add(1), self.limit)
    }

    /// Consumed share of the limit, rounded to a whole percent.
    #[must_use]
    pub fn percentage(self) -> u64 {
        quota_percentage(self.used, self.limit)
    }
}

/// Requests left under `total` after `used`, clamped at zero.
#[must_use]
pub const fn remaining_quota(used: u64, total: u64) -> u64 {
    total.saturating_sub(used)
}

/// Percentage of `total` consumed, rounded half up; zero when `total` is zero.
#[must_use]
pub fn quota_percentage(used: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let scaled = u128::from(used) * 100;
    let total = u128::from(total);
    let rounded = (scaled + total / 2) / total;
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Display-safe rendering of a raw key: a short prefix and suffix around an
/// elided middle. Short keys are fully obscured.
#[must_use]
pub fn mask_key(raw: &str) -> String {
    const PREFIX: usize = 8;
    const SUFFIX: usize = 4;

    let chars: Vec<char> = raw.trim().chars().collect();
    if chars.len() <= PREFIX + SUFFIX {
        return "*".repeat(chars.len().max(4));
    }
    let prefix: String = chars[..PREFIX].iter().collect();
    let suffix: String = chars[chars.len() - SUFFIX..].iter().collect();
    format!("{prefix}…{suffix}")
}

/// Human-readable timestamp, `Never` when absent.
#[must_use]
pub fn format_timestamp(value: Option<&DateTime<Utc>>) -> String {
    value.map_or_else(
        || "Never".to_string(),
        |ts| ts.format("%b %-d, %Y %H:%M").to_string(),
    )
}
