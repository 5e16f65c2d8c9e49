//! Error type shared by every client operation.

use thiserror::Error;

/// Failure of a single client operation. `Display` is the user-facing message.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received (connection refused, DNS, timeout).
    #[error("network error while calling {endpoint}: {source}")]
    Transport {
        /// Path that was being requested.
        endpoint: String,
        /// Underlying transport failure.
        source: reqwest::Error,
    },
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message derived from the error payload.
        message: String,
    },
    /// An API-key operation was attempted with no key configured.
    #[error("no API key available; generate one and adopt it first")]
    MissingCredential,
    /// The request was rejected locally before any network I/O.
    #[error("{0}")]
    InvalidRequest(String),
    /// A 2xx payload did not match the expected shape.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        /// Path that was requested.
        endpoint: String,
        /// Status of the response that failed to decode.
        status: u16,
        /// Decoding failure.
        source: serde_json::Error,
    },
    /// The request URL could not be built from the base URL.
    #[error("invalid request URL for {path}: {source}")]
    InvalidUrl {
        /// Path that was being joined.
        path: String,
        /// Parse failure.
        source: url::ParseError,
    },
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl ClientError {
    /// HTTP status for server-reported failures.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Status of any response that was received, including 2xx responses
    /// whose body could not be decoded.
    #[must_use]
    pub const fn response_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure stems from the caller's input or credentials
    /// rather than the transport or the server.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 400 && *status < 500,
            Self::MissingCredential | Self::InvalidRequest(_) => true,
            Self::Transport { .. }
            | Self::Decode { .. }
            | Self::InvalidUrl { .. }
            | Self::Build(_) => false,
        }
    }
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_derived_message() {
        let err = ClientError::Http {
            status: 400,
            message: "email: already taken".to_string(),
        };
        assert_eq!(err.to_string(), "email: already taken");
        assert_eq!(err.status(), Some(400));
        assert!(err.is_caller_error());
    }

    #[test]
    fn server_errors_are_not_caller_errors() {
        let err = ClientError::Http {
            status: 503,
            message: "HTTP 503".to_string(),
        };
        assert!(!err.is_caller_error());
        assert!(ClientError::MissingCredential.is_caller_error());
        assert_eq!(ClientError::MissingCredential.status(), None);
    }

    #[test]
    fn decode_failures_keep_the_response_status() {
        let source = serde_json::from_str::<u8>("\"x\"").expect_err("bad number");
        let err = ClientError::Decode {
            endpoint: "/api/v1/tag/".to_string(),
            status: 201,
            source,
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.response_status(), Some(201));
        assert_eq!(ClientError::MissingCredential.response_status(), None);
    }
}
