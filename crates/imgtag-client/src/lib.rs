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

//! HTTP client for the image tagging REST API.
//!
//! One request per call; every outcome is either the typed payload or a
//! [`ClientError`] carrying a single human-readable message. Nothing is
//! retried or queued.
//!
//! Layout:
//! - `client.rs`: [`ApiClient`] and the endpoint operations
//! - `problem.rs`: error-message derivation from server error payloads
//! - `session.rs`: cookie-jar import/export for session persistence
//! - `error.rs`: [`ClientError`]

pub mod client;
pub mod error;
pub mod problem;
pub mod session;

pub use client::{API_KEY_SCHEME, ApiClient, HEADER_REQUEST_ID};
pub use error::{ClientError, ClientResult};
pub use problem::{
    MESSAGE_INVALID_CREDENTIAL, MESSAGE_QUOTA_EXCEEDED, error_message, key_validation_message,
};
