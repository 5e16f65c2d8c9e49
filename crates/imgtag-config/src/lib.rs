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

//! Client configuration: API base URL, transport timeout, and the location of
//! durable credential storage.
//!
//! Layout: `defaults.rs` (fallback values and environment variable names),
//! `error.rs` (`ConfigError`), `model.rs` (`ClientConfig` and validation).

pub mod defaults;
pub mod error;
pub mod model;

pub use defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS, ENV_API_BASE_URL, ENV_HTTP_TIMEOUT_SECS,
    ENV_STATE_PATH, default_state_path,
};
pub use error::{ConfigError, ConfigResult};
pub use model::{ClientConfig, parse_base_url};
