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

//! Logging setup shared by the imgtag binaries.
//!
//! Layout: `init.rs` (subscriber installation and log format selection).

pub mod init;

pub use init::{
    DEFAULT_LOG_LEVEL, ENV_LOG_FORMAT, LogFormat, LoggingConfig, build_sha, init_logging,
};
