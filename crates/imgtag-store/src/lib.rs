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

//! State containers mirroring server data for display.
//!
//! Each container holds one immutable snapshot inside an observable
//! [`Store`], replaces it wholesale on every transition, and notifies
//! subscribers synchronously. None of them touch the network: callers apply
//! transitions after a successful client round trip.
//!
//! Layout:
//! - `observable.rs`: generic snapshot store with subscribe/unsubscribe
//! - `storage.rs`: durable credential storage (file or in-memory)
//! - `auth.rs`: authentication snapshot and session persistence
//! - `api_keys.rs`: API key list read-model
//! - `usage.rs`: usage log and quota read-model

pub mod api_keys;
pub mod auth;
pub mod observable;
pub mod storage;
pub mod usage;

pub use api_keys::{ApiKeysState, ApiKeysStore};
pub use auth::{AuthState, AuthStore};
pub use observable::{Store, Subscription};
pub use storage::{
    CredentialStorage, FileStorage, MemoryStorage, STORAGE_KEY_API_KEY, STORAGE_KEY_SESSION,
    StorageError, StorageResult,
};
pub use usage::{UsageState, UsageStore};
