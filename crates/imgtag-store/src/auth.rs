//! Authentication snapshot and durable credential handling.
//!
//! # Design
//! - Keep the snapshot as plain data; persistence happens beside the
//!   transition, not inside listeners.
//! - Storage is best-effort like browser local storage: failures are logged
//!   and the in-memory transition still happens.
//! - The raw key never reaches a log line; only masked forms do.

use std::sync::Arc;

use imgtag_api_models::{ApiKeyInfo, User, mask_key};
use tracing::{debug, warn};

use crate::observable::{Store, Subscription};
use crate::storage::{CredentialStorage, STORAGE_KEY_API_KEY, STORAGE_KEY_SESSION};

/// Authentication state visible to the rest of the application.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    /// Whether an identity is installed.
    pub authenticated: bool,
    /// Raw API-key credential used for header authentication.
    pub api_key: Option<String>,
    /// Details about the active key.
    pub key_info: Option<ApiKeyInfo>,
    /// Session user, when signed in with email and password.
    pub user: Option<User>,
    /// Last user-facing error.
    pub error: Option<String>,
    /// Whether an auth round trip is in flight.
    pub loading: bool,
}

impl AuthState {
    /// Whether the snapshot carries an identity usable for requests.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
            || self.user.is_some()
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthState")
            .field("authenticated", &self.authenticated)
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("key_info", &self.key_info)
            .field("user", &self.user)
            .field("error", &self.error)
            .field("loading", &self.loading)
            .finish()
    }
}

/// Observable auth container backed by durable storage.
#[derive(Clone)]
pub struct AuthStore {
    store: Store<AuthState>,
    storage: Arc<dyn CredentialStorage>,
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthStore")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl AuthStore {
    /// Unauthenticated container persisting into `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        Self {
            store: Store::new(AuthState::default()),
            storage,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AuthState> {
        self.store.snapshot()
    }

    /// Currently configured API key, if any.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.snapshot()
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
    }

    /// Notify `listener` after every transition.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Install an API key without changing the authenticated flag.
    pub fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into();
        self.store.update(|state| AuthState {
            api_key: Some(key),
            ..state.clone()
        });
    }

    /// Install details about the active key.
    pub fn set_key_info(&self, info: ApiKeyInfo) {
        self.store.update(|state| AuthState {
            key_info: Some(info),
            ..state.clone()
        });
    }

    /// Install the session user without changing the authenticated flag.
    pub fn set_user(&self, user: User) {
        self.store.update(|state| AuthState {
            user: Some(user),
            ..state.clone()
        });
    }

    /// Record or clear the user-facing error.
    pub fn set_error(&self, error: Option<String>) {
        self.store.update(|state| AuthState {
            error,
            ..state.clone()
        });
    }

    /// Toggle the in-flight flag.
    pub fn set_loading(&self, loading: bool) {
        self.store.update(|state| AuthState {
            loading,
            ..state.clone()
        });
    }

    /// Adopt `key` as the active credential and persist it for later runs.
    ///
    /// A blank key is refused: nothing is stored and only `error` changes.
    pub fn authenticate(&self, key: impl Into<String>, info: ApiKeyInfo) {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            warn!("refusing to authenticate with a blank API key");
            self.set_error(Some("API key cannot be empty".to_string()));
            return;
        }
        if let Err(err) = self.storage.set(STORAGE_KEY_API_KEY, &key) {
            warn!(error = %err, "failed to persist API key");
        }
        debug!(masked_key = %info.masked_key, "authenticated with API key");
        self.store.update(|state| AuthState {
            authenticated: true,
            api_key: Some(key),
            key_info: Some(info),
            user: state.user.clone(),
            error: None,
            loading: false,
        });
    }

    /// Record a successful session sign-in, keeping any API key already held.
    pub fn sign_in(&self, user: User) {
        debug!(user_id = user.id, "session sign-in");
        self.store.update(|state| AuthState {
            authenticated: true,
            user: Some(user),
            error: None,
            loading: false,
            ..state.clone()
        });
    }

    /// Forget every credential, durable ones included, and reset the snapshot.
    pub fn logout(&self) {
        for key in [STORAGE_KEY_API_KEY, STORAGE_KEY_SESSION] {
            if let Err(err) = self.storage.remove(key) {
                warn!(error = %err, storage_key = key, "failed to clear stored credential");
            }
        }
        self.store.set(AuthState::default());
    }

    /// Reinstate a stored API key without contacting the server.
    ///
    /// Returns whether a key was found. The server stays the final authority
    /// and rejects stale keys on first use.
    pub fn restore_session(&self) -> bool {
        let stored = match self.storage.get(STORAGE_KEY_API_KEY) {
            Ok(stored) => stored.filter(|key| !key.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read stored API key");
                None
            }
        };
        let Some(key) = stored else {
            return false;
        };
        self.store.update(|state| AuthState {
            authenticated: true,
            key_info: state
                .key_info
                .clone()
                .or_else(|| Some(ApiKeyInfo::from_raw_key(&key))),
            api_key: Some(key),
            ..state.clone()
        });
        true
    }

    /// Session cookie exported by a previous run.
    #[must_use]
    pub fn stored_session(&self) -> Option<String> {
        match self.storage.get(STORAGE_KEY_SESSION) {
            Ok(cookie) => cookie.filter(|value| !value.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "failed to read stored session");
                None
            }
        }
    }

    /// Persist (or clear, with `None`) the session cookie for later runs.
    pub fn persist_session(&self, cookie: Option<&str>) {
        let outcome = match cookie {
            Some(value) => self.storage.set(STORAGE_KEY_SESSION, value),
            None => self.storage.remove(STORAGE_KEY_SESSION),
        };
        if let Err(err) = outcome {
            warn!(error = %err, "failed to persist session");
        }
    }
}
