//! API key list read-model.

use std::sync::Arc;

use imgtag_api_models::{ApiKeyId, ApiKeySummary};

use crate::observable::{Store, Subscription};

/// Snapshot of the caller's API keys.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiKeysState {
    /// Keys, most recently created first after local additions.
    pub items: Vec<ApiKeySummary>,
    /// Whether a list round trip is in flight.
    pub loading: bool,
    /// Last user-facing error.
    pub error: Option<String>,
    /// Key highlighted by the caller.
    pub selected_id: Option<ApiKeyId>,
}

impl ApiKeysState {
    /// Currently selected key, when it is still present.
    #[must_use]
    pub fn selected(&self) -> Option<&ApiKeySummary> {
        let id = self.selected_id?;
        self.items.iter().find(|key| key.id == id)
    }
}

/// Observable container for [`ApiKeysState`].
#[derive(Clone, Debug, Default)]
pub struct ApiKeysStore {
    store: Store<ApiKeysState>,
}

impl ApiKeysStore {
    /// Empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ApiKeysState> {
        self.store.snapshot()
    }

    /// Notify `listener` after every transition.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ApiKeysState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Replace the list wholesale with the server's view.
    pub fn set_list(&self, items: Vec<ApiKeySummary>) {
        self.store.update(|state| ApiKeysState {
            items,
            ..state.clone()
        });
    }

    /// Prepend a freshly created key.
    pub fn add_item(&self, item: ApiKeySummary) {
        self.store.update(|state| {
            let mut items = Vec::with_capacity(state.items.len() + 1);
            items.push(item);
            items.extend(state.items.iter().cloned());
            ApiKeysState {
                items,
                ..state.clone()
            }
        });
    }

    /// Drop the key with `id`, clearing the selection if it pointed there.
    pub fn remove_item(&self, id: ApiKeyId) {
        self.store.update(|state| ApiKeysState {
            items: state
                .items
                .iter()
                .filter(|key| key.id != id)
                .cloned()
                .collect(),
            selected_id: state.selected_id.filter(|selected| *selected != id),
            ..state.clone()
        });
    }

    /// Highlight a key, or clear the selection with `None`.
    pub fn select(&self, id: Option<ApiKeyId>) {
        self.store.update(|state| ApiKeysState {
            selected_id: id,
            ..state.clone()
        });
    }

    /// Toggle the in-flight flag.
    pub fn set_loading(&self, loading: bool) {
        self.store.update(|state| ApiKeysState {
            loading,
            ..state.clone()
        });
    }

    /// Record or clear the user-facing error.
    pub fn set_error(&self, error: Option<String>) {
        self.store.update(|state| ApiKeysState {
            error,
            ..state.clone()
        });
    }

    /// Return to the empty initial snapshot.
    pub fn reset(&self) {
        self.store.set(ApiKeysState::default());
    }
}
