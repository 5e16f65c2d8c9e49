//! Usage log and quota read-model.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use imgtag_api_models::{QuotaSnapshot, UsageEntry};

use crate::observable::{Store, Subscription};

/// Snapshot of recent usage and the current quota window.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UsageState {
    /// Usage records, most recent first after local additions.
    pub entries: Vec<UsageEntry>,
    /// Quota accounting, once fetched.
    pub quota: Option<QuotaSnapshot>,
    /// Whether a usage round trip is in flight.
    pub loading: bool,
    /// Last user-facing error.
    pub error: Option<String>,
}

/// Observable container for [`UsageState`].
#[derive(Clone, Debug, Default)]
pub struct UsageStore {
    store: Store<UsageState>,
}

impl UsageStore {
    /// Empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<UsageState> {
        self.store.snapshot()
    }

    /// Notify `listener` after every transition.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&UsageState) + Send + Sync + 'static,
    {
        self.store.subscribe(listener)
    }

    /// Replace the usage log wholesale.
    pub fn set_list(&self, entries: Vec<UsageEntry>) {
        self.store.update(|state| UsageState {
            entries,
            ..state.clone()
        });
    }

    /// Prepend a usage record.
    pub fn add_item(&self, entry: UsageEntry) {
        self.store.update(|state| {
            let mut entries = Vec::with_capacity(state.entries.len() + 1);
            entries.push(entry);
            entries.extend(state.entries.iter().cloned());
            UsageState {
                entries,
                ..state.clone()
            }
        });
    }

    /// Drop every record logged at `timestamp`.
    pub fn remove_item(&self, timestamp: DateTime<Utc>) {
        self.store.update(|state| UsageState {
            entries: state
                .entries
                .iter()
                .filter(|entry| entry.timestamp != timestamp)
                .cloned()
                .collect(),
            ..state.clone()
        });
    }

    /// Install a fresh quota snapshot, normalising `remaining`.
    pub fn set_quota(&self, quota: QuotaSnapshot) {
        let quota = QuotaSnapshot::new(quota.used, quota.limit);
        self.store.update(|state| UsageState {
            quota: Some(quota),
            ..state.clone()
        });
    }

    /// Count one more consumed request. Without a known quota this is a no-op.
    pub fn increment_usage(&self) {
        self.store.update(|state| UsageState {
            quota: state.quota.map(QuotaSnapshot::incremented),
            ..state.clone()
        });
    }

    /// Toggle the in-flight flag.
    pub fn set_loading(&self, loading: bool) {
        self.store.update(|state| UsageState {
            loading,
            ..state.clone()
        });
    }

    /// Record or clear the user-facing error.
    pub fn set_error(&self, error: Option<String>) {
        self.store.update(|state| UsageState {
            error,
            ..state.clone()
        });
    }

    /// Return to the empty initial snapshot.
    pub fn reset(&self) {
        self.store.set(UsageState::default());
    }
}
