//! Observable snapshot store.
//!
//! # Design
//! - The snapshot lives behind an `Arc` and is swapped, never mutated, so a
//!   reader holds either the previous or the next value.
//! - Listeners run synchronously after the swap and outside every lock, so a
//!   listener may read the store it is subscribed to.
//! - `subscribe` hands back a [`Subscription`]; dropping it unsubscribes.

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Inner<S> {
    snapshot: RwLock<Arc<S>>,
    listeners: Mutex<Vec<(u64, Listener<S>)>>,
    next_listener: AtomicU64,
}

/// Shared handle to a single snapshot plus its subscribers.
///
/// Cloning the handle shares the same underlying state.
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Debug + Send + Sync + 'static> Debug for Store<S> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Store")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl<S: Default + Send + Sync + 'static> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Send + Sync + 'static> Store<S> {
    /// Create a store holding `initial`.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshot: RwLock::new(Arc::new(initial)),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(0),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<S> {
        let guard = self
            .inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Replace the snapshot and notify subscribers.
    pub fn set(&self, next: S) {
        let next = Arc::new(next);
        {
            let mut guard = self
                .inner
                .snapshot
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&next);
        }
        self.notify(&next);
    }

    /// Derive the next snapshot from the current one, replace it, and notify
    /// subscribers.
    ///
    /// `transition` runs while the snapshot is locked and must not call back
    /// into this store.
    pub fn update<F>(&self, transition: F)
    where
        F: FnOnce(&S) -> S,
    {
        let next = {
            let mut guard = self
                .inner
                .snapshot
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let next = Arc::new(transition(&**guard));
            *guard = Arc::clone(&next);
            next
        };
        self.notify(&next);
    }

    /// Register `listener` for every future transition.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = self.inner.next_listener.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));

        let weak: Weak<Inner<S>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn notify(&self, snapshot: &S) {
        let listeners: Vec<Listener<S>> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(snapshot);
        }
    }
}

/// Handle returned by [`Store::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keep the listener registered for the lifetime of the store.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Debug for Subscription {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}
