//! In-process store implementation.
//!
//! `MemoryStore` carries the full seam semantics — per-path version
//! counters, compare-and-swap, immediate-then-push subscriptions — inside
//! one process. Tests and the hot-seat demo run multiple "clients" against
//! a single shared `MemoryStore`, which exercises exactly the races the
//! reconciliation layer is built for.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::{Path, StoreError, Subscription, SubscriptionHandle, Versioned, VersionedStore};

/// One registered subscriber on a path.
struct Subscriber {
    tx: mpsc::UnboundedSender<Versioned<Value>>,
    alive: Arc<AtomicBool>,
}

impl Subscriber {
    fn deliver(&self, update: &Versioned<Value>) -> bool {
        use std::sync::atomic::Ordering;
        if !self.alive.load(Ordering::Relaxed) {
            return false;
        }
        self.tx.send(update.clone()).is_ok()
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<Path, Versioned<Value>>,
    subscribers: HashMap<Path, Vec<Subscriber>>,
}

impl Inner {
    /// Writes a new version at `path` and pushes it to live subscribers.
    /// Dead subscribers (cancelled or receiver dropped) are pruned on the
    /// way through.
    fn commit(&mut self, path: &Path, value: Value) -> Versioned<Value> {
        let next_version =
            self.entries.get(path).map(|v| v.version + 1).unwrap_or(1);
        let entry = Versioned::new(value, next_version);
        self.entries.insert(path.clone(), entry.clone());

        if let Some(subs) = self.subscribers.get_mut(path) {
            subs.retain(|s| s.deliver(&entry));
        }
        entry
    }
}

/// An in-memory [`VersionedStore`].
///
/// Cheap to clone — clones share the same underlying map, the way two
/// devices share one backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionedStore for MemoryStore {
    async fn get(&self, path: &Path) -> Result<Option<Versioned<Value>>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.get(path).cloned())
    }

    async fn put(&self, path: &Path, value: Value) -> Result<Versioned<Value>, StoreError> {
        let mut inner = self.inner.lock().await;
        let entry = inner.commit(path, value);
        tracing::trace!(%path, version = entry.version, "put");
        Ok(entry)
    }

    async fn compare_and_swap(
        &self,
        path: &Path,
        expected: Option<u64>,
        value: Value,
    ) -> Result<Versioned<Value>, StoreError> {
        let mut inner = self.inner.lock().await;
        let found = inner.entries.get(path).map(|v| v.version);
        if found != expected {
            tracing::debug!(%path, ?expected, ?found, "compare-and-swap lost");
            return Err(StoreError::VersionMismatch {
                path: path.clone(),
                found,
            });
        }
        let entry = inner.commit(path, value);
        tracing::trace!(%path, version = entry.version, "compare-and-swap won");
        Ok(entry)
    }

    async fn delete(&self, path: &Path) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.entries.remove(path);
        inner.subscribers.remove(path);
        Ok(())
    }

    async fn subscribe(&self, path: &Path) -> Result<Subscription, StoreError> {
        let mut inner = self.inner.lock().await;
        let (tx, rx) = mpsc::unbounded_channel();

        // Late subscribers start from the present.
        if let Some(current) = inner.entries.get(path) {
            let _ = tx.send(current.clone());
        }

        let alive = Arc::new(AtomicBool::new(true));
        inner
            .subscribers
            .entry(path.clone())
            .or_default()
            .push(Subscriber {
                tx,
                alive: Arc::clone(&alive),
            });

        Ok(Subscription {
            handle: SubscriptionHandle::new(alive),
            rx,
        })
    }
}

// =========================================================================
// Tests
// =========================================================================
