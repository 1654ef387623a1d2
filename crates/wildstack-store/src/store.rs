//! The `VersionedStore` trait and its supporting types.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{Path, StoreError};

// ---------------------------------------------------------------------------
// Versioned
// ---------------------------------------------------------------------------

/// A value read from the store together with the path's write counter.
///
/// The counter is bumped on every successful write to the path, never
/// reused, and is the token a compare-and-swap is conditioned on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

impl<T> Versioned<T> {
    pub fn new(value: T, version: u64) -> Self {
        Self { value, version }
    }
}

impl Versioned<Value> {
    /// Decodes the raw stored value into a typed shape, keeping the
    /// version.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Versioned<T>, StoreError> {
        Ok(Versioned {
            value: serde_json::from_value(self.value)?,
            version: self.version,
        })
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Cancellation handle for a subscription.
///
/// Cancelling (or dropping) the handle detaches delivery. It does NOT
/// cancel in-flight writes — a write that already reached the store still
/// lands, and is reconciled through a fresh subscription later.
#[derive(Debug)]
pub struct SubscriptionHandle {
    alive: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    pub(crate) fn new(alive: Arc<AtomicBool>) -> Self {
        Self { alive }
    }

    /// Stops delivery. Idempotent.
    pub fn cancel(&self) {
        self.alive.store(false, Ordering::Relaxed);
    }

    /// Whether the subscription is still delivering.
    pub fn is_active(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A change subscription on one path.
///
/// Delivery is at-least-once and may be coalesced; each notification
/// carries the full current value, not a delta. The current value (if any)
/// is delivered immediately on subscribe, so a late subscriber starts from
/// the present instead of waiting for the next write.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub rx: mpsc::UnboundedReceiver<Versioned<Value>>,
}

// ---------------------------------------------------------------------------
// VersionedStore
// ---------------------------------------------------------------------------

/// The shared-store collaborator.
///
/// Implementations must guarantee, per path:
///
/// - writes are totally ordered and each bumps the version by exactly one;
/// - `compare_and_swap` applies the write iff the path's version still
///   equals `expected` (`None` = "create only if absent"), otherwise fails
///   with [`StoreError::VersionMismatch`] and no effect;
/// - subscribers observe every version they don't sleep through — missed
///   intermediate values may coalesce, but the latest write is always
///   delivered.
///
/// The CAS is the sole cross-client safety mechanism: the protocol stays
/// correct even when a buggy client violates the "only the active seat
/// writes" convention, because exactly one of two racing writers can hold
/// the expected version.
pub trait VersionedStore: Send + Sync + 'static {
    /// Reads the value at `path`, `None` if absent.
    fn get(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Option<Versioned<Value>>, StoreError>> + Send;

    /// Unconditionally writes `value` at `path`. Returns the new version.
    fn put(
        &self,
        path: &Path,
        value: Value,
    ) -> impl Future<Output = Result<Versioned<Value>, StoreError>> + Send;

    /// Writes `value` at `path` iff the path's version is still
    /// `expected`.
    fn compare_and_swap(
        &self,
        path: &Path,
        expected: Option<u64>,
        value: Value,
    ) -> impl Future<Output = Result<Versioned<Value>, StoreError>> + Send;

    /// Deletes the value at `path`. A no-op if absent.
    fn delete(&self, path: &Path)
        -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Subscribes to changes at `path`.
    fn subscribe(
        &self,
        path: &Path,
    ) -> impl Future<Output = Result<Subscription, StoreError>> + Send;
}
