//! Error types for the reconciliation layer.

use wildstack_store::StoreError;

/// Errors that can occur while reconciling with the store.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Another client's write landed first; the local prediction must be
    /// rolled back and the winner's snapshot awaited.
    #[error("write lost to a concurrent client after {attempts} attempt(s)")]
    Conflict { attempts: u32 },

    /// The store is unreachable mid-write. The prediction is held and
    /// the write retried on reconnect.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The subscription feed is gone; the local view can no longer be
    /// trusted to be current.
    #[error("subscription lost, local state is stale")]
    Stale,

    /// Any other store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            // A contended-out transaction is a lost race, not a broken
            // store.
            StoreError::Contended { attempts, .. } => SyncError::Conflict { attempts },
            StoreError::Unavailable(msg) => SyncError::Unavailable(msg),
            other => SyncError::Store(other),
        }
    }
}
