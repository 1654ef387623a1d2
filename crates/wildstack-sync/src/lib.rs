//! Optimistic state reconciliation for Wildstack.
//!
//! Every client applies its own moves locally first (the *prediction*)
//! and then tries to land them in the store with compare-and-swap writes
//! conditioned on the versions it last saw. A write that lands confirms
//! the prediction; a version mismatch means another client got there
//! first, the prediction is rolled back, and the winner's snapshot
//! arrives through the subscription.
//!
//! # Key types
//!
//! - [`TableSync`] — the store-facing side of one game
//! - [`SyncStatus`] — `Live`/`Reconnecting`/`Stale`, as a watch channel
//! - [`Prediction`] — which local mutation a write is confirming
//! - [`SyncConfig`] — retry bounds for the retryable transactions

mod error;
mod sync;

pub use error::SyncError;
pub use sync::{ConfirmedPlay, Prediction, SyncConfig, SyncStatus, TableSync};
