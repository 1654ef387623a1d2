//! The shared-store seam for Wildstack.
//!
//! Every piece of shared truth — the lobby document, the discard top, the
//! turn vector, each player's hand — lives at a [`Path`] in a versioned
//! key-value store. This crate defines the seam the rest of the workspace
//! consumes:
//!
//! - [`VersionedStore`] — the trait a backing store implements: point
//!   reads, point writes, compare-and-swap keyed by per-path write
//!   counters, and change subscriptions
//! - [`transaction`] — the bounded read-modify-write retry loop every
//!   shared mutation goes through
//! - [`MemoryStore`] — an in-process implementation with the full
//!   semantics, used by tests and the demo
//!
//! # Versions
//!
//! Each path carries a monotonic write counter, bumped on every successful
//! write. The counters of the table and turn paths are exactly the game's
//! `table_version` and `turn_version`: optimistic-concurrency gates, not
//! wall-clock order.

#![allow(async_fn_in_trait)]

mod error;
mod memory;
mod path;
mod store;
mod transaction;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use path::Path;
pub use store::{Subscription, SubscriptionHandle, Versioned, VersionedStore};
pub use transaction::{transaction, TransactionConfig};
