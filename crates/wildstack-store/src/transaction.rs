//! The conditional-transaction retry loop.
//!
//! Every mutation of shared truth goes through [`transaction`]: read the
//! current value, apply a pure transition, compare-and-swap the result
//! back. Two clients transitioning concurrently serialize correctly — the
//! loser observes a version mismatch, re-reads, and re-applies its
//! transition against the winner's state.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use crate::{Path, StoreError, Versioned, VersionedStore};

/// Bounds for the transaction retry loop.
#[derive(Debug, Clone)]
pub struct TransactionConfig {
    /// How many times to re-run the read-apply-swap cycle before giving
    /// up with [`StoreError::Contended`].
    pub max_attempts: u32,
    /// Backoff before the first retry; doubled per attempt.
    pub base_backoff: Duration,
    /// Backoff ceiling.
    pub max_backoff: Duration,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(25),
            max_backoff: Duration::from_millis(400),
        }
    }
}

impl TransactionConfig {
    /// Exponential backoff with jitter for the given zero-based attempt.
    /// Jitter desynchronizes clients that lost the same race.
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_backoff);
        let jitter_us = rand::rng().random_range(0..=exp.as_micros().max(1) as u64 / 2);
        exp + Duration::from_micros(jitter_us)
    }
}

/// Runs `apply` as a conditional transaction at `path`.
///
/// `apply` receives the current value (or `None` if the path is absent)
/// and returns:
///
/// - `Ok(Some(new))` — write `new`, conditioned on the version read;
/// - `Ok(None)` — nothing to write; the current state is returned
///   unchanged (used for idempotent no-ops such as re-joining a room);
/// - `Err(e)` — abort the transaction without writing.
///
/// On a version mismatch the cycle re-runs with exponential backoff, up
/// to `config.max_attempts`, then surfaces [`StoreError::Contended`]
/// (converted into the caller's error type).
pub async fn transaction<S, F, E>(
    store: &S,
    path: &Path,
    config: &TransactionConfig,
    mut apply: F,
) -> Result<Versioned<Value>, E>
where
    S: VersionedStore,
    F: FnMut(Option<&Value>) -> Result<Option<Value>, E>,
    E: From<StoreError>,
{
    for attempt in 0..config.max_attempts {
        if attempt > 0 {
            let delay = config.backoff(attempt - 1);
            tracing::debug!(%path, attempt, ?delay, "transaction retrying");
            tokio::time::sleep(delay).await;
        }

        let current = store.get(path).await?;
        let (current_value, current_version) = match &current {
            Some(v) => (Some(&v.value), Some(v.version)),
            None => (None, None),
        };

        let next = match apply(current_value)? {
            Some(next) => next,
            None => {
                // Nothing to write. Report the state the decision was
                // based on.
                return match current {
                    Some(v) => Ok(v),
                    None => Err(StoreError::NotFound(path.clone()).into()),
                };
            }
        };

        match store.compare_and_swap(path, current_version, next).await {
            Ok(written) => return Ok(written),
            Err(StoreError::VersionMismatch { .. }) => continue,
            Err(other) => return Err(other.into()),
        }
    }

    tracing::warn!(%path, attempts = config.max_attempts, "transaction contended out");
    Err(StoreError::Contended {
        path: path.clone(),
        attempts: config.max_attempts,
    }
    .into())
}

// =========================================================================
// Tests
// =========================================================================
