//! The store-facing side of one running game.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use wildstack_cards::PendingChain;
use wildstack_game::{HandRecord, TableState, TurnVector};
use wildstack_store::{
    transaction, Path, StoreError, Subscription, TransactionConfig, Versioned,
    VersionedStore,
};

use crate::SyncError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Retry bounds for the retryable transactions (chain resets and other
/// re-applicable writes). One-shot CAS writes never retry — their version
/// mismatch is a semantic conflict, not contention.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl SyncConfig {
    fn txn(&self) -> TransactionConfig {
        TransactionConfig {
            max_attempts: self.max_attempts,
            base_backoff: self.base_backoff,
            max_backoff: self.max_backoff,
        }
    }
}

// ---------------------------------------------------------------------------
// Status / predictions
// ---------------------------------------------------------------------------

/// How current the local view is, for the UI's connection indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Subscriptions flowing, writes landing.
    Live,
    /// A write hit an unreachable store; holding the prediction and
    /// retrying.
    Reconnecting,
    /// The subscription feed is gone; the local view may be behind.
    Stale,
}

/// Which local mutation a store write is confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prediction {
    /// A card left the local hand and became the discard top.
    PlayedCard { index: usize },
    /// A pending wild's color was bound.
    ChoseColor,
    /// The turn vector moved without a play (draw, timeout).
    AdvancedTurn,
    /// The local hand changed (draws, penalties).
    WroteHand,
}

/// The versions a confirmed play landed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmedPlay {
    pub table_version: u64,
    pub turn_version: u64,
}

// ---------------------------------------------------------------------------
// TableSync
// ---------------------------------------------------------------------------

/// Reconciles one game's shared documents with the local model.
///
/// Caches the last versions it has seen of `game/{id}/table` and
/// `game/{id}/turns`. Writes are CAS-conditioned on those versions, so a
/// write can only land on exactly the state the local prediction was
/// computed from. Snapshots at or below a cached version — including the
/// echo of this client's own confirmed write — are dropped as stale.
#[derive(Debug)]
pub struct TableSync<S> {
    store: Arc<S>,
    game_id: String,
    config: SyncConfig,
    table_version: u64,
    turn_version: u64,
    status_tx: watch::Sender<SyncStatus>,
}

impl<S: VersionedStore> TableSync<S> {
    pub fn new(store: Arc<S>, game_id: impl Into<String>, config: SyncConfig) -> Self {
        let (status_tx, _) = watch::channel(SyncStatus::Live);
        Self {
            store,
            game_id: game_id.into(),
            config,
            table_version: 0,
            turn_version: 0,
            status_tx,
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn table_version(&self) -> u64 {
        self.table_version
    }

    pub fn turn_version(&self) -> u64 {
        self.turn_version
    }

    /// A fresh watch on the connection indicator.
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Declares the subscription feed lost. The engine calls this when a
    /// subscription channel closes under it.
    pub fn mark_stale(&self) {
        tracing::warn!(game = %self.game_id, "subscription lost, marking stale");
        self.status_tx.send_replace(SyncStatus::Stale);
    }

    // -- Subscriptions -----------------------------------------------------

    pub async fn subscribe_table(&self) -> Result<Subscription, SyncError> {
        Ok(self.store.subscribe(&self.table_path()).await?)
    }

    pub async fn subscribe_turns(&self) -> Result<Subscription, SyncError> {
        Ok(self.store.subscribe(&self.turns_path()).await?)
    }

    pub async fn subscribe_hand(&self, player: &str) -> Result<Subscription, SyncError> {
        Ok(self.store.subscribe(&self.hand_path(player)).await?)
    }

    // -- Freshness ---------------------------------------------------------

    /// The freshness probe run before any turn-advancing write.
    ///
    /// A client may only act on a turn it believes it holds when its
    /// cached versions are at least the store's current ones — a client
    /// that fell behind its subscriptions must not race the true active
    /// client, even though the CAS would stop it anyway.
    pub async fn synced_for_turn(&self) -> Result<bool, SyncError> {
        let table = self.store.get(&self.table_path()).await?;
        let turns = self.store.get(&self.turns_path()).await?;
        let fresh = table.is_some_and(|v| self.table_version >= v.version)
            && turns.is_some_and(|v| self.turn_version >= v.version);
        if !fresh {
            tracing::debug!(
                game = %self.game_id,
                cached_table = self.table_version,
                cached_turns = self.turn_version,
                "not fresh for turn"
            );
        }
        Ok(fresh)
    }

    // -- Writes ------------------------------------------------------------

    /// Lands a committed play: the predicted table, then the advanced
    /// turn vector, each CAS-conditioned on the version the prediction
    /// was computed from.
    ///
    /// A table conflict means another client's play landed first; the
    /// caller rolls the prediction back and waits for the winner's
    /// snapshot. A turns conflict after the table landed leaves the play
    /// on the table — the turn hand-off reconciles from the next
    /// snapshot.
    pub async fn commit_play(
        &mut self,
        prediction: Prediction,
        table: &TableState,
        turns: &TurnVector,
    ) -> Result<ConfirmedPlay, SyncError> {
        tracing::debug!(game = %self.game_id, ?prediction, "committing play");
        let table_version = self
            .cas(&self.table_path(), self.table_version, table)
            .await?;
        self.table_version = table_version;
        let turn_version = self
            .cas(&self.turns_path(), self.turn_version, turns)
            .await?;
        self.turn_version = turn_version;
        self.status_tx.send_replace(SyncStatus::Live);
        Ok(ConfirmedPlay {
            table_version,
            turn_version,
        })
    }

    /// Lands a turn hand-off that involved no table change (a voluntary
    /// draw that found nothing playable).
    pub async fn advance_turn(&mut self, turns: &TurnVector) -> Result<u64, SyncError> {
        let turn_version = self
            .cas(&self.turns_path(), self.turn_version, turns)
            .await?;
        self.turn_version = turn_version;
        self.status_tx.send_replace(SyncStatus::Live);
        Ok(turn_version)
    }

    /// Clears the pending chain after a forced draw. Retryable: resetting
    /// the chain commutes with unrelated table changes, so contention is
    /// re-applied rather than surfaced.
    pub async fn reset_chain(&mut self) -> Result<u64, SyncError> {
        let path = self.table_path();
        let updated =
            transaction(self.store.as_ref(), &path, &self.config.txn(), |cur| {
                let Some(value) = cur else {
                    return Err(SyncError::Store(StoreError::NotFound(path.clone())));
                };
                let mut table: TableState =
                    serde_json::from_value(value.clone()).map_err(StoreError::from)?;
                if table.chain.is_none() {
                    return Ok(None);
                }
                table.chain = PendingChain::None;
                Ok(Some(serde_json::to_value(&table).map_err(StoreError::from)?))
            })
            .await?;
        self.table_version = self.table_version.max(updated.version);
        self.status_tx.send_replace(SyncStatus::Live);
        Ok(updated.version)
    }

    /// Publishes the local hand. Owner-authoritative: hands are written
    /// only by their owner's client, so this is an unconditional put.
    pub async fn write_hand(
        &mut self,
        player: &str,
        hand: &HandRecord,
    ) -> Result<u64, SyncError> {
        let value = serde_json::to_value(hand).map_err(StoreError::from)?;
        let written = match self.store.put(&self.hand_path(player), value).await {
            Ok(written) => written,
            Err(e) => return Err(self.write_failed(e)),
        };
        self.status_tx.send_replace(SyncStatus::Live);
        Ok(written.version)
    }

    /// Publishes a hand that grew by a penalty or forced draw.
    pub async fn accrue_penalty(
        &mut self,
        player: &str,
        hand: &HandRecord,
        drawn: usize,
        reason: &str,
    ) -> Result<u64, SyncError> {
        tracing::info!(game = %self.game_id, player, drawn, reason, "penalty accrued");
        self.write_hand(player, hand).await
    }

    // -- Ingest ------------------------------------------------------------

    /// Folds in a raw table snapshot from the subscription. Stale
    /// versions (own echoes included) come back as `None`.
    pub fn ingest_table(
        &mut self,
        raw: Versioned<Value>,
    ) -> Result<Option<Versioned<TableState>>, SyncError> {
        if raw.version <= self.table_version {
            tracing::trace!(
                game = %self.game_id,
                version = raw.version,
                cached = self.table_version,
                "stale table snapshot dropped"
            );
            return Ok(None);
        }
        let decoded = raw.decode::<TableState>()?;
        self.table_version = decoded.version;
        self.status_tx.send_replace(SyncStatus::Live);
        Ok(Some(decoded))
    }

    /// Folds in a raw turn-vector snapshot from the subscription.
    pub fn ingest_turns(
        &mut self,
        raw: Versioned<Value>,
    ) -> Result<Option<Versioned<TurnVector>>, SyncError> {
        if raw.version <= self.turn_version {
            return Ok(None);
        }
        let decoded = raw.decode::<TurnVector>()?;
        self.turn_version = decoded.version;
        self.status_tx.send_replace(SyncStatus::Live);
        Ok(Some(decoded))
    }

    // -- Internals ---------------------------------------------------------

    fn table_path(&self) -> Path {
        Path::table(&self.game_id)
    }

    fn turns_path(&self) -> Path {
        Path::turns(&self.game_id)
    }

    fn hand_path(&self, player: &str) -> Path {
        Path::hand(&self.game_id, player)
    }

    async fn cas<T: Serialize>(
        &self,
        path: &Path,
        expected: u64,
        value: &T,
    ) -> Result<u64, SyncError> {
        let value = serde_json::to_value(value).map_err(StoreError::from)?;
        match self.store.compare_and_swap(path, Some(expected), value).await {
            Ok(written) => Ok(written.version),
            Err(e) => Err(self.write_failed(e)),
        }
    }

    fn write_failed(&self, e: StoreError) -> SyncError {
        match e {
            StoreError::VersionMismatch { path, found } => {
                tracing::debug!(game = %self.game_id, %path, ?found, "write lost a race");
                SyncError::Conflict { attempts: 1 }
            }
            StoreError::Unavailable(msg) => {
                self.status_tx.send_replace(SyncStatus::Reconnecting);
                SyncError::Unavailable(msg)
            }
            other => other.into(),
        }
    }
}
