//! Two clients reconciling one game over a shared in-memory store.

use std::sync::Arc;

use wildstack_cards::{Card, Color, PendingChain, Special};
use wildstack_game::{Direction, HandRecord, TableState, TurnVector};
use wildstack_store::{MemoryStore, Path, VersionedStore};
use wildstack_sync::{Prediction, SyncConfig, SyncError, SyncStatus, TableSync};

const GAME: &str = "4711";

async fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let table = TableState::opening(Card::number(Color::Red, 5));
    let turns = TurnVector::new(2, 0);
    store
        .put(&Path::table(GAME), serde_json::to_value(&table).unwrap())
        .await
        .unwrap();
    store
        .put(&Path::turns(GAME), serde_json::to_value(&turns).unwrap())
        .await
        .unwrap();
    store
}

/// A sync that has caught up with the store's current state.
async fn fresh_sync(store: &Arc<MemoryStore>) -> TableSync<MemoryStore> {
    let mut sync = TableSync::new(Arc::clone(store), GAME, SyncConfig::default());
    let table = store.get(&Path::table(GAME)).await.unwrap().unwrap();
    let turns = store.get(&Path::turns(GAME)).await.unwrap().unwrap();
    sync.ingest_table(table).unwrap();
    sync.ingest_turns(turns).unwrap();
    sync
}

fn played(card: Card) -> (TableState, TurnVector) {
    let mut table = TableState::opening(Card::number(Color::Red, 5));
    table.discard_top = card;
    (table, TurnVector::new(2, 1))
}

#[tokio::test(start_paused = true)]
async fn test_exactly_one_of_two_racing_commits_wins() {
    let store = seeded_store().await;
    let mut a = fresh_sync(&store).await;
    let mut b = fresh_sync(&store).await;

    // Both believe themselves current and active.
    assert!(a.synced_for_turn().await.unwrap());
    assert!(b.synced_for_turn().await.unwrap());

    let (table_a, turns_a) = played(Card::number(Color::Red, 9));
    let confirmed = a
        .commit_play(Prediction::PlayedCard { index: 0 }, &table_a, &turns_a)
        .await
        .unwrap();
    assert_eq!(confirmed.table_version, a.table_version());

    let (table_b, turns_b) = played(Card::number(Color::Red, 3));
    let err = b
        .commit_play(Prediction::PlayedCard { index: 1 }, &table_b, &turns_b)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Conflict { .. }));

    // The store holds the winner's card, untouched by the loser.
    let table = store
        .get(&Path::table(GAME))
        .await
        .unwrap()
        .unwrap()
        .decode::<TableState>()
        .unwrap()
        .value;
    assert_eq!(table.discard_top, Card::number(Color::Red, 9));
}

#[tokio::test(start_paused = true)]
async fn test_own_echo_is_dropped_as_stale() {
    let store = seeded_store().await;
    let mut a = fresh_sync(&store).await;

    let (table, turns) = played(Card::number(Color::Red, 9));
    a.commit_play(Prediction::PlayedCard { index: 0 }, &table, &turns)
        .await
        .unwrap();

    // The subscription replays our own write; it must not re-apply.
    let echo = store.get(&Path::table(GAME)).await.unwrap().unwrap();
    assert_eq!(echo.version, a.table_version());
    assert!(a.ingest_table(echo).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_loser_catches_up_from_winner_snapshot() {
    let store = seeded_store().await;
    let mut a = fresh_sync(&store).await;
    let mut b = fresh_sync(&store).await;

    let (table, turns) = played(Card::number(Color::Red, 9));
    a.commit_play(Prediction::PlayedCard { index: 0 }, &table, &turns)
        .await
        .unwrap();

    assert!(!b.synced_for_turn().await.unwrap(), "b fell behind");

    let snapshot = store.get(&Path::table(GAME)).await.unwrap().unwrap();
    let applied = b.ingest_table(snapshot).unwrap().expect("newer snapshot applies");
    assert_eq!(applied.value.discard_top, Card::number(Color::Red, 9));
    let snapshot = store.get(&Path::turns(GAME)).await.unwrap().unwrap();
    b.ingest_turns(snapshot).unwrap().expect("newer snapshot applies");

    assert!(b.synced_for_turn().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_reset_chain_is_a_no_op_without_a_chain() {
    let store = seeded_store().await;
    let mut a = fresh_sync(&store).await;
    let before = a.table_version();
    let version = a.reset_chain().await.unwrap();
    assert_eq!(version, before, "no chain, no write");
}

#[tokio::test(start_paused = true)]
async fn test_reset_chain_clears_a_pending_chain() {
    let store = seeded_store().await;
    let mut a = fresh_sync(&store).await;

    let mut table = TableState::opening(Card::number(Color::Red, 5));
    table.discard_top = Card::colored_special(Special::DrawTwo, Color::Red);
    table.chain = PendingChain::DrawTwo { count: 2 };
    a.commit_play(
        Prediction::PlayedCard { index: 0 },
        &table,
        &TurnVector::new(2, 1),
    )
    .await
    .unwrap();

    a.reset_chain().await.unwrap();
    let table = store
        .get(&Path::table(GAME))
        .await
        .unwrap()
        .unwrap()
        .decode::<TableState>()
        .unwrap()
        .value;
    assert!(table.chain.is_none());
    assert_eq!(table.direction, Direction::Clockwise, "only the chain changed");
}

#[tokio::test(start_paused = true)]
async fn test_write_hand_is_unconditional() {
    let store = seeded_store().await;
    let mut a = fresh_sync(&store).await;

    let hand = HandRecord::new(vec![Card::number(Color::Blue, 1)]);
    let v1 = a.write_hand("alice", &hand).await.unwrap();
    let v2 = a
        .accrue_penalty("alice", &hand, 2, "uno_missed")
        .await
        .unwrap();
    assert!(v2 > v1);

    let stored = store
        .get(&Path::hand(GAME, "alice"))
        .await
        .unwrap()
        .unwrap()
        .decode::<HandRecord>()
        .unwrap()
        .value;
    assert_eq!(stored, hand);
}

#[tokio::test(start_paused = true)]
async fn test_status_starts_live_and_marks_stale() {
    let store = seeded_store().await;
    let a = fresh_sync(&store).await;
    let status = a.status();
    assert_eq!(*status.borrow(), SyncStatus::Live);
    a.mark_stale();
    assert_eq!(*status.borrow(), SyncStatus::Stale);
}
