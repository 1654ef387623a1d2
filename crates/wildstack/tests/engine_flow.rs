//! End-to-end engine tests: two clients sharing one in-memory store.
//!
//! Each test spawns a real engine per player, drives one of them through
//! its handle, and asserts what the other one's snapshot converges to.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::Value;
use wildstack::prelude::*;
use wildstack::{GameSnapshot, SessionContext};
use wildstack_game::{HandRecord, TableState, TurnVector};
use wildstack_store::{Path, Subscription, Versioned};

const GAME: &str = "game-0042";

fn ana() -> PlayerId {
    PlayerId::new("ana")
}

fn ben() -> PlayerId {
    PlayerId::new("ben")
}

/// Writes a hand-picked two-player game straight into the store,
/// bypassing the lobby's random deal so plays are deterministic.
async fn seed_game<S: VersionedStore>(
    store: &S,
    ana_hand: &[Card],
    ben_hand: &[Card],
    discard_top: Card,
) -> GameStart {
    let table = TableState::opening(discard_top);
    store
        .put(&Path::table(GAME), serde_json::to_value(&table).unwrap())
        .await
        .unwrap();
    store
        .put(
            &Path::turns(GAME),
            serde_json::to_value(&TurnVector::new(2, 0)).unwrap(),
        )
        .await
        .unwrap();
    for (pid, hand) in [(ana(), ana_hand), (ben(), ben_hand)] {
        let record = HandRecord::new(hand.to_vec());
        store
            .put(
                &Path::hand(GAME, pid.as_str()),
                serde_json::to_value(&record).unwrap(),
            )
            .await
            .unwrap();
    }
    GameStart {
        game_id: GAME.to_string(),
        seat_order: vec![ana(), ben()],
        config: GameConfig::default(),
    }
}

async fn spawn_pair(
    store: &Arc<MemoryStore>,
    start: &GameStart,
) -> (EngineHandle, EngineHandle) {
    let ana_session = SessionContext::new(ana(), "Ana", Arc::clone(store));
    let ben_session = SessionContext::new(ben(), "Ben", Arc::clone(store));
    let ana_engine = GameEngine::spawn(ana_session, start.clone()).await.unwrap();
    let ben_engine = GameEngine::spawn(ben_session, start.clone()).await.unwrap();
    (ana_engine, ben_engine)
}

/// Polls snapshots until `pred` holds. Paused-clock tests auto-advance
/// through the sleeps, so this stays fast and deterministic.
async fn wait_for(
    handle: &EngineHandle,
    pred: impl Fn(&GameSnapshot) -> bool,
) -> GameSnapshot {
    for _ in 0..200 {
        let snap = handle.snapshot().await.unwrap();
        if pred(&snap) {
            return snap;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("snapshot never reached the expected shape");
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_lobby_start_boots_two_live_engines() {
    let store = Arc::new(MemoryStore::new());
    let ana_session = SessionContext::new(ana(), "Ana", Arc::clone(&store));
    let ben_session = SessionContext::new(ben(), "Ben", Arc::clone(&store));

    let lobby = ana_session.lobby();
    let room = lobby.create_room(ana(), "Ana", 4).await.unwrap();
    ben_session
        .lobby()
        .join_room(room.code, ben(), "Ben")
        .await
        .unwrap();
    let (_, start) = lobby.start_game(room.code, &ana()).await.unwrap();

    let ana_engine = GameEngine::spawn(ana_session, start.clone()).await.unwrap();
    let ben_engine = GameEngine::spawn(ben_session, start).await.unwrap();

    let a = ana_engine.snapshot().await.unwrap();
    let b = ben_engine.snapshot().await.unwrap();
    assert_eq!(a.seats, vec!["ana".to_string(), "ben".to_string()]);
    assert_eq!(a.hand.len(), 7);
    assert_eq!(b.hand.len(), 7);
    assert_eq!(a.hand_counts, vec![7, 7]);
    assert_eq!(a.active_seat, 0);
    assert_eq!(b.active_seat, 0);
    assert!(a.is_local_turn());
    assert!(!b.is_local_turn());
    assert!(!a.finished);
}

#[tokio::test(start_paused = true)]
async fn test_spawn_rejects_a_player_without_a_seat() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5)],
        &[Card::number(Color::Blue, 5)],
        Card::number(Color::Red, 9),
    )
    .await;
    let outsider = SessionContext::new(PlayerId::new("zoe"), "Zoe", store);
    let err = GameEngine::spawn(outsider, start).await.unwrap_err();
    assert!(matches!(err, WildstackError::NotSeated(_)));
}

// ---------------------------------------------------------------------------
// Playing
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_played_card_reaches_the_opponent_view() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5), Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2), Card::number(Color::Green, 7)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    let outcome = ana_engine.commit_play(0).await.unwrap();
    assert_eq!(outcome, PlayOutcome::Advanced);

    let seen = wait_for(&ben_engine, |s| {
        s.active_seat == 1 && s.hand_counts[0] == 1
    })
    .await;
    assert_eq!(seen.discard_top, Card::number(Color::Red, 5));
    assert!(seen.is_local_turn());
}

#[tokio::test(start_paused = true)]
async fn test_preview_commits_on_the_second_tap() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5), Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, _ben_engine) = spawn_pair(&store, &start).await;

    let phase = ana_engine.select_card(0).await.unwrap();
    assert_eq!(phase, PlayPhase::Previewed { index: 0 });
    let snap = ana_engine.snapshot().await.unwrap();
    assert_eq!(snap.phase, PlayPhase::Previewed { index: 0 });

    let phase = ana_engine.select_card(0).await.unwrap();
    assert_eq!(phase, PlayPhase::Committing);
    let outcome = ana_engine.commit_play(0).await.unwrap();
    assert_eq!(outcome, PlayOutcome::Advanced);
}

#[tokio::test(start_paused = true)]
async fn test_unplayable_preview_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    let err = ana_engine.select_card(0).await.unwrap_err();
    assert!(matches!(err, WildstackError::Game(GameError::NotPlayable)));

    let err = ben_engine.commit_play(0).await.unwrap_err();
    assert!(matches!(err, WildstackError::Game(GameError::NotYourTurn)));
}

#[tokio::test(start_paused = true)]
async fn test_color_choice_lands_on_the_table() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::wild(Special::ChangeColor), Card::number(Color::Red, 1)],
        &[Card::number(Color::Green, 2), Card::number(Color::Blue, 8)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    let outcome = ana_engine.commit_play(0).await.unwrap();
    assert!(matches!(outcome, PlayOutcome::AwaitColor { .. }));
    let snap = ana_engine.snapshot().await.unwrap();
    assert_eq!(snap.phase, PlayPhase::AwaitingColorChoice);
    // The turn does not move until the color is bound.
    assert_eq!(snap.active_seat, 0);

    let err = ana_engine.resolve_color_choice(Color::Wild).await.unwrap_err();
    assert!(matches!(
        err,
        WildstackError::Game(GameError::InvalidColor(Color::Wild))
    ));

    ana_engine.resolve_color_choice(Color::Blue).await.unwrap();
    let seen = wait_for(&ben_engine, |s| s.active_seat == 1).await;
    assert_eq!(seen.discard_top.color, Color::Blue);
    assert_eq!(seen.discard_top.special(), Some(Special::ChangeColor));
}

#[tokio::test(start_paused = true)]
async fn test_winning_play_finishes_both_views() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5)],
        &[Card::number(Color::Green, 2), Card::number(Color::Blue, 8)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    let outcome = ana_engine.commit_play(0).await.unwrap();
    assert_eq!(outcome, PlayOutcome::Finished { winner_seat: 0 });
    let snap = ana_engine.snapshot().await.unwrap();
    assert!(snap.finished);
    assert_eq!(snap.winner, Some(0));
    assert_eq!(snap.phase, PlayPhase::Finished);

    let seen = wait_for(&ben_engine, |s| s.finished).await;
    assert_eq!(seen.winner, Some(0));
    assert_eq!(seen.phase, PlayPhase::Finished);

    // No further play is accepted anywhere.
    let err = ana_engine.commit_play(0).await.unwrap_err();
    assert!(matches!(err, WildstackError::Game(GameError::Finished)));
}

// ---------------------------------------------------------------------------
// Drawing and chains
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_voluntary_draw_hands_the_turn_over_or_keeps_it() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    let before = ana_engine.snapshot().await.unwrap().hand.len();
    let outcome = ana_engine.draw_for_turn().await.unwrap();
    let snap = ana_engine.snapshot().await.unwrap();
    match outcome {
        DrawOutcome::MayPlay { drawn } => {
            assert!(drawn >= 1);
            assert_eq!(snap.hand.len(), before + drawn);
            assert!(snap.is_local_turn());
        }
        DrawOutcome::TurnOver { drawn } => {
            assert_eq!(drawn, GameConfig::default().max_draw_cards as usize);
            assert_eq!(snap.hand.len(), before + drawn);
            assert!(!snap.is_local_turn());
            wait_for(&ben_engine, |s| s.is_local_turn()).await;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_chain_without_extender_is_drawn_automatically() {
    let store = Arc::new(MemoryStore::new());
    // Ben opens under a two-card penalty he cannot extend.
    let start = seed_game(
        store.as_ref(),
        &[
            Card::colored_special(Special::DrawTwo, Color::Red),
            Card::number(Color::Blue, 3),
        ],
        &[Card::number(Color::Green, 2), Card::number(Color::Green, 7)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    ana_engine.commit_play(0).await.unwrap();

    // Ben's engine resolves the forced draw on its own and hands the
    // turn straight back.
    let seen = wait_for(&ana_engine, |s| {
        s.is_local_turn() && s.hand_counts[1] == 4
    })
    .await;
    assert_eq!(seen.chain, PendingChain::None);
    let ben_snap = ben_engine.snapshot().await.unwrap();
    assert_eq!(ben_snap.hand.len(), 4);
    assert!(!ben_snap.is_local_turn());
}

// ---------------------------------------------------------------------------
// Write races
// ---------------------------------------------------------------------------

/// Store that lets one rival turn write slip in just before the first
/// compare-and-swap on the turns document, so a client's table write
/// lands but its turn hand-off loses.
struct TurnRaceStore {
    inner: MemoryStore,
    raced: AtomicBool,
}

impl TurnRaceStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            raced: AtomicBool::new(false),
        }
    }
}

impl VersionedStore for TurnRaceStore {
    async fn get(&self, path: &Path) -> Result<Option<Versioned<Value>>, StoreError> {
        self.inner.get(path).await
    }

    async fn put(&self, path: &Path, value: Value) -> Result<Versioned<Value>, StoreError> {
        self.inner.put(path, value).await
    }

    async fn compare_and_swap(
        &self,
        path: &Path,
        expected: Option<u64>,
        value: Value,
    ) -> Result<Versioned<Value>, StoreError> {
        if *path == Path::turns(GAME) && !self.raced.swap(true, Ordering::SeqCst) {
            let rival = serde_json::to_value(TurnVector::new(2, 1))
                .map_err(StoreError::from)?;
            self.inner.put(path, rival).await?;
        }
        self.inner.compare_and_swap(path, expected, value).await
    }

    async fn delete(&self, path: &Path) -> Result<(), StoreError> {
        self.inner.delete(path).await
    }

    async fn subscribe(&self, path: &Path) -> Result<Subscription, StoreError> {
        self.inner.subscribe(path).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_play_stands_when_only_the_turn_handoff_races() {
    let store = Arc::new(TurnRaceStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5), Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2), Card::number(Color::Green, 7)],
        Card::number(Color::Red, 9),
    )
    .await;
    let session = SessionContext::new(ana(), "Ana", Arc::clone(&store));
    let engine = GameEngine::spawn(session, start).await.unwrap();

    // The table write lands, the rival's hand-off beats ours: the play
    // still stands and the local card is not resurrected.
    let outcome = engine.commit_play(0).await.unwrap();
    assert_eq!(outcome, PlayOutcome::Advanced);

    let snap = wait_for(&engine, |s| s.active_seat == 1).await;
    assert_eq!(snap.hand, vec![Card::number(Color::Blue, 3)]);
    assert_eq!(snap.discard_top, Card::number(Color::Red, 5));

    let table = store
        .get(&Path::table(GAME))
        .await
        .unwrap()
        .unwrap()
        .decode::<TableState>()
        .unwrap()
        .value;
    assert_eq!(table.discard_top, Card::number(Color::Red, 5));
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_turn_timeout_draws_and_advances() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (_ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    // Let the full turn elapse without any input from the active seat.
    tokio::time::sleep(Duration::from_secs(11)).await;

    let max_draw = GameConfig::default().max_draw_cards as usize;
    let seen = wait_for(&ben_engine, |s| s.is_local_turn()).await;
    assert_eq!(seen.hand_counts[0], 1 + max_draw);
}

// ---------------------------------------------------------------------------
// UNO window
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_missed_uno_call_costs_two_cards() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5), Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2), Card::number(Color::Green, 7)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, ben_engine) = spawn_pair(&store, &start).await;

    ana_engine.commit_play(0).await.unwrap();
    let snap = ana_engine.snapshot().await.unwrap();
    assert!(snap.uno_window_open);

    // Stay silent past the grace window.
    tokio::time::sleep(Duration::from_secs(3)).await;

    let snap = wait_for(&ana_engine, |s| s.hand.len() == 3).await;
    assert!(!snap.uno_window_open);
    wait_for(&ben_engine, |s| s.hand_counts[0] == 3).await;
}

#[tokio::test(start_paused = true)]
async fn test_uno_called_in_time_avoids_the_penalty() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5), Card::number(Color::Blue, 3)],
        &[Card::number(Color::Green, 2), Card::number(Color::Green, 7)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, _ben_engine) = spawn_pair(&store, &start).await;

    ana_engine.commit_play(0).await.unwrap();
    ana_engine.call_uno().await.unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    let snap = ana_engine.snapshot().await.unwrap();
    assert_eq!(snap.hand.len(), 1);
    assert!(!snap.uno_window_open);

    // Calling again with no window open is a quiet no-op.
    ana_engine.call_uno().await.unwrap();
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_the_handle() {
    let store = Arc::new(MemoryStore::new());
    let start = seed_game(
        store.as_ref(),
        &[Card::number(Color::Red, 5)],
        &[Card::number(Color::Green, 2)],
        Card::number(Color::Red, 9),
    )
    .await;
    let (ana_engine, _ben_engine) = spawn_pair(&store, &start).await;

    ana_engine.shutdown().await.unwrap();
    // The actor drains and exits; later requests see a closed channel.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let err = ana_engine.snapshot().await.unwrap_err();
    assert!(matches!(err, WildstackError::EngineClosed));
}
