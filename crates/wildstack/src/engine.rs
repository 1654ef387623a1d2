//! Game engine actor: an isolated Tokio task that owns one running game.
//!
//! Each active game runs in its own task, communicating with the outside
//! world through an mpsc channel. This is the single logical mutation
//! queue of the client: UI commands, store snapshots, the turn timer,
//! and the UNO grace window are all serialized through one
//! `tokio::select!` loop, so every local transition is totally ordered.
//! Cross-client order is enforced by the store's compare-and-swap, never
//! by wall-clock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant as TokioInstant;
use wildstack_cards::Color;
use wildstack_game::{
    DrawOutcome, GameError, GameState, Hand, HandRecord, PlayOutcome, PlayPhase,
};
use wildstack_lobby::{GameConfig, GameStart, PlayerId};
use wildstack_store::{Path, StoreError, Subscription, Versioned, VersionedStore};
use wildstack_sync::{Prediction, SyncConfig, SyncError, SyncStatus, TableSync};
use wildstack_timer::{TimerConfig, TimerTick, TurnTimer};

use crate::{GameSnapshot, SessionContext, WildstackError};

/// How long a one-card hand may stay silent before the missed-UNO
/// penalty lands.
const UNO_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands sent to the engine actor through its channel.
///
/// Each variant carries a `oneshot::Sender` reply channel where the
/// caller awaits the outcome.
enum EngineCommand {
    SelectCard {
        index: usize,
        reply: oneshot::Sender<Result<PlayPhase, WildstackError>>,
    },
    CommitPlay {
        index: usize,
        reply: oneshot::Sender<Result<PlayOutcome, WildstackError>>,
    },
    ResolveColor {
        color: Color,
        reply: oneshot::Sender<Result<PlayOutcome, WildstackError>>,
    },
    DrawForTurn {
        reply: oneshot::Sender<Result<DrawOutcome, WildstackError>>,
    },
    CallUno {
        reply: oneshot::Sender<Result<(), WildstackError>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

/// Handle to a running game engine. Cheap to clone.
///
/// Every action method is safe to call redundantly from a jittery UI —
/// an out-of-turn or out-of-phase request comes back as an `Err`, never
/// as a panic or a stuck engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    snapshot_rx: watch::Receiver<GameSnapshot>,
    status_rx: watch::Receiver<SyncStatus>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> EngineCommand,
    ) -> Result<T, WildstackError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| WildstackError::EngineClosed)?;
        reply_rx.await.map_err(|_| WildstackError::EngineClosed)
    }

    /// First tap previews a card, second tap on the same card commits it.
    pub async fn select_card(&self, index: usize) -> Result<PlayPhase, WildstackError> {
        self.request(|reply| EngineCommand::SelectCard { index, reply })
            .await?
    }

    /// Plays the card at `index` and lands it in the store.
    pub async fn commit_play(&self, index: usize) -> Result<PlayOutcome, WildstackError> {
        self.request(|reply| EngineCommand::CommitPlay { index, reply })
            .await?
    }

    /// Binds the color of the wild awaiting resolution.
    pub async fn resolve_color_choice(
        &self,
        color: Color,
    ) -> Result<PlayOutcome, WildstackError> {
        self.request(|reply| EngineCommand::ResolveColor { color, reply })
            .await?
    }

    /// Draws instead of playing.
    pub async fn draw_for_turn(&self) -> Result<DrawOutcome, WildstackError> {
        self.request(|reply| EngineCommand::DrawForTurn { reply })
            .await?
    }

    /// Calls UNO inside the grace window. A redundant call (window
    /// closed, more than one card) is a harmless no-op.
    pub async fn call_uno(&self) -> Result<(), WildstackError> {
        self.request(|reply| EngineCommand::CallUno { reply }).await?
    }

    /// The current UI projection.
    pub async fn snapshot(&self) -> Result<GameSnapshot, WildstackError> {
        self.request(|reply| EngineCommand::Snapshot { reply }).await
    }

    /// A watch that yields a fresh [`GameSnapshot`] after every engine
    /// transition.
    pub fn watch(&self) -> watch::Receiver<GameSnapshot> {
        self.snapshot_rx.clone()
    }

    /// The connection indicator feed.
    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.status_rx.clone()
    }

    /// Stops the engine actor. Subscriptions are torn down; an in-flight
    /// write is detached, not cancelled — whatever landed reconciles
    /// through a fresh subscription next time.
    pub async fn shutdown(&self) -> Result<(), WildstackError> {
        self.tx
            .send(EngineCommand::Shutdown)
            .await
            .map_err(|_| WildstackError::EngineClosed)
    }
}

// ---------------------------------------------------------------------------
// GameEngine
// ---------------------------------------------------------------------------

/// The actor that owns one running game on this client.
pub struct GameEngine<S> {
    player_id: PlayerId,
    config: GameConfig,
    state: GameState,
    phase: PlayPhase,
    sync: TableSync<S>,
    timer: TurnTimer,
    uno_deadline: Option<TokioInstant>,
    uno_called: bool,
    snapshot_tx: watch::Sender<GameSnapshot>,
    rx: mpsc::Receiver<EngineCommand>,
    table_sub: Subscription,
    turns_sub: Subscription,
    table_live: bool,
    turns_live: bool,
    hand_rx: mpsc::UnboundedReceiver<(usize, Versioned<Value>)>,
}

impl<S: VersionedStore> GameEngine<S> {
    /// Builds the local game view from the store and spawns the actor.
    ///
    /// Reads the table, turn vector, and every hand document, subscribes
    /// to all of them, and starts with whatever turn is currently
    /// active — also on rejoin into a game already in progress.
    pub async fn spawn(
        session: SessionContext<S>,
        start: GameStart,
    ) -> Result<EngineHandle, WildstackError> {
        let config = start.config.validated();
        let local_seat = start
            .seat_order
            .iter()
            .position(|p| p == &session.player_id)
            .ok_or_else(|| WildstackError::NotSeated(session.player_id.clone()))?;

        let mut sync = TableSync::new(
            Arc::clone(&session.store),
            start.game_id.clone(),
            SyncConfig::default(),
        );

        let table_path = Path::table(&start.game_id);
        let raw = session
            .store
            .get(&table_path)
            .await?
            .ok_or(StoreError::NotFound(table_path))?;
        let table = match sync.ingest_table(raw)? {
            Some(table) => table,
            None => return Err(SyncError::Stale.into()),
        };

        let turns_path = Path::turns(&start.game_id);
        let raw = session
            .store
            .get(&turns_path)
            .await?
            .ok_or(StoreError::NotFound(turns_path))?;
        let turns = match sync.ingest_turns(raw)? {
            Some(turns) => turns,
            None => return Err(SyncError::Stale.into()),
        };

        let mut hands = Vec::with_capacity(start.seat_order.len());
        for (seat, pid) in start.seat_order.iter().enumerate() {
            let doc = session
                .store
                .get(&Path::hand(&start.game_id, pid.as_str()))
                .await?;
            if seat == local_seat {
                let path = Path::hand(&start.game_id, pid.as_str());
                let record = doc
                    .ok_or(StoreError::NotFound(path))?
                    .decode::<HandRecord>()?
                    .value;
                hands.push(Hand::Visible(record.cards));
            } else {
                // A missing remote hand document means the deal has not
                // replicated yet; assume a full opening hand until the
                // subscription corrects it.
                let count = match doc {
                    Some(v) => v.decode::<HandRecord>()?.value.cards.len(),
                    None => config.cards_per_player as usize,
                };
                hands.push(Hand::Hidden { count });
            }
        }

        let state = GameState::new(
            start.game_id.clone(),
            start.seat_order.iter().map(|p| p.to_string()).collect(),
            local_seat,
            hands,
            table.value,
            table.version,
            turns.value,
            turns.version,
        );

        let table_sub = sync.subscribe_table().await?;
        let turns_sub = sync.subscribe_turns().await?;
        let (hand_tx, hand_rx) = mpsc::unbounded_channel();
        for (seat, pid) in start.seat_order.iter().enumerate() {
            if seat == local_seat {
                continue;
            }
            let sub = sync.subscribe_hand(pid.as_str()).await?;
            let tx = hand_tx.clone();
            tokio::spawn(async move {
                // Keep the handle alive for the task's lifetime; dropping
                // it would cancel the subscription under us.
                let Subscription {
                    handle: _handle,
                    mut rx,
                } = sub;
                while let Some(v) = rx.recv().await {
                    if tx.send((seat, v)).is_err() {
                        break;
                    }
                }
            });
        }

        let timer = TurnTimer::new(TimerConfig::with_turn_secs(
            config.turn_duration_secs,
        ));
        let status_rx = sync.status();
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) =
            watch::channel(snapshot_of(&state, PlayPhase::Idle, &timer, false));

        let engine = GameEngine {
            player_id: session.player_id,
            config,
            state,
            phase: PlayPhase::Idle,
            sync,
            timer,
            uno_deadline: None,
            uno_called: false,
            snapshot_tx,
            rx: cmd_rx,
            table_sub,
            turns_sub,
            table_live: true,
            turns_live: true,
            hand_rx,
        };
        tokio::spawn(engine.run());

        Ok(EngineHandle {
            tx: cmd_tx,
            snapshot_rx,
            status_rx,
        })
    }

    // -- Actor loop --------------------------------------------------------

    async fn run(mut self) {
        tracing::info!(
            game = %self.state.game_id(),
            seat = self.state.local_seat(),
            "game engine started"
        );
        self.enter_turn().await;
        self.publish();

        loop {
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(EngineCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd).await,
                },
                msg = self.table_sub.rx.recv(), if self.table_live => match msg {
                    Some(raw) => self.on_table(raw).await,
                    None => {
                        self.table_live = false;
                        self.sync.mark_stale();
                    }
                },
                msg = self.turns_sub.rx.recv(), if self.turns_live => match msg {
                    Some(raw) => self.on_turns(raw).await,
                    None => {
                        self.turns_live = false;
                        self.sync.mark_stale();
                    }
                },
                Some((seat, raw)) = self.hand_rx.recv() => self.on_hand(seat, raw),
                tick = self.timer.wait_for_tick() => self.on_tick(tick).await,
                _ = sleep_until_opt(self.uno_deadline), if self.uno_deadline.is_some() => {
                    self.on_uno_missed().await;
                }
            }
            self.publish();
        }

        tracing::info!(game = %self.state.game_id(), "game engine stopped");
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::SelectCard { index, reply } => {
                let result = self.do_select_card(index);
                let _ = reply.send(result);
            }
            EngineCommand::CommitPlay { index, reply } => {
                let result = self.do_commit_play(index).await;
                let _ = reply.send(result);
            }
            EngineCommand::ResolveColor { color, reply } => {
                let result = self.do_resolve_color(color).await;
                let _ = reply.send(result);
            }
            EngineCommand::DrawForTurn { reply } => {
                let result = self.do_draw_for_turn().await;
                let _ = reply.send(result);
            }
            EngineCommand::CallUno { reply } => {
                let _ = reply.send(self.do_call_uno());
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            // Handled by the loop.
            EngineCommand::Shutdown => {}
        }
    }

    // -- Command handlers --------------------------------------------------

    fn do_select_card(&mut self, index: usize) -> Result<PlayPhase, WildstackError> {
        let phase = self.state.select_card(self.phase, index)?;
        self.phase = phase;
        if self.phase.pauses_timer() {
            self.timer.pause();
        } else {
            self.timer.resume();
        }
        Ok(phase)
    }

    async fn do_commit_play(
        &mut self,
        index: usize,
    ) -> Result<PlayOutcome, WildstackError> {
        if self.phase == PlayPhase::Finished {
            return Err(GameError::Finished.into());
        }
        if self.phase == PlayPhase::AwaitingColorChoice {
            // A wild is still unresolved; nothing else may be played.
            return Err(GameError::NotPlayable.into());
        }
        if !self.sync.synced_for_turn().await? {
            return Err(SyncError::Stale.into());
        }

        self.timer.pause();
        let saved = self.state.clone();
        let outcome = match self.state.commit_play(index) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.phase = PlayPhase::Idle;
                self.timer.resume();
                return Err(e.into());
            }
        };
        self.phase = PlayPhase::Committing;

        let confirmed = self
            .sync
            .commit_play(
                Prediction::PlayedCard { index },
                &self.state.table,
                self.state.turn_vector(),
            )
            .await;
        match confirmed {
            Ok(confirmed) => {
                self.state.confirm_table(confirmed.table_version);
                self.state.confirm_turns(confirmed.turn_version);
            }
            Err(e) if self.sync.table_version() == saved.table_version() => {
                // Lost the race (or the store): the play never happened.
                self.state = saved;
                self.phase = PlayPhase::Idle;
                self.timer.resume();
                return Err(e.into());
            }
            Err(error) => {
                // The table write landed, only the turn hand-off raced.
                // The card is played; the winning turn vector folds in
                // through the subscription.
                tracing::warn!(
                    %error,
                    "turn hand-off conflicted after the play landed"
                );
                self.state.confirm_table(self.sync.table_version());
            }
        }
        self.write_local_hand().await;

        match outcome {
            PlayOutcome::AwaitColor { .. } => {
                // Timer stays paused until the color lands.
                self.phase = PlayPhase::AwaitingColorChoice;
            }
            PlayOutcome::Finished { .. } => {
                self.phase = PlayPhase::Finished;
                self.timer.disarm();
                self.uno_deadline = None;
            }
            PlayOutcome::Advanced => {
                self.phase = PlayPhase::Idle;
                self.timer.disarm();
                self.open_uno_window();
            }
        }
        Ok(outcome)
    }

    async fn do_resolve_color(
        &mut self,
        color: Color,
    ) -> Result<PlayOutcome, WildstackError> {
        if self.phase != PlayPhase::AwaitingColorChoice {
            return Err(GameError::NotAwaitingColor.into());
        }
        let saved = self.state.clone();
        let outcome = self.state.resolve_color_choice(color)?;

        let confirmed = self
            .sync
            .commit_play(
                Prediction::ChoseColor,
                &self.state.table,
                self.state.turn_vector(),
            )
            .await;
        match confirmed {
            Ok(confirmed) => {
                self.state.confirm_table(confirmed.table_version);
                self.state.confirm_turns(confirmed.turn_version);
            }
            Err(e) if self.sync.table_version() == saved.table_version() => {
                // Keep awaiting; the UI may retry the choice.
                self.state = saved;
                return Err(e.into());
            }
            Err(error) => {
                // The bound color landed; only the hand-off raced.
                tracing::warn!(
                    %error,
                    "turn hand-off conflicted after the color landed"
                );
                self.state.confirm_table(self.sync.table_version());
            }
        }

        self.phase = PlayPhase::Idle;
        self.timer.disarm();
        self.open_uno_window();
        Ok(outcome)
    }

    async fn do_draw_for_turn(&mut self) -> Result<DrawOutcome, WildstackError> {
        if self.phase == PlayPhase::AwaitingColorChoice {
            return Err(GameError::NotPlayable.into());
        }
        if !self.sync.synced_for_turn().await? {
            return Err(SyncError::Stale.into());
        }
        let saved = self.state.clone();
        let result = self.state.draw_for_turn(
            &mut rand::rng(),
            self.config.max_draw_cards,
            self.config.special_card_percent,
        );
        let outcome = result?;
        match outcome {
            DrawOutcome::MayPlay { .. } => {
                // The turn is kept; only the hand changed.
                self.write_local_hand().await;
            }
            DrawOutcome::TurnOver { .. } => {
                let advanced = self.sync.advance_turn(self.state.turn_vector()).await;
                match advanced {
                    Ok(v) => self.state.confirm_turns(v),
                    Err(e) => {
                        self.state = saved;
                        return Err(e.into());
                    }
                }
                self.write_local_hand().await;
                self.timer.disarm();
            }
        }
        Ok(outcome)
    }

    fn do_call_uno(&mut self) -> Result<(), WildstackError> {
        if self.uno_deadline.take().is_some() {
            self.uno_called = true;
            tracing::info!(game = %self.state.game_id(), "UNO called in time");
        }
        Ok(())
    }

    // -- Event handlers ----------------------------------------------------

    async fn on_table(&mut self, raw: Versioned<Value>) {
        match self.sync.ingest_table(raw) {
            Ok(Some(snapshot)) => {
                if self.state.ingest_table(snapshot.value, snapshot.version) {
                    self.enter_turn().await;
                }
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, "bad table snapshot"),
        }
    }

    async fn on_turns(&mut self, raw: Versioned<Value>) {
        match self.sync.ingest_turns(raw) {
            Ok(Some(snapshot)) => {
                if self.state.ingest_turns(snapshot.value, snapshot.version) {
                    // Any preview belonged to the turn that just ended.
                    if matches!(self.phase, PlayPhase::Previewed { .. }) {
                        self.phase = PlayPhase::Idle;
                    }
                    self.enter_turn().await;
                }
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, "bad turn snapshot"),
        }
    }

    fn on_hand(&mut self, seat: usize, raw: Versioned<Value>) {
        match raw.decode::<HandRecord>() {
            Ok(record) => {
                let changed = self
                    .state
                    .ingest_remote_hand(seat, record.value.cards.len());
                if changed && self.state.finished() {
                    self.phase = PlayPhase::Finished;
                    self.timer.disarm();
                    self.uno_deadline = None;
                }
            }
            Err(error) => tracing::warn!(%error, seat, "bad hand snapshot"),
        }
    }

    async fn on_tick(&mut self, tick: TimerTick) {
        if !tick.expired {
            // Non-final ticks only refresh the countdown display.
            return;
        }
        if tick.turn_version != self.state.turn_version()
            || !self.state.is_local_turn()
            || self.state.finished()
        {
            return;
        }
        tracing::info!(game = %self.state.game_id(), "turn timed out, forcing a draw");

        let saved = self.state.clone();
        let had_chain = !self.state.table.chain.is_none();
        let result = self.state.timeout(
            &mut rand::rng(),
            self.config.max_draw_cards,
            self.config.special_card_percent,
        );
        let drawn = match result {
            Ok(drawn) => drawn,
            Err(error) => {
                tracing::warn!(%error, "timeout raced a state change, skipping");
                return;
            }
        };

        if had_chain {
            match self.sync.reset_chain().await {
                Ok(v) => self.state.confirm_table(v),
                Err(error) => {
                    tracing::warn!(%error, "chain reset failed after timeout");
                    self.state = saved;
                    return;
                }
            }
        }
        let record = HandRecord::new(self.state.local_hand().to_vec());
        if let Err(error) = self
            .sync
            .accrue_penalty(self.player_id.as_str(), &record, drawn, "turn_timeout")
            .await
        {
            tracing::warn!(%error, "hand write failed after timeout");
        }
        match self.sync.advance_turn(self.state.turn_vector()).await {
            Ok(v) => self.state.confirm_turns(v),
            Err(error) => {
                tracing::warn!(%error, "turn hand-off conflicted, reconciling from snapshots");
            }
        }
        self.phase = PlayPhase::Idle;
    }

    async fn on_uno_missed(&mut self) {
        self.uno_deadline = None;
        if self.uno_called || !self.state.uno_window_applies() {
            return;
        }
        self.state
            .apply_uno_penalty(&mut rand::rng(), self.config.special_card_percent);
        let record = HandRecord::new(self.state.local_hand().to_vec());
        if let Err(error) = self
            .sync
            .accrue_penalty(self.player_id.as_str(), &record, 2, "uno_missed")
            .await
        {
            tracing::warn!(%error, "penalty hand write failed");
        }
    }

    // -- Turn boundary -----------------------------------------------------

    /// Runs whenever the active seat (or the table under it) may have
    /// changed: resolves a forced draw chain, arms or disarms the
    /// countdown, and gates it on the freshness probe.
    async fn enter_turn(&mut self) {
        if self.state.finished() {
            self.phase = PlayPhase::Finished;
            self.timer.disarm();
            self.uno_deadline = None;
            return;
        }
        if !self.state.is_local_turn() {
            self.timer.disarm();
            return;
        }
        if matches!(
            self.phase,
            PlayPhase::Committing | PlayPhase::AwaitingColorChoice
        ) {
            return;
        }

        let saved = self.state.clone();
        let resolved = self.state.resolve_pending_chain(
            &mut rand::rng(),
            self.config.special_card_percent,
        );
        match resolved {
            Ok(Some(forced)) => {
                match self.sync.reset_chain().await {
                    Ok(v) => self.state.confirm_table(v),
                    Err(error) => {
                        tracing::warn!(%error, "chain reset failed, retrying on next snapshot");
                        self.state = saved;
                        return;
                    }
                }
                let record = HandRecord::new(self.state.local_hand().to_vec());
                if let Err(error) = self
                    .sync
                    .accrue_penalty(
                        self.player_id.as_str(),
                        &record,
                        forced.drawn as usize,
                        "draw_chain",
                    )
                    .await
                {
                    tracing::warn!(%error, "hand write failed after forced draw");
                }
                match self.sync.advance_turn(self.state.turn_vector()).await {
                    Ok(v) => self.state.confirm_turns(v),
                    Err(error) => {
                        tracing::warn!(%error, "turn hand-off conflicted, reconciling from snapshots");
                    }
                }
                self.timer.disarm();
            }
            Ok(None) => {
                // The player acts on this turn; run the countdown for it.
                if self.timer.turn_version() != Some(self.state.turn_version()) {
                    self.timer.arm(self.state.turn_version());
                }
                let ready = self.sync.synced_for_turn().await.unwrap_or(false);
                self.timer.set_ready(ready);
            }
            Err(_) => {}
        }
    }

    // -- Helpers -----------------------------------------------------------

    fn open_uno_window(&mut self) {
        if self.state.uno_window_applies() {
            self.uno_called = false;
            self.uno_deadline = Some(TokioInstant::now() + UNO_GRACE);
            tracing::debug!(game = %self.state.game_id(), "UNO window open");
        }
    }

    async fn write_local_hand(&mut self) {
        let record = HandRecord::new(self.state.local_hand().to_vec());
        if let Err(error) = self.sync.write_hand(self.player_id.as_str(), &record).await
        {
            tracing::warn!(%error, "hand write failed");
        }
    }

    fn snapshot(&self) -> GameSnapshot {
        snapshot_of(
            &self.state,
            self.phase,
            &self.timer,
            self.uno_deadline.is_some(),
        )
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

fn snapshot_of(
    state: &GameState,
    phase: PlayPhase,
    timer: &TurnTimer,
    uno_window_open: bool,
) -> GameSnapshot {
    GameSnapshot {
        game_id: state.game_id().to_string(),
        seats: state.seat_order().to_vec(),
        local_seat: state.local_seat(),
        hand: state.local_hand().to_vec(),
        hand_counts: state.hand_counts(),
        discard_top: state.table.discard_top,
        chain: state.table.chain,
        direction: state.table.direction,
        active_seat: state.active_seat(),
        phase,
        seconds_left: timer.seconds_left(),
        finished: state.finished(),
        winner: state.winner(),
        uno_window_open,
    }
}

async fn sleep_until_opt(deadline: Option<TokioInstant>) {
    match deadline {
        Some(t) => tokio::time::sleep_until(t).await,
        None => std::future::pending().await,
    }
}
