//! Room operations over a versioned store.
//!
//! Every mutation is a conditional transaction on the `lobby/{code}`
//! document — the client never checks a condition in one read and acts on
//! it in a later write. Concurrent joins, config edits, and start
//! attempts are all arbitrated by the store's compare-and-swap.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;
use wildstack_cards::{deal, first_discard};
use wildstack_game::{HandRecord, TableState, TurnVector};
use wildstack_store::{
    transaction, Path, StoreError, Subscription, TransactionConfig, Versioned,
    VersionedStore,
};

use crate::{GameConfig, LobbyError, Player, PlayerId, Room, RoomCode, Seat};

/// Bounded search for a free room code, as many tries as the code space
/// is sparse: 25 uniform samples from 10_000 codes.
const CODE_ATTEMPTS: u32 = 25;

/// Start-game retries when the roster changes under the flip.
const START_ATTEMPTS: u32 = 8;

// ---------------------------------------------------------------------------
// GameStart
// ---------------------------------------------------------------------------

/// What a successful [`LobbyClient::start_game`] hands to the engine.
#[derive(Debug, Clone)]
pub struct GameStart {
    /// The id the game documents live under (the room code).
    pub game_id: String,
    /// Player ids in ascending seat order, fixed for the whole game.
    pub seat_order: Vec<PlayerId>,
    /// The validated config the game runs with.
    pub config: GameConfig,
}

// ---------------------------------------------------------------------------
// RoomWatch
// ---------------------------------------------------------------------------

/// A typed subscription to one room document.
#[derive(Debug)]
pub struct RoomWatch {
    inner: Subscription,
}

impl RoomWatch {
    /// The next room snapshot; `None` once the subscription is gone.
    /// Undecodable snapshots are logged and skipped.
    pub async fn next(&mut self) -> Option<Versioned<Room>> {
        while let Some(raw) = self.inner.rx.recv().await {
            match raw.decode::<Room>() {
                Ok(room) => return Some(room),
                Err(error) => {
                    tracing::warn!(%error, "undecodable room snapshot, skipping");
                }
            }
        }
        None
    }

    pub fn cancel(&self) {
        self.inner.handle.cancel();
    }
}

// ---------------------------------------------------------------------------
// LobbyClient
// ---------------------------------------------------------------------------

/// Client-side room lifecycle over a [`VersionedStore`].
#[derive(Debug)]
pub struct LobbyClient<S> {
    store: Arc<S>,
    txn: TransactionConfig,
}

impl<S> Clone for LobbyClient<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            txn: self.txn.clone(),
        }
    }
}

impl<S: VersionedStore> LobbyClient<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            txn: TransactionConfig::default(),
        }
    }

    /// Creates a room under a fresh random code, with the host at seat 1.
    ///
    /// Codes are sampled uniformly and claimed with a create-if-absent
    /// CAS; after [`CODE_ATTEMPTS`] collisions the lobby is considered
    /// saturated and the call fails with [`LobbyError::CodeExhausted`].
    pub async fn create_room(
        &self,
        host_id: PlayerId,
        host_name: impl Into<String>,
        max_players: u8,
    ) -> Result<Room, LobbyError> {
        let max_players = clamp_max_players(max_players);
        let display_name = host_name.into();

        for _ in 0..CODE_ATTEMPTS {
            let code = RoomCode::random(&mut rand::rng());
            let room = Room {
                code,
                host: host_id.clone(),
                max_players,
                players: vec![Player {
                    id: host_id.clone(),
                    display_name: display_name.clone(),
                    seat: Seat(1),
                    is_host: true,
                }],
                config: GameConfig::default(),
                started: false,
                game_id: None,
                created_at_ms: now_ms(),
            };
            let path = Path::lobby(&code.to_string());
            match self
                .store
                .compare_and_swap(&path, None, encode(&room)?)
                .await
            {
                Ok(_) => {
                    tracing::info!(%code, host = %room.host, "room created");
                    return Ok(room);
                }
                // Someone holds this code; roll again.
                Err(StoreError::VersionMismatch { .. }) => continue,
                Err(other) => return Err(other.into()),
            }
        }
        Err(LobbyError::CodeExhausted)
    }

    /// Seats a player at the lowest free seat.
    ///
    /// Idempotent for a player already seated: the current room comes
    /// back without a write, so a re-tapped join button (or a rejoin
    /// after the game started) is harmless. N concurrent joiners into K
    /// free seats get exactly `min(N, K)` distinct seats.
    pub async fn join_room(
        &self,
        code: RoomCode,
        player_id: PlayerId,
        display_name: impl Into<String>,
    ) -> Result<Room, LobbyError> {
        let display_name = display_name.into();
        let path = Path::lobby(&code.to_string());
        let updated = transaction(self.store.as_ref(), &path, &self.txn, |cur| {
            let mut room = decode_room(cur, code)?;
            if room.player(&player_id).is_some() {
                return Ok(None);
            }
            if room.started {
                return Err(LobbyError::AlreadyStarted(code));
            }
            let Some(seat) = room.free_seat() else {
                return Err(LobbyError::Full(code));
            };
            room.seat_player(Player {
                id: player_id.clone(),
                display_name: display_name.clone(),
                seat,
                is_host: false,
            });
            Ok(Some(encode(&room)?))
        })
        .await?;
        Ok(updated.decode::<Room>()?.value)
    }

    /// Replaces the room's rule config. Host only, lobby phase only; the
    /// config is clamp-validated before it is written.
    pub async fn update_config(
        &self,
        code: RoomCode,
        by: &PlayerId,
        new_config: GameConfig,
    ) -> Result<Room, LobbyError> {
        let config = new_config.validated();
        let path = Path::lobby(&code.to_string());
        let updated = transaction(self.store.as_ref(), &path, &self.txn, |cur| {
            let mut room = decode_room(cur, code)?;
            if !room.is_host(by) {
                return Err(LobbyError::NotHost(by.clone(), code));
            }
            if room.started {
                return Err(LobbyError::AlreadyStarted(code));
            }
            if room.config == config {
                return Ok(None);
            }
            room.config = config;
            Ok(Some(encode(&room)?))
        })
        .await?;
        Ok(updated.decode::<Room>()?.value)
    }

    /// Starts the game: deals every seated player's hand, writes the
    /// opening table and turn vector, then flips `started` on the room.
    ///
    /// The game documents are all in place before any client can observe
    /// `started == true`. Two racing hosts are arbitrated by a
    /// create-if-absent CAS on the table document — the loser gets
    /// [`LobbyError::AlreadyStarted`] and nothing is dealt twice. Players
    /// who slip in between the deal and the flip get dealt on a retry
    /// before the flip commits.
    pub async fn start_game(
        &self,
        code: RoomCode,
        by: &PlayerId,
    ) -> Result<(Room, GameStart), LobbyError> {
        let code_str = code.to_string();
        let snapshot = self.read_room(code).await?;
        if snapshot.started {
            return Err(LobbyError::AlreadyStarted(code));
        }
        if !snapshot.is_host(by) {
            return Err(LobbyError::NotHost(by.clone(), code));
        }
        if snapshot.players.len() < 2 {
            return Err(LobbyError::TooFewPlayers {
                have: snapshot.players.len(),
                need: 2,
            });
        }
        let config = snapshot.config.validated();

        // Arbitration point: exactly one starter can create the table.
        let table = {
            let mut rng = rand::rng();
            TableState::opening(first_discard(&mut rng))
        };
        match self
            .store
            .compare_and_swap(&Path::table(&code_str), None, encode(&table)?)
            .await
        {
            Ok(_) => {}
            Err(StoreError::VersionMismatch { .. }) => {
                return Err(LobbyError::AlreadyStarted(code));
            }
            Err(other) => return Err(other.into()),
        }

        // Deal, then flip. The flip transaction verifies the roster it
        // commits against is exactly the roster that was dealt; a join
        // that lands in between forces another deal round.
        let lobby_path = Path::lobby(&code_str);
        let mut dealt: Vec<PlayerId> = Vec::new();
        for _ in 0..START_ATTEMPTS {
            let roster = self.read_room(code).await?;
            for player in &roster.players {
                if dealt.contains(&player.id) {
                    continue;
                }
                let hand = {
                    let mut rng = rand::rng();
                    HandRecord::new(deal(
                        &mut rng,
                        config.cards_per_player as usize,
                        config.special_card_percent,
                    ))
                };
                self.store
                    .put(&Path::hand(&code_str, player.id.as_str()), encode(&hand)?)
                    .await?;
                dealt.push(player.id.clone());
            }
            let turns = TurnVector::new(roster.players.len(), 0);
            self.store
                .put(&Path::turns(&code_str), encode(&turns)?)
                .await?;

            let mut roster_grew = false;
            let updated =
                transaction(self.store.as_ref(), &lobby_path, &self.txn, |cur| {
                    let mut room = decode_room(cur, code)?;
                    if room.started {
                        return Err(LobbyError::AlreadyStarted(code));
                    }
                    if room.players.iter().any(|p| !dealt.contains(&p.id)) {
                        roster_grew = true;
                        return Ok(None);
                    }
                    room.started = true;
                    room.game_id = Some(code_str.clone());
                    room.config = config;
                    Ok(Some(encode(&room)?))
                })
                .await?;
            if roster_grew {
                continue;
            }

            let room = updated.decode::<Room>()?.value;
            tracing::info!(%code, players = room.players.len(), "game started");
            let start = GameStart {
                game_id: code_str,
                seat_order: room.seat_order(),
                config,
            };
            return Ok((room, start));
        }

        Err(StoreError::Contended {
            path: lobby_path,
            attempts: START_ATTEMPTS,
        }
        .into())
    }

    /// Removes a player from the room. Idempotent for a player who is
    /// not seated. Host departure hands the room to the lowest remaining
    /// seat; the last player out deletes the room.
    pub async fn leave_room(
        &self,
        code: RoomCode,
        player_id: &PlayerId,
    ) -> Result<(), LobbyError> {
        let path = Path::lobby(&code.to_string());
        let updated = transaction(self.store.as_ref(), &path, &self.txn, |cur| {
            let mut room = decode_room(cur, code)?;
            let Some(at) = room.players.iter().position(|p| &p.id == player_id)
            else {
                return Ok::<_, LobbyError>(None);
            };
            room.players.remove(at);
            if room.is_host(player_id) {
                if let Some(next_host) = room.players.first_mut() {
                    next_host.is_host = true;
                    room.host = next_host.id.clone();
                }
            }
            Ok(Some(encode(&room)?))
        })
        .await?;

        let room = updated.decode::<Room>()?.value;
        if room.players.is_empty() {
            tracing::info!(%code, "last player left, deleting room");
            self.delete_room_documents(&room).await?;
        }
        Ok(())
    }

    /// Deletes the room and any game documents under it. Host only.
    pub async fn delete_room(
        &self,
        code: RoomCode,
        by: &PlayerId,
    ) -> Result<(), LobbyError> {
        let room = self.read_room(code).await?;
        if !room.is_host(by) {
            return Err(LobbyError::NotHost(by.clone(), code));
        }
        self.delete_room_documents(&room).await
    }

    /// A one-shot snapshot of the room.
    pub async fn read_room(&self, code: RoomCode) -> Result<Room, LobbyError> {
        let path = Path::lobby(&code.to_string());
        match self.store.get(&path).await? {
            Some(versioned) => Ok(versioned.decode::<Room>()?.value),
            None => Err(LobbyError::NotFound(code)),
        }
    }

    /// Subscribes to the room document for the lobby screen.
    pub async fn watch_room(&self, code: RoomCode) -> Result<RoomWatch, LobbyError> {
        let path = Path::lobby(&code.to_string());
        let inner = self.store.subscribe(&path).await?;
        Ok(RoomWatch { inner })
    }

    async fn delete_room_documents(&self, room: &Room) -> Result<(), LobbyError> {
        let code_str = room.code.to_string();
        for player in &room.players {
            self.store
                .delete(&Path::hand(&code_str, player.id.as_str()))
                .await?;
        }
        self.store.delete(&Path::turns(&code_str)).await?;
        self.store.delete(&Path::table(&code_str)).await?;
        self.store.delete(&Path::lobby(&code_str)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn clamp_max_players(max_players: u8) -> u8 {
    if !(2..=6).contains(&max_players) {
        tracing::warn!(max_players, "max_players out of range, clamping to 2..=6");
    }
    max_players.clamp(2, 6)
}

fn decode_room(current: Option<&Value>, code: RoomCode) -> Result<Room, LobbyError> {
    let Some(value) = current else {
        return Err(LobbyError::NotFound(code));
    };
    serde_json::from_value(value.clone()).map_err(|e| StoreError::from(e).into())
}

fn encode<T: Serialize>(value: &T) -> Result<Value, LobbyError> {
    serde_json::to_value(value).map_err(|e| StoreError::from(e).into())
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
