//! The room document and its identifiers.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{GameConfig, LobbyError};

// ---------------------------------------------------------------------------
// RoomCode
// ---------------------------------------------------------------------------

/// The 4-digit code players type to join a room. Zero-padded, `0000`
/// through `9999`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(u16);

impl RoomCode {
    /// Parses a code; rejects anything but exactly four ASCII digits.
    pub fn parse(s: &str) -> Result<Self, LobbyError> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(LobbyError::InvalidCode(s.to_string()));
        }
        // Four digits always fit a u16.
        Ok(Self(s.parse().unwrap_or(0)))
    }

    /// Samples a code uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(0..=9999))
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = LobbyError;

    fn try_from(s: String) -> Result<Self, LobbyError> {
        Self::parse(&s)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> String {
        code.to_string()
    }
}

// ---------------------------------------------------------------------------
// PlayerId / Seat / Player
// ---------------------------------------------------------------------------

/// Opaque stable player identity (an auth uid, a device id — the lobby
/// does not care, it only compares).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A seat number, 1-based, unique within a room.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Seat(pub u8);

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seat {}", self.0)
    }
}

/// One seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub seat: Seat,
    pub is_host: bool,
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// The persisted room document at `lobby/{code}`.
///
/// `players` is kept in ascending seat order; that order becomes the seat
/// order of the game when the host starts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub code: RoomCode,
    pub host: PlayerId,
    pub max_players: u8,
    pub players: Vec<Player>,
    pub config: GameConfig,
    pub started: bool,
    /// Set when the game starts; the game documents live under this id.
    pub game_id: Option<String>,
    pub created_at_ms: u64,
}

impl Room {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn is_host(&self, id: &PlayerId) -> bool {
        &self.host == id
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players as usize
    }

    /// The lowest seat number not yet taken, if the room has space.
    pub fn free_seat(&self) -> Option<Seat> {
        (1..=self.max_players)
            .map(Seat)
            .find(|s| self.players.iter().all(|p| p.seat != *s))
    }

    /// Seats a player at `seat`, keeping `players` seat-ordered.
    pub(crate) fn seat_player(&mut self, player: Player) {
        let at = self
            .players
            .iter()
            .position(|p| p.seat > player.seat)
            .unwrap_or(self.players.len());
        self.players.insert(at, player);
    }

    /// Player ids in ascending seat order.
    pub fn seat_order(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }
}
