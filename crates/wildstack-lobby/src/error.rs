//! Error types for the lobby layer.

use wildstack_store::StoreError;

use crate::RoomCode;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// No room exists under this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// Every seat up to `max_players` is taken.
    #[error("room {0} is full")]
    Full(RoomCode),

    /// The game already started; the room no longer accepts this
    /// operation.
    #[error("room {0} already started")]
    AlreadyStarted(RoomCode),

    /// Only the host may perform this operation.
    #[error("player {0} is not the host of room {1}")]
    NotHost(crate::PlayerId, RoomCode),

    /// A game needs at least two seated players.
    #[error("room has {have} players, needs {need}")]
    TooFewPlayers { have: usize, need: usize },

    /// Could not find a free room code within the attempt budget.
    #[error("no free room code found")]
    CodeExhausted,

    /// The input is not a 4-digit room code.
    #[error("invalid room code {0:?}")]
    InvalidCode(String),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
