//! Unified error type for the Wildstack engine.

use wildstack_game::GameError;
use wildstack_lobby::{LobbyError, PlayerId};
use wildstack_store::StoreError;
use wildstack_sync::SyncError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `wildstack` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WildstackError {
    /// A lobby-level error (room not found, full, not host).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A rule-level rejection (not your turn, card not playable).
    #[error(transparent)]
    Game(#[from] GameError),

    /// A reconciliation error (lost race, store unreachable, stale).
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A raw store error outside any transaction.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The local session's player is not seated in this game.
    #[error("player {0} is not seated in this game")]
    NotSeated(PlayerId),

    /// The engine actor is gone (shut down or crashed).
    #[error("game engine is no longer running")]
    EngineClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_game_error() {
        let err: WildstackError = GameError::NotYourTurn.into();
        assert!(matches!(err, WildstackError::Game(_)));
        assert!(err.to_string().contains("not your turn"));
    }

    #[test]
    fn test_from_sync_error() {
        let err: WildstackError = SyncError::Conflict { attempts: 1 }.into();
        assert!(matches!(err, WildstackError::Sync(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err: WildstackError = LobbyError::CodeExhausted.into();
        assert!(matches!(err, WildstackError::Lobby(_)));
    }
}
