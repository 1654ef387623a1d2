//! Error types for the game state machine.
//!
//! These are all local validation errors: they are returned before any
//! remote write is attempted and never produce a state mutation.

use wildstack_cards::Color;

/// Why a game action was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The acting seat is not the active seat.
    #[error("not your turn")]
    NotYourTurn,

    /// The card is not legal against the current discard top and chain.
    #[error("card is not playable")]
    NotPlayable,

    /// The hand has no card at this index.
    #[error("no card at index {0}")]
    NoSuchCard(usize),

    /// A color choice arrived but no wild is awaiting resolution.
    #[error("no color choice pending")]
    NotAwaitingColor,

    /// The chosen color cannot be bound to a wild.
    #[error("{0} is not a choosable color")]
    InvalidColor(Color),

    /// The game is over; no further mutation is accepted.
    #[error("game is finished")]
    Finished,

    /// A voluntary draw was attempted while a draw chain is pending.
    #[error("a draw chain of {count} cards is pending")]
    ChainPending { count: u8 },
}
