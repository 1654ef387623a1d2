//! Persisted game shapes: the table document, the turn vector, and hand
//! records.

use serde::{Deserialize, Serialize};
use wildstack_cards::{Card, PendingChain};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// The direction of play around the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// The seat-index step: +1 clockwise, −1 counter-clockwise.
    pub fn step(self) -> i64 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    /// The opposite direction (a `Reverse` card).
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

// ---------------------------------------------------------------------------
// TableState
// ---------------------------------------------------------------------------

/// The shared table document at `game/{code}/table`.
///
/// The store's write counter for this path is the game's `table_version`:
/// it strictly increases on every discard-top mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableState {
    /// The card other players must match to play.
    pub discard_top: Card,
    /// The unresolved stacked draw penalty, if any.
    #[serde(default)]
    pub chain: PendingChain,
    /// Direction of play.
    pub direction: Direction,
}

impl TableState {
    /// The table at the start of a game: an opening discard, no chain,
    /// clockwise play.
    pub fn opening(discard_top: Card) -> Self {
        Self {
            discard_top,
            chain: PendingChain::None,
            direction: Direction::Clockwise,
        }
    }
}

// ---------------------------------------------------------------------------
// TurnVector
// ---------------------------------------------------------------------------

/// The shared turn vector at `game/{code}/turns`: one flag per seat,
/// exactly one true.
///
/// The store's write counter for this path is the game's `turn_version`.
/// A vector with zero or multiple active seats is state corruption —
/// accessors panic rather than guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnVector(Vec<bool>);

impl TurnVector {
    /// A vector of `seats` flags with `active` set.
    pub fn new(seats: usize, active: usize) -> Self {
        assert!(seats >= 2, "a game needs at least two seats");
        assert!(active < seats, "active seat {active} out of {seats}");
        let mut flags = vec![false; seats];
        flags[active] = true;
        Self(flags)
    }

    /// Number of seats.
    pub fn seats(&self) -> usize {
        self.0.len()
    }

    /// Whether exactly one seat is active.
    pub fn is_valid(&self) -> bool {
        self.0.iter().filter(|f| **f).count() == 1
    }

    /// The active seat index.
    ///
    /// # Panics
    /// If the vector does not hold exactly one active seat.
    pub fn active_seat(&self) -> usize {
        assert!(
            self.is_valid(),
            "turn vector corrupt: {:?} must hold exactly one active seat",
            self.0
        );
        self.0.iter().position(|f| *f).unwrap()
    }

    /// The vector after advancing `steps` seats in `direction`.
    ///
    /// `steps` is 0 only for the two-player `Reverse` self-repeat; the
    /// vector is still rewritten (and its version bumped) so observers
    /// see the turn hand-off.
    #[must_use]
    pub fn advanced(&self, direction: Direction, steps: u32) -> Self {
        let seats = self.seats() as i64;
        let current = self.active_seat() as i64;
        let next = (current + direction.step() * steps as i64).rem_euclid(seats);
        Self::new(self.seats(), next as usize)
    }
}

// ---------------------------------------------------------------------------
// HandRecord
// ---------------------------------------------------------------------------

/// One player's hand at `game/{code}/hands/{player}`.
///
/// Written only by the owning player's client. Other clients read the
/// record solely for its count — the contents of a remote hand are not
/// part of any other client's model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandRecord {
    pub cards: Vec<Card>,
}

impl HandRecord {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

// =========================================================================
// Tests
// =========================================================================
