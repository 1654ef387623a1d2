//! The read-only projection the UI renders.

use wildstack_cards::{Card, PendingChain};
use wildstack_game::{Direction, PlayPhase};

/// Everything a game screen needs, in one immutable value.
///
/// Published through a watch channel after every engine transition; the
/// UI renders the latest and never reaches into live state.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub game_id: String,
    /// Player ids in seat order.
    pub seats: Vec<String>,
    pub local_seat: usize,
    /// The local player's cards.
    pub hand: Vec<Card>,
    /// Hand sizes by seat (the local seat included).
    pub hand_counts: Vec<usize>,
    pub discard_top: Card,
    pub chain: PendingChain,
    pub direction: Direction,
    pub active_seat: usize,
    pub phase: PlayPhase,
    /// Countdown display while the local turn is running.
    pub seconds_left: Option<u32>,
    pub finished: bool,
    pub winner: Option<usize>,
    /// The local player is down to one card and may still call UNO.
    pub uno_window_open: bool,
}

impl GameSnapshot {
    pub fn is_local_turn(&self) -> bool {
        self.active_seat == self.local_seat
    }
}
