//! The local game model and its transitions.

use rand::Rng;
use wildstack_cards::{deal, Card, Color, PendingChain, Special};

use crate::{GameError, PlayPhase, TableState, TurnVector};

// ---------------------------------------------------------------------------
// Hand
// ---------------------------------------------------------------------------

/// One seat's hand, as seen by this client.
///
/// The local seat sees its cards; every other seat is a count. There is
/// no representation for "another player's cards" at all — a client
/// simply does not hold that information.
#[derive(Debug, Clone, PartialEq)]
pub enum Hand {
    /// The local player's cards.
    Visible(Vec<Card>),
    /// A remote player's hand size.
    Hidden { count: usize },
}

impl Hand {
    /// Number of cards in the hand.
    pub fn count(&self) -> usize {
        match self {
            Hand::Visible(cards) => cards.len(),
            Hand::Hidden { count } => *count,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a committed play led to.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// A wild needs its color chosen before the turn can advance.
    AwaitColor { card: Card },
    /// The acting hand emptied: game over, no turn advance.
    Finished { winner_seat: usize },
    /// Effects applied and the turn moved on.
    Advanced,
}

/// What a voluntary draw led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// At least one drawn card is playable; the player may still play.
    MayPlay { drawn: usize },
    /// Nothing drawn was playable; the turn advanced automatically.
    TurnOver { drawn: usize },
}

/// A forced draw that resolved a pending chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedDraw {
    /// How many penalty cards were drawn.
    pub drawn: u8,
}

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// A client's assembled view of one game.
///
/// All transitions are local and synchronous; nothing here talks to the
/// store. The engine applies a transition as a prediction, pushes the
/// changed shapes through the reconciliation layer, and folds remote
/// snapshots back in through the `ingest_*` methods.
///
/// Version counters only move through `ingest_*`/`confirm_*`: a
/// prediction changes content, never versions, so a lost race is healed
/// by the winner's (strictly newer) snapshot.
#[derive(Debug, Clone)]
pub struct GameState {
    game_id: String,
    /// Player ids in ascending seat order, fixed at start.
    seat_order: Vec<String>,
    local_seat: usize,
    hands: Vec<Hand>,
    /// The shared table document (local copy, possibly predicted).
    pub table: TableState,
    table_version: u64,
    turn_vector: TurnVector,
    turn_version: u64,
    finished: bool,
    winner: Option<usize>,
}

impl GameState {
    /// Assembles a client-side game view.
    ///
    /// `hands[local_seat]` must be [`Hand::Visible`]; the versions are
    /// those of the snapshots the table and turn vector came from.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        game_id: impl Into<String>,
        seat_order: Vec<String>,
        local_seat: usize,
        hands: Vec<Hand>,
        table: TableState,
        table_version: u64,
        turn_vector: TurnVector,
        turn_version: u64,
    ) -> Self {
        assert_eq!(seat_order.len(), hands.len(), "one hand per seat");
        assert_eq!(seat_order.len(), turn_vector.seats(), "one flag per seat");
        assert!(
            matches!(hands.get(local_seat), Some(Hand::Visible(_))),
            "the local hand must be visible"
        );
        Self {
            game_id: game_id.into(),
            seat_order,
            local_seat,
            hands,
            table,
            table_version,
            turn_vector,
            turn_version,
            finished: false,
            winner: None,
        }
    }

    // -- Accessors ---------------------------------------------------------

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn seat_order(&self) -> &[String] {
        &self.seat_order
    }

    pub fn local_seat(&self) -> usize {
        self.local_seat
    }

    pub fn seats(&self) -> usize {
        self.seat_order.len()
    }

    pub fn active_seat(&self) -> usize {
        self.turn_vector.active_seat()
    }

    pub fn is_local_turn(&self) -> bool {
        self.active_seat() == self.local_seat
    }

    pub fn turn_vector(&self) -> &TurnVector {
        &self.turn_vector
    }

    pub fn table_version(&self) -> u64 {
        self.table_version
    }

    pub fn turn_version(&self) -> u64 {
        self.turn_version
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    /// The winning seat, once the game is finished.
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    /// The local player's cards.
    pub fn local_hand(&self) -> &[Card] {
        match &self.hands[self.local_seat] {
            Hand::Visible(cards) => cards,
            Hand::Hidden { .. } => unreachable!("local hand is always visible"),
        }
    }

    /// Hand sizes by seat.
    pub fn hand_counts(&self) -> Vec<usize> {
        self.hands.iter().map(Hand::count).collect()
    }

    /// Indices of local cards currently legal to play.
    pub fn playable_indices(&self) -> Vec<usize> {
        self.local_hand()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_playable(&self.table.discard_top, &self.table.chain))
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether the local hand holds any card that extends the pending
    /// chain.
    pub fn holds_chain_extender(&self) -> bool {
        !self.table.chain.is_none() && !self.playable_indices().is_empty()
    }

    // -- Transitions -------------------------------------------------------

    /// Drives the preview machine: `Idle → Previewed` on a playable card,
    /// `Previewed → Committing` when the same card is selected again,
    /// re-preview on a different playable card.
    pub fn select_card(
        &self,
        phase: PlayPhase,
        index: usize,
    ) -> Result<PlayPhase, GameError> {
        self.ensure_local_turn()?;
        if !phase.can_select() {
            // A re-rendered UI may re-fire a selection mid-commit; the
            // phase simply doesn't change.
            return Ok(phase);
        }
        let card = self.card_at(index)?;
        if !card.is_playable(&self.table.discard_top, &self.table.chain) {
            return Err(GameError::NotPlayable);
        }
        Ok(match phase {
            PlayPhase::Previewed { index: previewed } if previewed == index => {
                PlayPhase::Committing
            }
            _ => PlayPhase::Previewed { index },
        })
    }

    /// Applies a play locally, in the fixed effect order:
    ///
    /// 1. the card becomes the discard top;
    /// 2. `Reverse` flips the direction (with exactly 2 seats the acting
    ///    player goes again);
    /// 3. `DrawTwo` adds 2 to the chain (a `DrawFour` chain keeps its
    ///    stronger kind);
    /// 4. `DrawFour` adds 4; a color choice opens only when the card was
    ///    not itself a chain continuation;
    /// 5. `ChangeColor` always opens a color choice;
    /// 6. the card leaves the hand;
    /// 7. an empty hand finishes the game — no turn advance;
    /// 8. otherwise the turn advances unless a color choice is open.
    pub fn commit_play(&mut self, index: usize) -> Result<PlayOutcome, GameError> {
        self.ensure_local_turn()?;
        let card = self.card_at(index)?;
        if !card.is_playable(&self.table.discard_top, &self.table.chain) {
            return Err(GameError::NotPlayable);
        }

        self.table.discard_top = card;
        let mut steps = 1;
        let mut awaiting_color = false;
        match card.special() {
            Some(Special::Reverse) => {
                self.table.direction = self.table.direction.flipped();
                if self.seats() == 2 {
                    steps = 0;
                }
            }
            Some(Special::DrawTwo) => {
                self.table.chain = self.table.chain.stack_draw_two();
            }
            Some(Special::DrawFour) => {
                let continuation =
                    matches!(self.table.chain, PendingChain::DrawFour { .. });
                self.table.chain = self.table.chain.stack_draw_four();
                awaiting_color = !continuation;
            }
            Some(Special::ChangeColor) => awaiting_color = true,
            None => {}
        }

        let removed = self.local_hand_mut().remove(index);
        debug_assert_eq!(removed, card);

        if self.local_hand().is_empty() {
            let seat = self.local_seat;
            self.finish(seat);
            return Ok(PlayOutcome::Finished { winner_seat: seat });
        }
        if awaiting_color {
            return Ok(PlayOutcome::AwaitColor { card });
        }
        self.advance_local(steps);
        Ok(PlayOutcome::Advanced)
    }

    /// Rebinds the pending wild's color, then advances the turn.
    pub fn resolve_color_choice(
        &mut self,
        color: Color,
    ) -> Result<PlayOutcome, GameError> {
        self.ensure_local_turn()?;
        if color.is_wild() {
            return Err(GameError::InvalidColor(color));
        }
        if !self.table.discard_top.color.is_wild() {
            return Err(GameError::NotAwaitingColor);
        }
        self.table.discard_top = self.table.discard_top.with_color(color);
        self.advance_local(1);
        Ok(PlayOutcome::Advanced)
    }

    /// Pending-chain resolution at the start of the local turn.
    ///
    /// Returns `Ok(None)` when there is nothing to resolve (no chain, or
    /// the player holds a chain-extending card and may act). Otherwise
    /// the penalty is drawn, the chain resets, and the turn advances
    /// without a play.
    pub fn resolve_pending_chain<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        special_chance_percent: u8,
    ) -> Result<Option<ForcedDraw>, GameError> {
        self.ensure_local_turn()?;
        let count = self.table.chain.count();
        if count == 0 || self.holds_chain_extender() {
            return Ok(None);
        }
        let drawn = deal(rng, count as usize, special_chance_percent);
        self.local_hand_mut().extend(drawn);
        self.table.chain = PendingChain::None;
        self.advance_local(1);
        tracing::debug!(game = %self.game_id, count, "forced draw resolved chain");
        Ok(Some(ForcedDraw { drawn: count }))
    }

    /// A voluntary draw outside a chain: draws `max_draw_cards`; the turn
    /// advances automatically only when nothing drawn is playable.
    pub fn draw_for_turn<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        max_draw_cards: u8,
        special_chance_percent: u8,
    ) -> Result<DrawOutcome, GameError> {
        self.ensure_local_turn()?;
        let count = self.table.chain.count();
        if count > 0 {
            return Err(GameError::ChainPending { count });
        }
        let drawn = deal(rng, max_draw_cards as usize, special_chance_percent);
        let any_playable = drawn
            .iter()
            .any(|c| c.is_playable(&self.table.discard_top, &self.table.chain));
        let n = drawn.len();
        self.local_hand_mut().extend(drawn);
        if any_playable {
            Ok(DrawOutcome::MayPlay { drawn: n })
        } else {
            self.advance_local(1);
            Ok(DrawOutcome::TurnOver { drawn: n })
        }
    }

    /// Turn-timer expiry: the forced resolution of whatever is pending,
    /// then the turn ends regardless — a timeout never leaves the player
    /// holding the turn, even if a drawn card would have been playable.
    ///
    /// Returns the number of cards drawn.
    pub fn timeout<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        max_draw_cards: u8,
        special_chance_percent: u8,
    ) -> Result<usize, GameError> {
        self.ensure_local_turn()?;
        let chain_count = self.table.chain.count();
        let n = if chain_count > 0 {
            self.table.chain = PendingChain::None;
            chain_count as usize
        } else {
            max_draw_cards as usize
        };
        let drawn = deal(rng, n, special_chance_percent);
        self.local_hand_mut().extend(drawn);
        self.advance_local(1);
        tracing::info!(game = %self.game_id, drawn = n, "turn timed out");
        Ok(n)
    }

    /// Whether the local hand is down to exactly one card (the UNO grace
    /// window applies).
    pub fn uno_window_applies(&self) -> bool {
        !self.finished && self.local_hand().len() == 1
    }

    /// The missed-UNO penalty: two cards into the local hand.
    pub fn apply_uno_penalty<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        special_chance_percent: u8,
    ) {
        let penalty = deal(rng, 2, special_chance_percent);
        self.local_hand_mut().extend(penalty);
        tracing::info!(game = %self.game_id, "UNO not called, 2 penalty cards");
    }

    // -- Remote reconciliation --------------------------------------------

    /// Folds in a table snapshot. Stale versions (and anything after the
    /// game finished) are dropped; returns whether the snapshot applied.
    pub fn ingest_table(&mut self, table: TableState, version: u64) -> bool {
        if self.finished || version <= self.table_version {
            return false;
        }
        self.table = table;
        self.table_version = version;
        true
    }

    /// Folds in a turn-vector snapshot.
    ///
    /// # Panics
    /// If the snapshot does not hold exactly one active seat, or its seat
    /// count disagrees with the game — both are state corruption.
    pub fn ingest_turns(&mut self, turns: TurnVector, version: u64) -> bool {
        if self.finished || version <= self.turn_version {
            return false;
        }
        assert_eq!(turns.seats(), self.seats(), "turn vector seat count changed");
        let _ = turns.active_seat(); // asserts exactly one active seat
        self.turn_vector = turns;
        self.turn_version = version;
        true
    }

    /// Folds in a remote hand's size. A remote hand reaching zero ends
    /// the game with that seat as the winner.
    pub fn ingest_remote_hand(&mut self, seat: usize, count: usize) -> bool {
        if seat == self.local_seat || seat >= self.seats() {
            return false;
        }
        if self.hands[seat] == (Hand::Hidden { count }) {
            return false;
        }
        self.hands[seat] = Hand::Hidden { count };
        if count == 0 && !self.finished {
            self.finish(seat);
        }
        true
    }

    /// Adopts the version a confirmed table write landed at. The content
    /// is already local (it was the prediction).
    pub fn confirm_table(&mut self, version: u64) {
        self.table_version = self.table_version.max(version);
    }

    /// Adopts the version a confirmed turn write landed at.
    pub fn confirm_turns(&mut self, version: u64) {
        self.turn_version = self.turn_version.max(version);
    }

    // -- Internals ---------------------------------------------------------

    fn ensure_local_turn(&self) -> Result<(), GameError> {
        if self.finished {
            return Err(GameError::Finished);
        }
        if !self.is_local_turn() {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn card_at(&self, index: usize) -> Result<Card, GameError> {
        self.local_hand()
            .get(index)
            .copied()
            .ok_or(GameError::NoSuchCard(index))
    }

    fn local_hand_mut(&mut self) -> &mut Vec<Card> {
        match &mut self.hands[self.local_seat] {
            Hand::Visible(cards) => cards,
            Hand::Hidden { .. } => unreachable!("local hand is always visible"),
        }
    }

    /// Flips the turn vector to the next seat and notes the hand-off.
    /// `steps` is 0 only for the two-player Reverse self-repeat.
    fn advance_local(&mut self, steps: u32) {
        self.turn_vector = self.turn_vector.advanced(self.table.direction, steps);
        debug_assert!(self.turn_vector.is_valid());
    }

    fn finish(&mut self, winner_seat: usize) {
        self.finished = true;
        self.winner = Some(winner_seat);
        tracing::info!(
            game = %self.game_id,
            winner = %self.seat_order[winner_seat],
            "game finished"
        );
    }
}

// =========================================================================
// Tests — focused unit checks; full scenarios live in tests/game_flow.rs
// =========================================================================
