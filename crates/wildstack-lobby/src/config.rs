//! The host's rule sliders.

use serde::{Deserialize, Serialize};

/// Per-room rule configuration, set by the host before the game starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Cards dealt to each player at start. 3–15.
    pub cards_per_player: u8,

    /// Chance (in percent) that a generated card is special. 0–100.
    pub special_card_percent: u8,

    /// Cards drawn on a voluntary draw or a chainless timeout. 1–6.
    pub max_draw_cards: u8,

    /// Seconds a turn may last before the timer forces a draw. 5–60.
    pub turn_duration_secs: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cards_per_player: 7,
            special_card_percent: 20,
            max_draw_cards: 2,
            turn_duration_secs: 10,
        }
    }
}

impl GameConfig {
    /// Clamps every field into its legal range, warning on each fixup.
    /// Out-of-range input can arrive from a stale or tampered document;
    /// it never aborts, it gets corrected.
    pub fn validated(mut self) -> Self {
        if !(3..=15).contains(&self.cards_per_player) {
            tracing::warn!(
                cards_per_player = self.cards_per_player,
                "cards_per_player out of range, clamping to 3..=15"
            );
            self.cards_per_player = self.cards_per_player.clamp(3, 15);
        }
        if self.special_card_percent > 100 {
            tracing::warn!(
                special_card_percent = self.special_card_percent,
                "special_card_percent above 100, clamping"
            );
            self.special_card_percent = 100;
        }
        if !(1..=6).contains(&self.max_draw_cards) {
            tracing::warn!(
                max_draw_cards = self.max_draw_cards,
                "max_draw_cards out of range, clamping to 1..=6"
            );
            self.max_draw_cards = self.max_draw_cards.clamp(1, 6);
        }
        if !(5..=60).contains(&self.turn_duration_secs) {
            tracing::warn!(
                turn_duration_secs = self.turn_duration_secs,
                "turn_duration_secs out of range, clamping to 5..=60"
            );
            self.turn_duration_secs = self.turn_duration_secs.clamp(5, 60);
        }
        self
    }
}
