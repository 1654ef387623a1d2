//! The per-client play phase.
//!
//! The phase tracks where the local client is in its own act-commit
//! cycle. It is not shared state: each client runs its own phase machine,
//! and only the resulting table/turn writes travel through the store.

use serde::{Deserialize, Serialize};

/// Where the local client is in its play cycle.
///
/// ```text
/// Idle ──select──→ Previewed ──re-select──→ Committing ──→ Resolving
///   ↑                  │                         │             │
///   │                  └──select other───→ Previewed           │
///   └──────────────────────(settled)───────────────────────────┤
///                                                              ▼
///                                                   AwaitingColorChoice
/// ```
///
/// `Finished` is terminal. The turn timer pauses in every phase except
/// `Idle` — a player mid-commit must not be timed out under their play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayPhase {
    /// No pending action.
    Idle,
    /// A candidate card is selected but not committed; re-selecting the
    /// same card commits it.
    Previewed { index: usize },
    /// The conditional write is in flight.
    Committing,
    /// Remote effects are being applied (turn advance, penalty accrual).
    Resolving,
    /// A wild needs its color chosen before the turn can move on.
    AwaitingColorChoice,
    /// The game is over.
    Finished,
}

impl PlayPhase {
    /// Whether a card may currently be selected.
    pub fn can_select(&self) -> bool {
        matches!(self, PlayPhase::Idle | PlayPhase::Previewed { .. })
    }

    /// Whether the turn timer must hold its countdown.
    pub fn pauses_timer(&self) -> bool {
        matches!(
            self,
            PlayPhase::Previewed { .. }
                | PlayPhase::Committing
                | PlayPhase::Resolving
                | PlayPhase::AwaitingColorChoice
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_select_only_when_idle_or_previewed() {
        assert!(PlayPhase::Idle.can_select());
        assert!(PlayPhase::Previewed { index: 2 }.can_select());
        assert!(!PlayPhase::Committing.can_select());
        assert!(!PlayPhase::Resolving.can_select());
        assert!(!PlayPhase::AwaitingColorChoice.can_select());
        assert!(!PlayPhase::Finished.can_select());
    }

    #[test]
    fn test_timer_pauses_in_busy_phases() {
        assert!(!PlayPhase::Idle.pauses_timer());
        assert!(PlayPhase::Previewed { index: 0 }.pauses_timer());
        assert!(PlayPhase::Committing.pauses_timer());
        assert!(PlayPhase::Resolving.pauses_timer());
        assert!(PlayPhase::AwaitingColorChoice.pauses_timer());
        assert!(!PlayPhase::Finished.pauses_timer());
    }
}
