//! The pending draw-penalty chain.

use serde::{Deserialize, Serialize};

use crate::Special;

/// An unresolved stacked draw penalty.
///
/// Stacking keeps the accumulated count and the chain kind together in one
/// sum type, so "nonzero count with no kind" (and vice versa) cannot be
/// constructed. The kind decides which cards may extend the chain — see
/// [`Card::is_playable`](crate::Card::is_playable).
///
/// A `DrawTwo` played as a color-matching continuation of a `DrawFour`
/// chain adds its two cards but keeps the stronger `DrawFour` kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PendingChain {
    /// No penalty pending.
    #[default]
    None,
    /// A chain of stacked `DrawTwo`s.
    DrawTwo { count: u8 },
    /// A chain opened by a `DrawFour` (possibly continued by color-matched
    /// `DrawTwo`s).
    DrawFour { count: u8 },
}

impl PendingChain {
    /// Whether no penalty is pending.
    pub fn is_none(&self) -> bool {
        matches!(self, PendingChain::None)
    }

    /// The accumulated number of penalty cards (0 when no chain is open).
    pub fn count(&self) -> u8 {
        match self {
            PendingChain::None => 0,
            PendingChain::DrawTwo { count } | PendingChain::DrawFour { count } => {
                *count
            }
        }
    }

    /// The chain kind, if one is open.
    pub fn kind(&self) -> Option<Special> {
        match self {
            PendingChain::None => None,
            PendingChain::DrawTwo { .. } => Some(Special::DrawTwo),
            PendingChain::DrawFour { .. } => Some(Special::DrawFour),
        }
    }

    /// Stacks a `DrawTwo` onto the chain: +2 cards. An open `DrawFour`
    /// chain keeps its stronger kind.
    #[must_use]
    pub fn stack_draw_two(self) -> Self {
        match self {
            PendingChain::None => PendingChain::DrawTwo { count: 2 },
            PendingChain::DrawTwo { count } => {
                PendingChain::DrawTwo { count: count + 2 }
            }
            PendingChain::DrawFour { count } => {
                PendingChain::DrawFour { count: count + 2 }
            }
        }
    }

    /// Stacks a `DrawFour` onto the chain: +4 cards, kind becomes (or
    /// stays) `DrawFour`.
    #[must_use]
    pub fn stack_draw_four(self) -> Self {
        PendingChain::DrawFour {
            count: self.count() + 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_none() {
        let chain = PendingChain::default();
        assert!(chain.is_none());
        assert_eq!(chain.count(), 0);
        assert_eq!(chain.kind(), None);
    }

    #[test]
    fn test_stacking_draw_two_accumulates() {
        let chain = PendingChain::None.stack_draw_two().stack_draw_two();
        assert_eq!(chain, PendingChain::DrawTwo { count: 4 });
        assert_eq!(chain.kind(), Some(Special::DrawTwo));
    }

    #[test]
    fn test_stacking_draw_four_accumulates() {
        let chain = PendingChain::None
            .stack_draw_four()
            .stack_draw_four()
            .stack_draw_four();
        assert_eq!(chain, PendingChain::DrawFour { count: 12 });
    }

    #[test]
    fn test_draw_two_on_draw_four_keeps_stronger_kind() {
        let chain = PendingChain::None.stack_draw_four().stack_draw_two();
        assert_eq!(chain, PendingChain::DrawFour { count: 6 });
        assert_eq!(chain.kind(), Some(Special::DrawFour));
    }

    #[test]
    fn test_draw_four_upgrades_a_draw_two_chain() {
        let chain = PendingChain::None.stack_draw_two().stack_draw_four();
        assert_eq!(chain, PendingChain::DrawFour { count: 6 });
    }
}
