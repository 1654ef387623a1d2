//! The card value type and play-legality rules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PendingChain;

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// The color of a card.
///
/// `Wild` is only ever carried by an unresolved `DrawFour`/`ChangeColor`
/// card; once the acting player chooses a color, the card is rebound via
/// [`Card::with_color`] and the wild color disappears from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
    Green,
    Blue,
    Wild,
}

impl Color {
    /// The four colors a non-wild card can carry — also the only colors
    /// that may be chosen when resolving a wild.
    pub const CHOOSABLE: [Color; 4] =
        [Color::Red, Color::Yellow, Color::Green, Color::Blue];

    /// Returns `true` for the unresolved wild color.
    pub fn is_wild(self) -> bool {
        matches!(self, Color::Wild)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Blue => "blue",
            Color::Wild => "wild",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Special
// ---------------------------------------------------------------------------

/// The special kinds a non-numbered card can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Special {
    /// The next player draws two (stackable).
    DrawTwo,
    /// The next player draws four; the acting player picks a new color
    /// (stackable).
    DrawFour,
    /// Flips the turn direction.
    Reverse,
    /// The acting player picks a new color.
    ChangeColor,
}

impl Special {
    /// All special kinds, for uniform sampling.
    pub const ALL: [Special; 4] = [
        Special::DrawTwo,
        Special::DrawFour,
        Special::Reverse,
        Special::ChangeColor,
    ];

    /// Wild-acting specials carry `Color::Wild` until resolved and are
    /// always legal to play outside a pending chain.
    pub fn is_wild_acting(self) -> bool {
        matches!(self, Special::DrawFour | Special::ChangeColor)
    }
}

impl fmt::Display for Special {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Special::DrawTwo => "+2",
            Special::DrawFour => "+4",
            Special::Reverse => "reverse",
            Special::ChangeColor => "color",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Face
// ---------------------------------------------------------------------------

/// What is printed on a card: a rank or a special kind, never both.
///
/// Modeling this as a sum type (instead of two optional fields) makes the
/// "rank and special are mutually exclusive" invariant unrepresentable as
/// a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Face {
    /// A numbered card, rank 0–9.
    Number(u8),
    /// A special card.
    Special(Special),
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// An immutable playing card.
///
/// Cards are values, not identities: two cards with the same color and face
/// are interchangeable everywhere (hand removal picks by index, not by
/// reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    /// The card's bound color. `Wild` only while a `DrawFour`/`ChangeColor`
    /// is unresolved.
    pub color: Color,
    /// Rank or special kind.
    pub face: Face,
}

impl Card {
    /// A numbered card. `rank` must be 0–9 and `color` non-wild.
    pub fn number(color: Color, rank: u8) -> Self {
        debug_assert!(rank <= 9, "rank must be 0-9, got {rank}");
        debug_assert!(!color.is_wild(), "numbered cards are never wild");
        Self {
            color,
            face: Face::Number(rank),
        }
    }

    /// A colored special (`DrawTwo` or `Reverse`).
    pub fn colored_special(kind: Special, color: Color) -> Self {
        debug_assert!(
            !kind.is_wild_acting(),
            "{kind} carries the wild color until resolved"
        );
        debug_assert!(!color.is_wild());
        Self {
            color,
            face: Face::Special(kind),
        }
    }

    /// A wild-acting special (`DrawFour` or `ChangeColor`), created with
    /// `Color::Wild` until the acting player resolves it.
    pub fn wild(kind: Special) -> Self {
        debug_assert!(kind.is_wild_acting(), "{kind} is not wild-acting");
        Self {
            color: Color::Wild,
            face: Face::Special(kind),
        }
    }

    /// Rebinds the card's color (used when resolving a wild).
    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    /// The card's rank, if numbered.
    pub fn rank(&self) -> Option<u8> {
        match self.face {
            Face::Number(r) => Some(r),
            Face::Special(_) => None,
        }
    }

    /// The card's special kind, if any.
    pub fn special(&self) -> Option<Special> {
        match self.face {
            Face::Number(_) => None,
            Face::Special(s) => Some(s),
        }
    }

    /// Whether the card acts as a wild (`DrawFour` or `ChangeColor`).
    pub fn is_wild_acting(&self) -> bool {
        self.special().is_some_and(Special::is_wild_acting)
    }

    /// Whether this card may legally be played onto `top` given the
    /// pending draw chain.
    ///
    /// Under a pending chain only chain-extending cards are legal:
    ///
    /// - a `DrawFour` chain accepts another `DrawFour`, or a `DrawTwo`
    ///   whose color matches the current discard top (color-matching
    ///   stack-up);
    /// - a `DrawTwo` chain accepts only another `DrawTwo`.
    ///
    /// Outside a chain, wild-acting cards are always legal; otherwise
    /// legality requires same color, same special kind, or same rank as
    /// `top`.
    pub fn is_playable(&self, top: &Card, chain: &PendingChain) -> bool {
        match chain {
            PendingChain::DrawFour { .. } => match self.special() {
                Some(Special::DrawFour) => true,
                Some(Special::DrawTwo) => self.color == top.color,
                _ => false,
            },
            PendingChain::DrawTwo { .. } => {
                self.special() == Some(Special::DrawTwo)
            }
            PendingChain::None => {
                if self.is_wild_acting() {
                    return true;
                }
                self.color == top.color
                    || match (self.face, top.face) {
                        (Face::Number(a), Face::Number(b)) => a == b,
                        (Face::Special(a), Face::Special(b)) => a == b,
                        _ => false,
                    }
            }
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.face {
            Face::Number(r) => write!(f, "{} {r}", self.color),
            Face::Special(s) => write!(f, "{} {s}", self.color),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
