//! Card model for Wildstack.
//!
//! This crate is the leaf of the workspace: the immutable card value type,
//! the legality rules for playing a card onto the discard top (including
//! the stacked draw-penalty chains), and the shuffling law used for every
//! deal and penalty draw.
//!
//! # Key types
//!
//! - [`Card`] — an immutable card value (color + face)
//! - [`Color`], [`Face`], [`Special`] — the card's components
//! - [`PendingChain`] — an unresolved stacked draw penalty
//! - [`random_card`] — the shared shuffling law
//!
//! # No deck
//!
//! There is deliberately no finite, depleting deck: cards are generated on
//! demand by [`random_card`], for initial deals and penalty draws alike.
//! Deck exhaustion and card counting are out of the game's model.

mod card;
mod chain;
mod random;

pub use card::{Card, Color, Face, Special};
pub use chain::PendingChain;
pub use random::{deal, first_discard, random_card};
