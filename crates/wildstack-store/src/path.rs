//! Store paths.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A location in the shared store.
///
/// Paths are plain slash-separated strings. The helpers below pin down the
/// persisted layout:
///
/// ```text
/// lobby/{code}                  → the room document
/// game/{code}/table             → discard top, pending chain, direction
/// game/{code}/turns             → the turn vector
/// game/{code}/hands/{player}    → one player's hand
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(String);

impl Path {
    /// An arbitrary path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The room document for a join code.
    pub fn lobby(code: &str) -> Self {
        Self(format!("lobby/{code}"))
    }

    /// The table document (discard top, chain, direction) for a game.
    pub fn table(code: &str) -> Self {
        Self(format!("game/{code}/table"))
    }

    /// The turn vector for a game.
    pub fn turns(code: &str) -> Self {
        Self(format!("game/{code}/turns"))
    }

    /// One player's hand. Written only by that player's client.
    pub fn hand(code: &str, player: &str) -> Self {
        Self(format!("game/{code}/hands/{player}"))
    }

    /// The raw path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
