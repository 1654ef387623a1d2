//! Error types for the store seam.

use crate::Path;

/// Errors that can occur against the shared store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The path holds no value.
    #[error("nothing stored at {0}")]
    NotFound(Path),

    /// A compare-and-swap lost a race: the path's version moved between
    /// the read and the write. `found` is the version now at the path
    /// (`None` if the path no longer / doesn't yet exist).
    #[error("version mismatch at {path}: found {found:?}")]
    VersionMismatch { path: Path, found: Option<u64> },

    /// A transaction kept losing the version race and ran out of its
    /// attempt budget.
    #[error("transaction at {path} contended after {attempts} attempts")]
    Contended { path: Path, attempts: u32 },

    /// The store cannot be reached (connectivity loss, closed backend).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value failed to (de)serialize.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
