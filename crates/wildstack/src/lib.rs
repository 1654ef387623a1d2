//! # Wildstack
//!
//! A multiplayer card-game engine where every client is a peer over a
//! shared versioned store. There is no game server: clients apply their
//! own moves optimistically, land them with compare-and-swap writes, and
//! fold each other's confirmed writes in through subscriptions.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wildstack::prelude::*;
//!
//! # async fn run() -> Result<(), WildstackError> {
//! let store = Arc::new(MemoryStore::new());
//! let session = SessionContext::new(PlayerId::new("uid-1"), "Alice", store);
//!
//! let room = session.lobby().create_room(session.player_id.clone(), "Alice", 4).await?;
//! // ... other players join via room.code ...
//! let (_room, start) = session.lobby().start_game(room.code, &session.player_id).await?;
//!
//! let engine = GameEngine::spawn(session, start).await?;
//! let snapshot = engine.snapshot().await?;
//! println!("you hold {} cards", snapshot.hand.len());
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod session;
mod snapshot;

pub use engine::{EngineHandle, GameEngine};
pub use error::WildstackError;
pub use session::SessionContext;
pub use snapshot::GameSnapshot;

/// The working set, re-exported.
pub mod prelude {
    pub use crate::{
        EngineHandle, GameEngine, GameSnapshot, SessionContext, WildstackError,
    };
    pub use wildstack_cards::{Card, Color, Face, PendingChain, Special};
    pub use wildstack_game::{
        Direction, DrawOutcome, GameError, PlayOutcome, PlayPhase,
    };
    pub use wildstack_lobby::{
        GameConfig, GameStart, LobbyClient, LobbyError, Player, PlayerId, Room,
        RoomCode, Seat,
    };
    pub use wildstack_store::{MemoryStore, StoreError, VersionedStore};
    pub use wildstack_sync::{SyncError, SyncStatus};
    pub use wildstack_timer::TimerConfig;
}
