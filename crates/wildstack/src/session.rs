//! The per-client session object.

use std::sync::Arc;

use wildstack_lobby::{LobbyClient, PlayerId};
use wildstack_store::VersionedStore;

/// Who this client is and which store it talks to.
///
/// Resolved once at startup and threaded through every lobby and game
/// operation — there are no process-wide singletons to reach for.
#[derive(Debug)]
pub struct SessionContext<S> {
    /// The stable identity every write is attributed to.
    pub player_id: PlayerId,
    /// The name other players see.
    pub display_name: String,
    /// The shared store all clients reconcile through.
    pub store: Arc<S>,
}

impl<S> Clone for SessionContext<S> {
    fn clone(&self) -> Self {
        Self {
            player_id: self.player_id.clone(),
            display_name: self.display_name.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: VersionedStore> SessionContext<S> {
    pub fn new(
        player_id: PlayerId,
        display_name: impl Into<String>,
        store: Arc<S>,
    ) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            store,
        }
    }

    /// A lobby client over this session's store.
    pub fn lobby(&self) -> LobbyClient<S> {
        LobbyClient::new(Arc::clone(&self.store))
    }
}
