use crate::session::SessionHandle;
use dashmap::DashMap;
use std::sync::Arc;
use tether_core::PeerId;
use tracing::info;

/// The one authoritative `PeerId -> session` map. At most one live session per peer.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<PeerId, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing session untouched, or installs the one `spawn` builds.
    ///
    /// `spawn` runs only when no session exists. The flag reports whether it ran.
    pub fn get_or_create<F>(&self, peer_id: &PeerId, spawn: F) -> (Arc<SessionHandle>, bool)
    where
        F: FnOnce() -> SessionHandle,
    {
        if let Some(existing) = self.sessions.get(peer_id) {
            return (Arc::clone(existing.value()), false);
        }

        let mut created = false;
        let handle = self
            .sessions
            .entry(peer_id.clone())
            .or_insert_with(|| {
                created = true;
                info!("Creating session for {:?}", peer_id);
                Arc::new(spawn())
            })
            .clone();
        (handle, created)
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<Arc<SessionHandle>> {
        self.sessions.get(peer_id).map(|s| Arc::clone(s.value()))
    }

    pub fn remove(&self, peer_id: &PeerId) -> Option<Arc<SessionHandle>> {
        self.sessions.remove(peer_id).map(|(_, handle)| handle)
    }

    /// Removes the entry only if it still belongs to session `session_id`.
    pub fn remove_if_current(&self, peer_id: &PeerId, session_id: u64) -> bool {
        self.sessions
            .remove_if(peer_id, |_, handle| handle.id() == session_id)
            .is_some()
    }

    /// Empties the registry, handing back every session that was in it.
    pub fn drain(&self) -> Vec<Arc<SessionHandle>> {
        let peers: Vec<PeerId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        peers.iter().filter_map(|peer| self.remove(peer)).collect()
    }

    pub fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        peers.sort();
        peers
    }

    pub fn handles(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.iter().map(|e| Arc::clone(e.value())).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
