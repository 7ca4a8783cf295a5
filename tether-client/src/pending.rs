use std::collections::HashMap;
use tether_core::{IceCandidate, PeerId};

/// Candidates kept per peer that has not offered yet; later ones are dropped.
pub const MAX_PENDING_PER_PEER: usize = 64;

/// Candidates that arrived for one peer before its remote description was set.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PendingCandidateQueue {
    candidates: Vec<IceCandidate>,
}

impl PendingCandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.candidates.push(candidate);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Consumes the queue, so it cannot be replayed twice.
    pub fn drain(self) -> Vec<IceCandidate> {
        self.candidates
    }
}

/// Per-peer buffers for peers that have no session yet.
#[derive(Debug, Default)]
pub struct PendingCandidateStore {
    queues: HashMap<PeerId, PendingCandidateQueue>,
}

impl PendingCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the peer's queue is full and the candidate was dropped.
    pub fn push(&mut self, peer_id: PeerId, candidate: IceCandidate) -> bool {
        let queue = self.queues.entry(peer_id).or_default();
        if queue.len() >= MAX_PENDING_PER_PEER {
            return false;
        }
        queue.push(candidate);
        true
    }

    /// Hands the whole queue over, leaving no entry behind.
    pub fn take(&mut self, peer_id: &PeerId) -> PendingCandidateQueue {
        self.queues.remove(peer_id).unwrap_or_default()
    }

    pub fn discard(&mut self, peer_id: &PeerId) {
        self.queues.remove(peer_id);
    }

    pub fn clear(&mut self) {
        self.queues.clear();
    }

    pub fn count(&self, peer_id: &PeerId) -> usize {
        self.queues.get(peer_id).map_or(0, PendingCandidateQueue::len)
    }

    pub fn peers(&self) -> impl Iterator<Item = &PeerId> {
        self.queues.keys()
    }
}
