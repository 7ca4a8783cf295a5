use async_trait::async_trait;
use std::sync::Arc;
use tether_client::link::{LinkState, RemoteStream};
use tether_client::{JoinApproval, MeshBehavior};
use tether_core::PeerId;
use tokio::sync::Mutex;

/// Everything the core reported to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshEvent {
    Message { from: PeerId, text: String },
    RemoteStream { from: PeerId, track_id: String },
    ConnectionState { peer_id: PeerId, state: LinkState },
    ChannelOpen { peer_id: PeerId, label: String },
    JoinRequest { peer_id: PeerId },
}

/// A MeshBehavior that records every callback. Join approvals are parked
/// until the test takes them.
#[derive(Clone, Default)]
pub struct TestMeshBehavior {
    events: Arc<Mutex<Vec<MeshEvent>>>,
    approvals: Arc<Mutex<Vec<JoinApproval>>>,
}

impl TestMeshBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_events(&self) -> Vec<MeshEvent> {
        self.events.lock().await.clone()
    }

    /// Wait for a specific number of events with timeout.
    pub async fn wait_for_events(&self, count: usize, timeout_ms: u64) -> bool {
        self.wait_until(timeout_ms, |events| events.len() >= count)
            .await
    }

    /// Polls until `check` holds for the recorded events.
    pub async fn wait_until<F>(&self, timeout_ms: u64, check: F) -> bool
    where
        F: Fn(&[MeshEvent]) -> bool,
    {
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(timeout_ms);

        loop {
            if check(&self.events.lock().await) {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_state(&self, peer_id: &PeerId, state: LinkState, timeout_ms: u64) -> bool {
        let expected = MeshEvent::ConnectionState {
            peer_id: peer_id.clone(),
            state,
        };
        self.wait_until(timeout_ms, |events| events.contains(&expected))
            .await
    }

    pub async fn wait_for_channel(&self, peer_id: &PeerId, timeout_ms: u64) -> bool {
        self.wait_until(timeout_ms, |events| {
            events
                .iter()
                .any(|e| matches!(e, MeshEvent::ChannelOpen { peer_id: id, .. } if id == peer_id))
        })
        .await
    }

    pub async fn messages_from(&self, peer_id: &PeerId) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                MeshEvent::Message { from, text } if from == peer_id => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn states_for(&self, peer_id: &PeerId) -> Vec<LinkState> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                MeshEvent::ConnectionState { peer_id: id, state } if id == peer_id => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub async fn join_requests(&self) -> Vec<PeerId> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                MeshEvent::JoinRequest { peer_id } => Some(peer_id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Removes and returns the parked approval for `peer_id`.
    pub async fn take_approval(&self, peer_id: &PeerId) -> Option<JoinApproval> {
        let mut approvals = self.approvals.lock().await;
        let index = approvals.iter().position(|a| a.peer_id() == peer_id)?;
        Some(approvals.remove(index))
    }
}

#[async_trait]
impl MeshBehavior for TestMeshBehavior {
    async fn on_message(&self, text: String, from: PeerId) {
        tracing::info!("[TestBehavior] on_message from {:?}: {}", from, text);
        self.events.lock().await.push(MeshEvent::Message { from, text });
    }

    async fn on_remote_stream(&self, stream: RemoteStream, from: PeerId) {
        tracing::info!("[TestBehavior] on_remote_stream from {:?}", from);
        self.events.lock().await.push(MeshEvent::RemoteStream {
            from,
            track_id: stream.track_id,
        });
    }

    async fn on_connection_state(&self, peer_id: PeerId, state: LinkState) {
        tracing::info!("[TestBehavior] on_connection_state {:?}: {:?}", peer_id, state);
        self.events
            .lock()
            .await
            .push(MeshEvent::ConnectionState { peer_id, state });
    }

    async fn on_channel_open(&self, peer_id: PeerId, label: String) {
        self.events
            .lock()
            .await
            .push(MeshEvent::ChannelOpen { peer_id, label });
    }

    async fn on_join_request(&self, peer_id: PeerId, approval: JoinApproval) {
        tracing::info!("[TestBehavior] on_join_request: {:?}", peer_id);
        self.events
            .lock()
            .await
            .push(MeshEvent::JoinRequest { peer_id });
        self.approvals.lock().await.push(approval);
    }
}
