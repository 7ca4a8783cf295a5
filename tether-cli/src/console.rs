use async_trait::async_trait;
use colored::*;
use std::collections::HashMap;
use std::sync::Arc;
use tether_client::link::{LinkState, RemoteStream};
use tether_client::{JoinApproval, MeshBehavior};
use tether_core::PeerId;
use tokio::sync::Mutex;

/// Prints mesh events to the terminal; join requests wait for `/accept`.
#[derive(Clone, Default)]
pub struct ConsoleBehavior {
    approvals: Arc<Mutex<HashMap<PeerId, JoinApproval>>>,
}

impl ConsoleBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Approves a parked join request. Returns `false` if nobody by that id is waiting.
    pub async fn accept(&self, peer_id: &PeerId) -> bool {
        match self.approvals.lock().await.remove(peer_id) {
            Some(approval) => {
                approval.approve();
                true
            }
            None => false,
        }
    }

    pub async fn waiting(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.approvals.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl MeshBehavior for ConsoleBehavior {
    async fn on_message(&self, text: String, from: PeerId) {
        println!("{} {}", format!("[{}]", from).cyan().bold(), text);
    }

    async fn on_remote_stream(&self, stream: RemoteStream, from: PeerId) {
        println!(
            "{}",
            format!("📺 {:?} track {} from {}", stream.kind, stream.track_id, from).magenta()
        );
    }

    async fn on_connection_state(&self, peer_id: PeerId, state: LinkState) {
        let line = format!("{} is {:?}", peer_id, state);
        match state {
            LinkState::Connected => println!("{}", format!("✅ {}", line).green()),
            LinkState::Failed | LinkState::Closed => println!("{}", format!("❌ {}", line).red()),
            _ => println!("{}", line.dimmed()),
        }
    }

    async fn on_channel_open(&self, peer_id: PeerId, label: String) {
        println!("{}", format!("💬 '{}' open with {}", label, peer_id).green());
    }

    async fn on_join_request(&self, peer_id: PeerId, approval: JoinApproval) {
        println!(
            "{}",
            format!("🔔 {} wants to join. Type /accept {} to let them in.", peer_id, peer_id)
                .yellow()
                .bold()
        );
        self.approvals.lock().await.insert(peer_id, approval);
    }
}
