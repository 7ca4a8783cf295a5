use axum::extract::ws::Message;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tether_core::{PeerId, RoomId, SignalEnvelope, StatusFrame};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

struct Member {
    conn_id: u64,
    tx: mpsc::UnboundedSender<Message>,
}

struct HubInner {
    rooms: DashMap<RoomId, DashMap<PeerId, Member>>,
    next_conn_id: AtomicU64,
}

/// Who is connected to which room, and the outbound queue of each socket.
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                rooms: DashMap::new(),
                next_conn_id: AtomicU64::new(1),
            }),
        }
    }

    /// Adds a socket to the room, replacing an older socket of the same user.
    /// Returns the connection id and the room size after joining.
    pub fn join(
        &self,
        room_id: &RoomId,
        user_id: PeerId,
        tx: mpsc::UnboundedSender<Message>,
    ) -> (u64, usize) {
        let conn_id = self.inner.next_conn_id.fetch_add(1, Ordering::Relaxed);
        let room = self.inner.rooms.entry(room_id.clone()).or_default();
        if room.insert(user_id.clone(), Member { conn_id, tx }).is_some() {
            warn!("{:?} reconnected to room {:?}; old socket replaced", user_id, room_id);
        }
        let count = room.len();
        info!("{:?} joined room {:?} ({} members)", user_id, room_id, count);
        (conn_id, count)
    }

    /// Removes the socket, and the room once empty. A newer socket of the same user stays.
    pub fn leave(&self, room_id: &RoomId, user_id: &PeerId, conn_id: u64) {
        if let Some(room) = self.inner.rooms.get(room_id) {
            room.remove_if(user_id, |_, member| member.conn_id == conn_id);
        }
        if self
            .inner
            .rooms
            .remove_if(room_id, |_, members| members.is_empty())
            .is_some()
        {
            info!("Room {:?} is empty and was removed", room_id);
        }
        info!("{:?} left room {:?}", user_id, room_id);
    }

    /// Delivers to `envelope.to` if set, otherwise to everyone in the room but the sender.
    /// Returns how many sockets it was queued for.
    pub fn forward(&self, room_id: &RoomId, sender: &PeerId, envelope: &SignalEnvelope) -> usize {
        let Some(room) = self.inner.rooms.get(room_id) else {
            warn!("Forward into unknown room {:?}", room_id);
            return 0;
        };
        let json = match serde_json::to_string(envelope) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize envelope: {}", e);
                return 0;
            }
        };

        match &envelope.to {
            Some(to) => match room.get(to) {
                Some(member) => usize::from(send_text(to, &member.tx, &json)),
                None => {
                    debug!("Target {:?} is not in room {:?}", to, room_id);
                    0
                }
            },
            None => room
                .iter()
                .filter(|m| m.key() != sender)
                .filter(|m| send_text(m.key(), &m.tx, &json))
                .count(),
        }
    }

    /// Sends a relay status frame to one member.
    pub fn send_status(&self, room_id: &RoomId, user_id: &PeerId, status: &StatusFrame) -> bool {
        let Some(room) = self.inner.rooms.get(room_id) else {
            return false;
        };
        let Some(member) = room.get(user_id) else {
            return false;
        };
        match serde_json::to_string(status) {
            Ok(json) => send_text(user_id, &member.tx, &json),
            Err(e) => {
                error!("Failed to serialize status frame: {}", e);
                false
            }
        }
    }

    pub fn members(&self, room_id: &RoomId) -> Vec<PeerId> {
        let mut members: Vec<PeerId> = self
            .inner
            .rooms
            .get(room_id)
            .map(|room| room.iter().map(|m| m.key().clone()).collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }
}

fn send_text(peer_id: &PeerId, tx: &mpsc::UnboundedSender<Message>, json: &str) -> bool {
    match tx.send(Message::Text(json.to_owned().into())) {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to queue WS message to {:?}: {:?}", peer_id, e);
            false
        }
    }
}
