use crate::RelayHub;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tether_core::{PeerId, RoomId, SignalEnvelope, StatusFrame};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_id, user_id)): Path<(String, String)>,
    State(hub): State<RelayHub>,
) -> impl IntoResponse {
    let room_id = RoomId::from(room_id);
    let user_id = PeerId::from(user_id);

    ws.on_upgrade(move |socket| handle_socket(socket, room_id, user_id, hub))
}

async fn handle_socket(socket: WebSocket, room_id: RoomId, user_id: PeerId, hub: RelayHub) {
    info!("New WebSocket connection: {:?} in room {:?}", user_id, room_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let (conn_id, member_count) = hub.join(&room_id, user_id.clone(), tx);
    hub.send_status(&room_id, &user_id, &StatusFrame::connected(member_count));

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let hub = hub.clone();
        let room_id = room_id.clone();
        let user_id = user_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<SignalEnvelope>(text.as_str()) {
                            Ok(envelope) => {
                                if envelope.from != user_id {
                                    debug!(
                                        "{:?} sent an envelope claiming to be from {:?}",
                                        user_id, envelope.from
                                    );
                                }
                                let delivered = hub.forward(&room_id, &user_id, &envelope);
                                debug!("Forwarded from {:?} to {} sockets", user_id, delivered);
                            }
                            Err(e) => warn!("Invalid envelope from {:?}: {:?}", user_id, e),
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    hub.leave(&room_id, &user_id, conn_id);
    info!("WebSocket disconnected: {:?}", user_id);
}
