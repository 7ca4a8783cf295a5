use tether_core::{Channel, PeerId, RoomId, SignalEnvelope};

use crate::integration::{init_tracing, start_relay};
use crate::utils::WsTestClient;

async fn joined(addr: std::net::SocketAddr, room: &str, user: &str) -> WsTestClient {
    let mut client = WsTestClient::connect(addr, room, user).await.unwrap();
    client.recv_frame().await.unwrap();
    client
}

#[tokio::test]
async fn test_forwarding_rules() {
    init_tracing();

    let (addr, _hub) = start_relay().await;
    let mut a = joined(addr, "R1", "A").await;
    let mut b = joined(addr, "R1", "B").await;
    let mut c = joined(addr, "R1", "C").await;
    let mut other_room = joined(addr, "R2", "D").await;

    // Broadcast: everyone in the room except the sender.
    let join = SignalEnvelope::new(PeerId::from("C"), Channel::Data.join_token())
        .with_channel(Channel::Data)
        .with_room(RoomId::from("R1"));
    c.send_envelope(&join).await.unwrap();

    assert_eq!(a.recv_envelope().await.unwrap(), join);
    assert_eq!(b.recv_envelope().await.unwrap(), join);
    assert!(c.is_quiet(100).await, "Sender must not get its own broadcast");
    assert!(other_room.is_quiet(50).await);

    // Targeted: only the addressee.
    let offer = SignalEnvelope::new(PeerId::from("A"), "b2ZmZXI=")
        .with_channel(Channel::Data)
        .with_to(PeerId::from("C"))
        .with_room(RoomId::from("R1"));
    a.send_envelope(&offer).await.unwrap();

    assert_eq!(c.recv_envelope().await.unwrap(), offer);
    assert!(b.is_quiet(100).await);
}
