use tether_client::link::LinkEvent;
use tether_client::{ClientConfig, SessionState};
use tether_core::{NegotiationMessage, PeerId};

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{
    LinkCall, STEP_TIMEOUT_MS, candidate, mock_offer, wait_for_session_state,
};

#[tokio::test]
async fn test_caller_flow() {
    init_tracing();

    let peer = create_test_peer(ClientConfig::new("R1", "A"));
    let a = PeerId::from("A");
    let b = PeerId::from("B");

    peer.client.start_call("B").unwrap();

    let offer = peer
        .relay
        .wait_for_negotiation(
            &b,
            |m| matches!(m, NegotiationMessage::Offer { .. }),
            STEP_TIMEOUT_MS,
        )
        .await
        .expect("Caller should send an offer");
    assert_eq!(
        offer,
        NegotiationMessage::Offer {
            sdp: mock_offer(&a, &b)
        }
    );

    let link = peer.links.wait_for_link(&b, 1, STEP_TIMEOUT_MS).await.unwrap();
    assert_eq!(
        link.calls().await,
        vec![
            LinkCall::CreateDataChannel("chat".into()),
            LinkCall::CreateOffer,
            LinkCall::SetLocal(mock_offer(&a, &b)),
        ]
    );
    assert!(wait_for_session_state(&peer.client, &b, SessionState::HaveLocalOffer, STEP_TIMEOUT_MS).await);

    // Calling again reuses the session.
    peer.client.start_call("B").unwrap();

    // Local candidates trickle out to the peer.
    link.inject(LinkEvent::LocalCandidate(candidate(7))).await;
    let forwarded = peer
        .relay
        .wait_for_negotiation(
            &b,
            |m| matches!(m, NegotiationMessage::Candidate { .. }),
            STEP_TIMEOUT_MS,
        )
        .await
        .expect("Local candidate should be forwarded");
    assert_eq!(forwarded, NegotiationMessage::Candidate { sdp: candidate(7) });
    assert_eq!(peer.links.created().await, 1);

    // Broadcast text goes out on the open data channel.
    link.inject(LinkEvent::ChannelOpen("chat".into())).await;
    assert!(peer.behavior.wait_for_channel(&b, STEP_TIMEOUT_MS).await);
    peer.client.send_broadcast_message("hello").unwrap();

    let sent = LinkCall::SendText {
        label: "chat".into(),
        text: "hello".into(),
    };
    assert!(link.wait_for_call(&sent, STEP_TIMEOUT_MS).await);
    assert_eq!(
        link.count(|c| matches!(c, LinkCall::SendText { .. })).await,
        1
    );

    // Inbound data-channel traffic surfaces as a message from the peer.
    link.inject(LinkEvent::Message {
        label: "chat".into(),
        data: bytes::Bytes::from_static(b"hi A"),
    })
    .await;
    assert!(peer.behavior.wait_for_events(2, STEP_TIMEOUT_MS).await);
    assert_eq!(peer.behavior.messages_from(&b).await, vec!["hi A"]);

    peer.client.shutdown();
}
