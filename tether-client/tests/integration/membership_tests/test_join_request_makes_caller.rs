use tether_client::relay::RelayEvent;
use tether_client::{ClientConfig, RoomRole, SessionState};
use tether_core::{Channel, NegotiationMessage, PeerId};

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{
    STEP_TIMEOUT_MS, envelope_from, join_request_from, mock_offer, sync_router,
    wait_for_session_state,
};

#[tokio::test]
async fn test_join_request_makes_caller() {
    init_tracing();

    let peer = create_test_peer(ClientConfig::new("R1", "A").with_role(RoomRole::Master));
    let a = PeerId::from("A");
    let b = PeerId::from("B");

    peer.client.handle_relay_event(join_request_from("B")).unwrap();

    let offer = peer
        .relay
        .wait_for_negotiation(
            &b,
            |m| matches!(m, NegotiationMessage::Offer { .. }),
            STEP_TIMEOUT_MS,
        )
        .await
        .expect("Existing participant should call the joiner");
    assert_eq!(
        offer,
        NegotiationMessage::Offer {
            sdp: mock_offer(&a, &b)
        }
    );
    assert!(wait_for_session_state(&peer.client, &b, SessionState::HaveLocalOffer, STEP_TIMEOUT_MS).await);

    // A repeated join request does not spawn a second link.
    peer.client.handle_relay_event(join_request_from("B")).unwrap();
    sync_router(&peer.client).await;
    assert_eq!(peer.links.created().await, 1);
    assert!(peer.behavior.join_requests().await.is_empty());

    // The media flow's token means nothing to a data-flow client.
    peer.client
        .handle_relay_event(RelayEvent::Envelope(envelope_from(
            "C",
            None,
            Channel::Media.join_token(),
        )))
        .unwrap();
    sync_router(&peer.client).await;
    assert_eq!(peer.client.peers(), vec![b]);

    peer.client.shutdown();
}
