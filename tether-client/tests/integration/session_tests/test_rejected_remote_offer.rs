use tether_client::{ClientConfig, SessionState, SignalingRole};
use tether_core::{NegotiationMessage, PeerId};

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{
    LinkCall, STEP_TIMEOUT_MS, answer_from, mock_answer, mock_offer, offer_from,
    wait_for_session_state,
};

#[tokio::test]
async fn test_rejected_remote_offer_keeps_caller_role() {
    init_tracing();

    let peer = create_test_peer(ClientConfig::new("R1", "A"));
    let a = PeerId::from("A");
    let b = PeerId::from("B");

    peer.client.start_call("B").unwrap();
    assert!(wait_for_session_state(&peer.client, &b, SessionState::HaveLocalOffer, STEP_TIMEOUT_MS).await);
    assert_eq!(peer.client.session_role(&b), Some(SignalingRole::Offerer));
    let link = peer.links.wait_for_link(&b, 1, STEP_TIMEOUT_MS).await.unwrap();

    // Both sides offered and the engine refuses the remote offer.
    peer.links.fail_remote_descriptions(true);
    let remote_offer = mock_offer(&b, &a);
    peer.client
        .handle_relay_event(offer_from("B", "A", &remote_offer))
        .unwrap();
    assert!(
        link.wait_for_call(&LinkCall::SetRemote(remote_offer), STEP_TIMEOUT_MS)
            .await
    );

    // The session answers the next input only after the failed offer is fully handled.
    peer.links.fail_remote_descriptions(false);
    peer.client
        .handle_relay_event(answer_from("B", "A", &mock_answer(&b, &a)))
        .unwrap();
    assert!(wait_for_session_state(&peer.client, &b, SessionState::Connected, STEP_TIMEOUT_MS).await);

    assert_eq!(peer.client.session_role(&b), Some(SignalingRole::Offerer));
    assert_eq!(link.count(|c| *c == LinkCall::CreateAnswer).await, 0);
    assert!(
        !peer
            .relay
            .negotiation_to(&b)
            .await
            .iter()
            .any(|m| matches!(m, NegotiationMessage::Answer { .. }))
    );

    peer.client.shutdown();
}
