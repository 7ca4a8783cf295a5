use tether_client::ClientConfig;
use tether_core::PeerId;

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{
    LinkCall, STEP_TIMEOUT_MS, candidate, candidate_from, mock_answer, mock_offer, offer_from,
    sync_router,
};

#[tokio::test]
async fn test_candidates_buffered_until_offer() {
    init_tracing();

    let peer = create_test_peer(ClientConfig::new("R1", "A"));
    let a = PeerId::from("A");
    let p = PeerId::from("P");
    let offer = mock_offer(&p, &a);

    for n in 1..=3 {
        peer.client
            .handle_relay_event(candidate_from("P", "A", &candidate(n)))
            .unwrap();
    }
    sync_router(&peer.client).await;
    assert_eq!(peer.client.pending_candidates(&p).await.unwrap(), 3);

    peer.client
        .handle_relay_event(offer_from("P", "A", &offer))
        .unwrap();

    let link = peer
        .links
        .wait_for_link(&p, 1, STEP_TIMEOUT_MS)
        .await
        .expect("Offer should create a link");
    assert!(link.wait_for_calls(6, STEP_TIMEOUT_MS).await);

    assert_eq!(
        link.calls().await,
        vec![
            LinkCall::SetRemote(offer),
            LinkCall::CreateAnswer,
            LinkCall::SetLocal(mock_answer(&a, &p)),
            LinkCall::AddCandidate(candidate(1)),
            LinkCall::AddCandidate(candidate(2)),
            LinkCall::AddCandidate(candidate(3)),
        ],
        "Buffered candidates go in once, in arrival order, after the remote description"
    );
    assert_eq!(peer.client.pending_candidates(&p).await.unwrap(), 0);

    // With the remote description in place, a late candidate is applied directly.
    peer.client
        .handle_relay_event(candidate_from("P", "A", &candidate(4)))
        .unwrap();
    assert!(link.wait_for_calls(7, STEP_TIMEOUT_MS).await);
    assert_eq!(
        link.calls().await.last(),
        Some(&LinkCall::AddCandidate(candidate(4)))
    );
    assert_eq!(
        link.count(|c| matches!(c, LinkCall::AddCandidate(_))).await,
        4,
        "No candidate may be replayed"
    );

    peer.client.shutdown();
}
