use tether_client::ClientConfig;
use tether_client::relay::RelayEvent;
use tether_core::{Channel, PeerId};

use crate::integration::{create_test_peer, init_tracing};
use crate::utils::{STEP_TIMEOUT_MS, envelope_from, sync_router};

#[tokio::test]
async fn test_plain_payload_fallback() {
    init_tracing();

    let peer = create_test_peer(ClientConfig::new("R1", "A"));
    let b = PeerId::from("B");

    // Plain chat text, valid base64 that is not JSON, and JSON of the wrong shape.
    let payloads = ["hello there", "aGVsbG8=", r#"{"type":"bye"}"#];
    for payload in payloads {
        peer.client
            .handle_relay_event(RelayEvent::Envelope(envelope_from("B", None, payload)))
            .unwrap();
    }

    assert!(
        peer.behavior
            .wait_for_events(payloads.len(), STEP_TIMEOUT_MS)
            .await,
        "Every undecodable payload should reach on_message"
    );
    assert_eq!(peer.behavior.messages_from(&b).await, payloads);
    assert!(peer.client.peers().is_empty());

    // An envelope tagged for the other flow is not ours to surface.
    let mut media = envelope_from("B", None, "not for the data flow");
    media.channel = Some(Channel::Media);
    peer.client
        .handle_relay_event(RelayEvent::Envelope(media))
        .unwrap();
    sync_router(&peer.client).await;
    assert_eq!(peer.behavior.messages_from(&b).await.len(), payloads.len());

    peer.client.shutdown();
}
