use crate::config::LinkConfig;
use crate::link::{LinkEvent, LinkFactory, LinkState, NegotiableLink, RemoteStream};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use tether_core::{IceCandidate, PeerId, SdpType, SessionDescription};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::track::track_local::TrackLocal;

type LocalTrack = Arc<dyn TrackLocal + Send + Sync>;

/// Builds [`WebRtcLink`]s and attaches the configured local tracks to each of them.
#[derive(Clone, Default)]
pub struct WebRtcLinkFactory {
    config: LinkConfig,
    local_tracks: Vec<LocalTrack>,
}

impl WebRtcLinkFactory {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            local_tracks: Vec::new(),
        }
    }

    /// Media flow: every link created afterwards sends this track.
    pub fn with_local_track(mut self, track: LocalTrack) -> Self {
        self.local_tracks.push(track);
        self
    }
}

#[async_trait]
impl LinkFactory for WebRtcLinkFactory {
    async fn create(
        &self,
        peer_id: PeerId,
        events: mpsc::Sender<LinkEvent>,
    ) -> Result<Arc<dyn NegotiableLink>> {
        let link = WebRtcLink::new(peer_id, &self.config, events).await?;
        for track in &self.local_tracks {
            link.peer_connection
                .add_track(Arc::clone(track))
                .await
                .context("Failed to add local track")?;
        }
        Ok(Arc::new(link))
    }
}

pub struct WebRtcLink {
    peer_id: PeerId,
    peer_connection: Arc<RTCPeerConnection>,
    channels: Arc<DashMap<String, Arc<RTCDataChannel>>>,
    events: mpsc::Sender<LinkEvent>,
}

impl WebRtcLink {
    /// Creates the peer connection and wires its callbacks into `events`.
    pub async fn new(
        peer_id: PeerId,
        config: &LinkConfig,
        events: mpsc::Sender<LinkEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );
        let channels = Arc::new(DashMap::new());

        let state_tx = events.clone();
        let uid_state = peer_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let uid = uid_state.clone();

                Box::pin(async move {
                    info!("Peer connection state for {}: {:?}", uid, s);
                    let state = match s {
                        RTCPeerConnectionState::New => LinkState::New,
                        RTCPeerConnectionState::Connecting => LinkState::Connecting,
                        RTCPeerConnectionState::Connected => LinkState::Connected,
                        RTCPeerConnectionState::Disconnected => LinkState::Disconnected,
                        RTCPeerConnectionState::Failed => LinkState::Failed,
                        RTCPeerConnectionState::Closed => LinkState::Closed,
                        _ => return,
                    };
                    let _ = tx.send(LinkEvent::StateChanged(state)).await;
                })
            },
        ));

        let ice_tx = events.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(LinkEvent::LocalCandidate(from_rtc_candidate(init)))
                    .await;
            })
        }));

        let dc_tx = events.clone();
        let dc_channels = Arc::clone(&channels);
        let uid_dc = peer_id.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let channels = Arc::clone(&dc_channels);
            let uid = uid_dc.clone();

            Box::pin(async move {
                debug!("Remote data channel '{}' announced by {}", dc.label(), uid);
                wire_data_channel(dc, channels, tx);
            })
        }));

        let track_tx = events.clone();
        peer_connection.on_track(Box::new(move |track, _receiver, _transceiver| {
            let tx = track_tx.clone();

            Box::pin(async move {
                let stream = RemoteStream {
                    stream_id: track.stream_id(),
                    track_id: track.id(),
                    kind: track.kind().into(),
                    track: Some(track),
                };
                let _ = tx.send(LinkEvent::RemoteStream(stream)).await;
            })
        }));

        Ok(Self {
            peer_id,
            peer_connection,
            channels,
            events,
        })
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }
}

#[async_trait]
impl NegotiableLink for WebRtcLink {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        from_rtc_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        from_rtc_description(answer)
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(to_rtc_description(desc)?)
            .await
            .context("Failed to set local description")?;
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(to_rtc_description(desc)?)
            .await
            .context("Failed to set remote description")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn create_data_channel(&self, label: &str) -> Result<()> {
        let dc = self
            .peer_connection
            .create_data_channel(label, None)
            .await
            .context("Failed to create data channel")?;
        wire_data_channel(dc, Arc::clone(&self.channels), self.events.clone());
        Ok(())
    }

    async fn send_text(&self, label: &str, text: &str) -> Result<()> {
        let dc = self
            .channels
            .get(label)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| anyhow!("data channel '{}' is not open", label))?;
        dc.send_text(text.to_owned())
            .await
            .context("Failed to send on data channel")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.channels.clear();
        self.peer_connection.close().await?;
        Ok(())
    }
}

/// A channel counts as usable only after `on_open`; it is registered then.
fn wire_data_channel(
    dc: Arc<RTCDataChannel>,
    channels: Arc<DashMap<String, Arc<RTCDataChannel>>>,
    tx: mpsc::Sender<LinkEvent>,
) {
    let label = dc.label().to_owned();

    let dc_open = Arc::clone(&dc);
    let open_tx = tx.clone();
    let open_channels = Arc::clone(&channels);
    let open_label = label.clone();
    dc.on_open(Box::new(move || {
        let tx = open_tx.clone();
        let channels = Arc::clone(&open_channels);
        let label = open_label.clone();
        let ready = Arc::clone(&dc_open);

        Box::pin(async move {
            channels.insert(label.clone(), ready);
            let _ = tx.send(LinkEvent::ChannelOpen(label)).await;
        })
    }));

    let msg_tx = tx.clone();
    let msg_label = label.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = msg_tx.clone();
        let label = msg_label.clone();

        Box::pin(async move {
            let data = Bytes::from(msg.data.to_vec());
            let _ = tx.send(LinkEvent::Message { label, data }).await;
        })
    }));

    let close_tx = tx;
    let close_channels = channels;
    dc.on_close(Box::new(move || {
        let tx = close_tx.clone();
        let channels = Arc::clone(&close_channels);
        let label = label.clone();

        Box::pin(async move {
            if channels.remove(&label).is_none() {
                warn!("Data channel '{}' closed before it opened", label);
            }
            let _ = tx.send(LinkEvent::ChannelClosed(label)).await;
        })
    }));
}

fn to_rtc_description(desc: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match desc.kind {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(desc.sdp)?,
        SdpType::Rollback => bail!("rollback descriptions are not supported"),
    };
    Ok(rtc)
}

fn from_rtc_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpType::Offer,
        RTCSdpType::Answer => SdpType::Answer,
        RTCSdpType::Pranswer => SdpType::Pranswer,
        RTCSdpType::Rollback => SdpType::Rollback,
        RTCSdpType::Unspecified => bail!("engine produced a description without a type"),
    };
    Ok(SessionDescription {
        kind,
        sdp: desc.sdp,
    })
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}
