use crate::config::TransportConfig;
use crate::error::Result;
use crate::transport::{
    CaptureStream, LinkId, MediaTransport, TransportEvent, TransportLink, TransportState,
};
use async_trait::async_trait;
use std::sync::Arc;
use tandem_core::{ParticipantId, SdpKind, SessionDescription};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{API, APIBuilder};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_remote::TrackRemote;

/// [`MediaTransport`] backed by `webrtc` peer connections.
pub struct WebRtcTransport {
    api: API,
    config: TransportConfig,
}

impl WebRtcTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media)?;

        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();

        Ok(Self { api, config })
    }

    fn rtc_configuration(&self) -> RTCConfiguration {
        RTCConfiguration {
            ice_servers: self
                .config
                .ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl MediaTransport for WebRtcTransport {
    async fn create_link(
        &self,
        peer_id: &ParticipantId,
        link_id: LinkId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportLink>> {
        let peer_connection = Arc::new(
            self.api
                .new_peer_connection(self.rtc_configuration())
                .await?,
        );

        // Callbacks must be 'static, so each gets its own clones. They never
        // wait on the channel: close() runs the state handler inline while
        // the only consumer may be the caller of close().
        let state_tx = events.clone();
        let state_peer = peer_id.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                info!("Peer connection {} with {} is {}", link_id, state_peer, s);
                if let Some(state) = transport_state(s) {
                    forward(
                        &state_tx,
                        TransportEvent::StateChanged {
                            peer_id: state_peer.clone(),
                            link_id,
                            state,
                        },
                    );
                }
                Box::pin(async {})
            },
        ));

        let ice_tx = events.clone();
        let ice_peer = peer_id.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let candidate = c
                .and_then(|candidate| candidate.to_json().ok())
                .and_then(|init| serde_json::to_string(&init).ok());
            if let Some(candidate) = candidate {
                forward(
                    &ice_tx,
                    TransportEvent::CandidateGenerated {
                        peer_id: ice_peer.clone(),
                        link_id,
                        candidate,
                    },
                );
            }
            Box::pin(async {})
        }));

        let track_tx = events;
        let track_peer = peer_id.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                debug!("Remote {} track from {}", track.kind(), track_peer);
                forward(
                    &track_tx,
                    TransportEvent::TrackArrived {
                        peer_id: track_peer.clone(),
                        link_id,
                        track_id: track.id(),
                    },
                );
                Box::pin(async {})
            },
        ));

        Ok(Box::new(WebRtcLink {
            peer_id: peer_id.clone(),
            link_id,
            peer_connection,
        }))
    }
}

fn forward(tx: &mpsc::Sender<TransportEvent>, event: TransportEvent) {
    match tx.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            warn!(
                "Transport event buffer full; dropping event from {} to {}",
                event.link_id(),
                event.peer_id()
            );
        }
        // The coordinator has gone; nobody is listening.
        Err(TrySendError::Closed(_)) => {}
    }
}

fn transport_state(state: RTCPeerConnectionState) -> Option<TransportState> {
    match state {
        RTCPeerConnectionState::New => Some(TransportState::New),
        RTCPeerConnectionState::Connecting => Some(TransportState::Connecting),
        RTCPeerConnectionState::Connected => Some(TransportState::Connected),
        RTCPeerConnectionState::Disconnected => Some(TransportState::Disconnected),
        RTCPeerConnectionState::Failed => Some(TransportState::Failed),
        RTCPeerConnectionState::Closed => Some(TransportState::Closed),
        RTCPeerConnectionState::Unspecified => None,
    }
}

fn rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
    let desc = match description.kind {
        SdpKind::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpKind::Answer => RTCSessionDescription::answer(description.sdp)?,
    };
    Ok(desc)
}

struct WebRtcLink {
    peer_id: ParticipantId,
    link_id: LinkId,
    peer_connection: Arc<RTCPeerConnection>,
}

#[async_trait]
impl TransportLink for WebRtcLink {
    async fn attach_local_stream(&self, stream: &CaptureStream) -> Result<()> {
        for track in stream.tracks() {
            self.peer_connection.add_track(Arc::clone(track)).await?;
        }
        debug!(
            "Attached {} ({} tracks) to {}",
            stream.id(),
            stream.tracks().len(),
            self.link_id
        );
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_local_description(rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.peer_connection
            .set_remote_description(rtc_description(description)?)
            .await?;
        Ok(())
    }

    async fn add_remote_candidate(&self, candidate: String) -> Result<()> {
        let candidate: RTCIceCandidateInit = serde_json::from_str(&candidate)?;
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    fn is_stable(&self) -> bool {
        self.peer_connection.signaling_state() == RTCSignalingState::Stable
    }

    async fn close(&self) -> Result<()> {
        debug!("Closing {} to {}", self.link_id, self.peer_id);
        self.peer_connection.close().await?;
        Ok(())
    }
}
