//! WebRTC peer construction and the offer/answer handshake

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;

use crate::config::SessionConfig;
use crate::error::{AppError, Result};
use crate::signaling::{ClientRole, HandshakeRequest, SdpKind, SessionDescriptor, SignalingClient};

/// Peer connection lifecycle states observed from the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::New => write!(f, "new"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Failed => write!(f, "failed"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Build a peer connection with default codecs and interceptors, mirroring
/// its connection state into a watch channel
pub(crate) async fn build_peer(
    config: &SessionConfig,
) -> Result<(Arc<RTCPeerConnection>, watch::Receiver<ConnectionState>)> {
    let mut media_engine = MediaEngine::default();
    media_engine
        .register_default_codecs()
        .map_err(|e| AppError::WebRtc(format!("failed to register codecs: {}", e)))?;

    let mut registry = Registry::new();
    registry = register_default_interceptors(registry, &mut media_engine)
        .map_err(|e| AppError::WebRtc(format!("failed to register interceptors: {}", e)))?;

    let api = APIBuilder::new()
        .with_media_engine(media_engine)
        .with_interceptor_registry(registry)
        .build();

    let ice_servers = config
        .stun_servers
        .iter()
        .map(|url| RTCIceServer {
            urls: vec![url.clone()],
            ..Default::default()
        })
        .collect();

    let pc = api
        .new_peer_connection(RTCConfiguration {
            ice_servers,
            ..Default::default()
        })
        .await
        .map_err(|e| AppError::WebRtc(format!("failed to create peer connection: {}", e)))?;
    let pc = Arc::new(pc);

    let (state_tx, state_rx) = watch::channel(ConnectionState::New);
    pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
        let mapped = match s {
            RTCPeerConnectionState::New => Some(ConnectionState::New),
            RTCPeerConnectionState::Connecting => Some(ConnectionState::Connecting),
            RTCPeerConnectionState::Connected => Some(ConnectionState::Connected),
            RTCPeerConnectionState::Disconnected => Some(ConnectionState::Disconnected),
            RTCPeerConnectionState::Failed => Some(ConnectionState::Failed),
            RTCPeerConnectionState::Closed => Some(ConnectionState::Closed),
            _ => None,
        };
        if let Some(new_state) = mapped {
            info!("Peer connection state: {}", new_state);
            let _ = state_tx.send(new_state);
        }
        Box::pin(async {})
    }));

    Ok((pc, state_rx))
}

/// Generate the offer, exchange it through the rendezvous, and apply the
/// returned description.
///
/// The local description is set exactly once; there is no renegotiation.
/// Candidates ride in the offer SDP, so gathering completes before the
/// exchange - the rendezvous has no trickle path.
pub(crate) async fn perform_handshake(
    pc: &Arc<RTCPeerConnection>,
    signaling: &SignalingClient,
    role: ClientRole,
    config: &SessionConfig,
    video_transform: Option<String>,
) -> Result<()> {
    let offer = pc
        .create_offer(None)
        .await
        .map_err(|e| AppError::WebRtc(format!("create offer failed: {}", e)))?;

    let mut gather_complete = pc.gathering_complete_promise().await;
    pc.set_local_description(offer)
        .await
        .map_err(|e| AppError::WebRtc(format!("set local description failed: {}", e)))?;
    let _ = gather_complete.recv().await;

    let local = pc
        .local_description()
        .await
        .ok_or_else(|| AppError::WebRtc("local description missing after offer".to_string()))?;

    let request = HandshakeRequest {
        descriptor: descriptor_from_rtc(&local)?,
        client_type: role,
        robot_id: config.robot_id.clone(),
        video_transform,
    };

    let response = signaling.exchange(&request).await?;
    debug!("Applying remote {} description", response.descriptor.kind);

    // An unexpected descriptor kind is passed through untouched; the
    // transport rejects it below.
    let remote = descriptor_to_rtc(&response.descriptor)?;
    pc.set_remote_description(remote)
        .await
        .map_err(|e| AppError::WebRtc(format!("set remote description failed: {}", e)))?;

    info!(
        "Handshake complete for robot '{}' as {}",
        config.robot_id, role
    );
    Ok(())
}

fn descriptor_from_rtc(desc: &RTCSessionDescription) -> Result<SessionDescriptor> {
    let kind = match desc.sdp_type {
        RTCSdpType::Offer => SdpKind::Offer,
        RTCSdpType::Answer => SdpKind::Answer,
        other => {
            return Err(AppError::WebRtc(format!(
                "unsupported local sdp type: {}",
                other
            )))
        }
    };
    Ok(SessionDescriptor {
        sdp: desc.sdp.clone(),
        kind,
    })
}

fn descriptor_to_rtc(descriptor: &SessionDescriptor) -> Result<RTCSessionDescription> {
    match descriptor.kind {
        SdpKind::Offer => RTCSessionDescription::offer(descriptor.sdp.clone()),
        SdpKind::Answer => RTCSessionDescription::answer(descriptor.sdp.clone()),
    }
    .map_err(|e| AppError::WebRtc(format!("invalid session description: {}", e)))
}
