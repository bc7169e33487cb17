//! Controller role: drives the arm by sending joint commands

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use webrtc::peer_connection::RTCPeerConnection;

use super::peer::{build_peer, perform_handshake, ConnectionState};
use crate::channel::{DataChannelSession, RtcChannelTransport, CONTROL_CHANNEL_LABEL};
use crate::command::JointCommand;
use crate::config::SessionConfig;
use crate::error::{AppError, Result};
use crate::signaling::{ClientRole, SignalingClient};

/// A connected controller session.
///
/// Owns one control channel; commands are accepted only once the channel
/// reports open, which callers observe via `wait_channel_open`.
pub struct ControllerSession {
    pc: Arc<RTCPeerConnection>,
    channel: Arc<DataChannelSession>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ControllerSession {
    /// Establish a controller session through the rendezvous.
    ///
    /// The control channel is created before the offer is generated, since
    /// channel existence affects the offer's contents. A signaling failure
    /// tears the half-built peer down - no partial session survives.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let (pc, state_rx) = build_peer(&config).await?;

        let dc = pc
            .create_data_channel(CONTROL_CHANNEL_LABEL, None)
            .await
            .map_err(|e| AppError::WebRtc(format!("failed to create data channel: {}", e)))?;
        let channel = Arc::new(DataChannelSession::new(
            CONTROL_CHANNEL_LABEL,
            Arc::new(RtcChannelTransport::new(dc.clone())),
        ));
        DataChannelSession::bind(&channel, &dc);
        channel.set_observer(|reply| info!("Control reply: {}", reply));

        let signaling = SignalingClient::with_timeout(
            config.server_url.as_str(),
            Duration::from_secs(config.signaling_timeout_secs),
        )?;
        if let Err(e) =
            perform_handshake(&pc, &signaling, ClientRole::Controller, &config, None).await
        {
            let _ = pc.close().await;
            return Err(e);
        }

        Ok(Self {
            pc,
            channel,
            state_rx,
        })
    }

    /// Wait until the control channel reports open
    pub async fn wait_channel_open(&self) -> Result<()> {
        self.channel.wait_open().await
    }

    /// Send one joint command; fails fast unless the channel is open
    pub async fn send(&self, command: &JointCommand) -> Result<()> {
        self.channel.send(command).await
    }

    /// The underlying control channel
    pub fn channel(&self) -> &Arc<DataChannelSession> {
        &self.channel
    }

    /// Current peer connection state
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Tear down the channel and the peer connection
    pub async fn close(&self) -> Result<()> {
        let _ = self.channel.close().await;
        self.pc
            .close()
            .await
            .map_err(|e| AppError::WebRtc(format!("failed to close peer connection: {}", e)))
    }
}
