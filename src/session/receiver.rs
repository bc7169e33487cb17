//! Receiver role: hands inbound joint commands to an application callback

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use webrtc::peer_connection::RTCPeerConnection;

use super::peer::{build_peer, perform_handshake, ConnectionState};
use crate::channel::{DataChannelSession, RtcChannelTransport, CONTROL_CHANNEL_LABEL};
use crate::command::JointCommand;
use crate::config::SessionConfig;
use crate::error::{AppError, Result};
use crate::signaling::{ClientRole, SignalingClient};

/// A connected receiver session.
///
/// Creates the control channel symmetrically with the controller and stays
/// idle; every decoded command is forwarded to the registered callback.
pub struct ReceiverSession {
    pc: Arc<RTCPeerConnection>,
    channel: Arc<DataChannelSession>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ReceiverSession {
    /// Establish a receiver session through the rendezvous.
    ///
    /// The command callback is registered before the handshake completes so
    /// an early message from the controller is never dropped.
    pub async fn connect<F>(config: SessionConfig, on_command: F) -> Result<Self>
    where
        F: Fn(JointCommand) + Send + Sync + 'static,
    {
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
        channel.set_observer(on_command);

        let transform = config
            .video_transform
            .clone()
            .or_else(|| Some("none".to_string()));
        let signaling = SignalingClient::with_timeout(
            config.server_url.as_str(),
            Duration::from_secs(config.signaling_timeout_secs),
        )?;
        if let Err(e) =
            perform_handshake(&pc, &signaling, ClientRole::Receiver, &config, transform).await
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
