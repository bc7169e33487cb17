//! Transport-facing seam for the control channel

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use webrtc::data_channel::RTCDataChannel;

use crate::error::{AppError, Result};

/// Narrow send/close surface the channel session drives.
///
/// Production wraps a WebRTC data channel; tests substitute a recording
/// mock so the readiness state machine can be exercised without an SCTP
/// association.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Push one encoded payload onto the wire
    async fn send_payload(&self, payload: Bytes) -> Result<()>;

    /// Request transport-level teardown
    async fn close_channel(&self) -> Result<()>;
}

/// Channel transport backed by a WebRTC data channel
pub struct RtcChannelTransport {
    channel: Arc<RTCDataChannel>,
}

impl RtcChannelTransport {
    pub fn new(channel: Arc<RTCDataChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ChannelTransport for RtcChannelTransport {
    async fn send_payload(&self, payload: Bytes) -> Result<()> {
        self.channel
            .send(&payload)
            .await
            .map(|_| ())
            .map_err(|e| AppError::WebRtc(format!("data channel send failed: {}", e)))
    }

    async fn close_channel(&self) -> Result<()> {
        self.channel
            .close()
            .await
            .map_err(|e| AppError::WebRtc(format!("data channel close failed: {}", e)))
    }
}
