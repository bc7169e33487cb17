//! Streamer role: pushes live camera frames to the paired peer

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use webrtc::api::media_engine::MIME_TYPE_H264;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

use super::peer::{build_peer, perform_handshake, ConnectionState};
use crate::capture::{CaptureConfig, FrameSource, VIDEO_CLOCK_RATE};
use crate::config::SessionConfig;
use crate::error::{AppError, Result};
use crate::signaling::{ClientRole, SignalingClient};

/// A connected streamer session.
///
/// Attaches a frame source as an outbound media track instead of a data
/// channel. The feed task pulls frames until `close()` or a capture
/// failure; either way the device is released and the process survives.
pub struct StreamerSession {
    pc: Arc<RTCPeerConnection>,
    stop: watch::Sender<bool>,
    feed: Mutex<Option<JoinHandle<()>>>,
}

impl StreamerSession {
    /// Establish a streamer session through the rendezvous.
    ///
    /// The camera is opened and the track attached before the offer is
    /// generated so the video m-line is part of the negotiated session.
    pub async fn connect(config: SessionConfig, capture: CaptureConfig) -> Result<Self> {
        let (pc, state_rx) = build_peer(&config).await?;

        let source = FrameSource::open(capture.clone())?;

        let track = Arc::new(TrackLocalStaticSample::new(
            video_codec_capability(),
            "video0".to_string(),
            "telearm-stream".to_string(),
        ));
        pc.add_track(track.clone())
            .await
            .map_err(|e| AppError::WebRtc(format!("failed to add video track: {}", e)))?;

        let transform = config
            .video_transform
            .clone()
            .or_else(|| Some("none".to_string()));
        let signaling = SignalingClient::with_timeout(
            config.server_url.as_str(),
            Duration::from_secs(config.signaling_timeout_secs),
        )?;
        if let Err(e) =
            perform_handshake(&pc, &signaling, ClientRole::Streamer, &config, transform).await
        {
            // Dropping the source releases the camera with the session
            let _ = pc.close().await;
            return Err(e);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(feed_track(source, track, state_rx, stop_rx, capture.fps));

        Ok(Self {
            pc,
            stop: stop_tx,
            feed: Mutex::new(Some(handle)),
        })
    }

    /// Stop the camera feed and tear down the peer connection
    pub async fn close(&self) -> Result<()> {
        let _ = self.stop.send(true);
        if let Some(handle) = self.feed.lock().await.take() {
            let _ = handle.await;
        }
        self.pc
            .close()
            .await
            .map_err(|e| AppError::WebRtc(format!("failed to close peer connection: {}", e)))
    }
}

/// H.264 capability matching the negotiated video m-line
fn video_codec_capability() -> RTCRtpCodecCapability {
    RTCRtpCodecCapability {
        mime_type: MIME_TYPE_H264.to_string(),
        clock_rate: VIDEO_CLOCK_RATE,
        channels: 0,
        sdp_fmtp_line: "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f"
            .to_string(),
        rtcp_feedback: vec![],
    }
}

/// Pull frames from the source and write them to the track until stopped,
/// disconnected, or the capture fails
async fn feed_track(
    mut source: FrameSource,
    track: Arc<TrackLocalStaticSample>,
    mut state_rx: watch::Receiver<ConnectionState>,
    mut stop_rx: watch::Receiver<bool>,
    fps: u32,
) {
    // The payload type is only valid once the peer is connected
    loop {
        match *state_rx.borrow() {
            ConnectionState::Connected => break,
            ConnectionState::Failed | ConnectionState::Closed => {
                source.stop();
                return;
            }
            _ => {}
        }
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    source.stop();
                    return;
                }
            }
            stopped = stop_rx.changed() => {
                if stopped.is_err() || *stop_rx.borrow() {
                    source.stop();
                    return;
                }
            }
        }
    }
    info!("Peer connected; starting camera feed");

    let fallback = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut prev_pts: Option<i64> = None;
    loop {
        tokio::select! {
            stopped = stop_rx.changed() => {
                if stopped.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            result = source.next() => match result {
                Ok(frame) => {
                    let duration = match prev_pts {
                        Some(prev) => Duration::from_secs_f64(
                            (frame.pts - prev).max(1) as f64 / f64::from(VIDEO_CLOCK_RATE),
                        ),
                        None => fallback,
                    };
                    prev_pts = Some(frame.pts);

                    let sample = Sample {
                        data: frame.data,
                        duration,
                        ..Default::default()
                    };
                    if let Err(e) = track.write_sample(&sample).await {
                        debug!("Failed to write video sample: {}", e);
                    }
                }
                Err(e) => {
                    // Fatal for the sequence; release the device and end
                    // this task, the process stays alive
                    error!("Camera capture failed: {}", e);
                    break;
                }
            }
        }
    }

    source.stop();
    info!("Camera feed stopped");
}
