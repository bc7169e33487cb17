//! Timed frame production for the streamer role

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use super::clock::{VideoClock, VIDEO_TIME_BASE};
use super::device::{self, CaptureConfig, CaptureDevice};
use crate::error::{AppError, Result};

/// One captured frame with presentation timing
#[derive(Debug, Clone)]
pub struct VideoFrameSample {
    /// Encoded pixel data straight from the device
    pub data: Bytes,
    /// Presentation timestamp in `time_base` units, strictly increasing
    /// across the session
    pub pts: i64,
    /// Timestamp units as a rational (numerator, denominator)
    pub time_base: (u32, u32),
}

/// A lazy, infinite, non-restartable sequence of video frames paced by the
/// capture device.
///
/// A dedicated worker thread owns the device and pushes at most one frame
/// at a time; `next()` awaits the tick. A device failure ends the sequence
/// permanently and releases the device. `stop()` (or dropping the source)
/// also releases it; release happens exactly once regardless of how the
/// sequence ends.
pub struct FrameSource {
    frames: Option<mpsc::Receiver<Result<Bytes>>>,
    clock: VideoClock,
    device_label: String,
}

impl FrameSource {
    /// Open the configured V4L2 camera and start the capture worker
    pub fn open(config: CaptureConfig) -> Result<Self> {
        let label = config.device_label();
        let device = device::open_device(&config)?;

        // Capacity 1: at most one in-flight frame, the device paces us
        let (tx, rx) = mpsc::channel(1);
        std::thread::Builder::new()
            .name("telearm-capture".to_string())
            .spawn(move || device::v4l_capture_loop(device, config, tx))
            .map_err(|e| AppError::Capture {
                device: label.clone(),
                reason: format!("capture thread spawn failed: {}", e),
            })?;

        Ok(Self {
            frames: Some(rx),
            clock: VideoClock::new(),
            device_label: label,
        })
    }

    /// Start a source over an arbitrary capture device (tests, synthetic
    /// feeds)
    pub fn from_device<D: CaptureDevice>(device: D, label: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(1);
        std::thread::spawn(move || run_device_loop(device, tx));

        Self {
            frames: Some(rx),
            clock: VideoClock::new(),
            device_label: label.into(),
        }
    }

    /// Await the next capture tick and stamp the frame.
    ///
    /// After a capture failure the sequence is over: every further call
    /// fails without touching the device.
    pub async fn next(&mut self) -> Result<VideoFrameSample> {
        let frames = self.frames.as_mut().ok_or_else(|| AppError::Capture {
            device: self.device_label.clone(),
            reason: "frame sequence ended".to_string(),
        })?;

        match frames.recv().await {
            Some(Ok(data)) => {
                let pts = self.clock.next_pts();
                Ok(VideoFrameSample {
                    data,
                    pts,
                    time_base: VIDEO_TIME_BASE,
                })
            }
            Some(Err(e)) => {
                self.frames = None;
                Err(e)
            }
            None => {
                self.frames = None;
                Err(AppError::Capture {
                    device: self.device_label.clone(),
                    reason: "capture worker exited".to_string(),
                })
            }
        }
    }

    /// Release the capture device.
    ///
    /// Closing the frame channel makes the worker exit and drop the device;
    /// repeated calls are no-ops.
    pub fn stop(&mut self) {
        if self.frames.take().is_some() {
            debug!("Capture source for {} stopped", self.device_label);
        }
    }
}

fn run_device_loop<D: CaptureDevice>(mut device: D, frames: mpsc::Sender<Result<Bytes>>) {
    loop {
        match device.read_frame() {
            Ok(frame) => {
                if frames.blocking_send(Ok(frame)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = frames.blocking_send(Err(e));
                break;
            }
        }
    }
    // The device drops here - the single release point for every exit path
}
