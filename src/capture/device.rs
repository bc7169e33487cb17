//! Camera device access (V4L2)

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

use crate::error::{AppError, Result};

/// Default number of capture buffers
const DEFAULT_BUFFER_COUNT: u32 = 2;

/// Camera capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Device path
    pub device_path: PathBuf,
    /// Desired frame width
    pub width: u32,
    /// Desired frame height
    pub height: u32,
    /// Desired pixel format as a FourCC string
    pub fourcc: String,
    /// Desired frame rate (0 = device default)
    pub fps: u32,
    /// Number of capture buffers
    pub buffer_count: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from("/dev/video0"),
            width: 1280,
            height: 720,
            fourcc: "MJPG".to_string(),
            fps: 30,
            buffer_count: DEFAULT_BUFFER_COUNT,
        }
    }
}

impl CaptureConfig {
    /// Create config for a specific device
    pub fn for_device(path: impl AsRef<Path>) -> Self {
        Self {
            device_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Set resolution
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set frame rate
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub(crate) fn device_label(&self) -> String {
        self.device_path.display().to_string()
    }
}

/// One blocking camera read per capture tick.
///
/// The production device is the V4L2 capture loop below; tests substitute
/// a synthetic generator. Implementations release the device when dropped,
/// which the capture worker does on every exit path.
pub trait CaptureDevice: Send + 'static {
    /// Block until the device delivers one frame
    fn read_frame(&mut self) -> Result<Bytes>;
}

/// Open and configure the V4L2 device, failing fast on a bad path or format
pub(crate) fn open_device(config: &CaptureConfig) -> Result<Device> {
    let label = config.device_label();

    let device = Device::with_path(&config.device_path).map_err(|e| AppError::Capture {
        device: label.clone(),
        reason: format!("open failed: {}", e),
    })?;

    let fourcc: [u8; 4] = config
        .fourcc
        .as_bytes()
        .try_into()
        .map_err(|_| AppError::Capture {
            device: label.clone(),
            reason: format!("invalid fourcc '{}'", config.fourcc),
        })?;

    let wanted = Format::new(config.width, config.height, FourCC::new(&fourcc));
    let actual = device.set_format(&wanted).map_err(|e| AppError::Capture {
        device: label.clone(),
        reason: format!("set format failed: {}", e),
    })?;
    if actual.fourcc != wanted.fourcc {
        warn!(
            "Device {} negotiated {} instead of {}",
            label, actual.fourcc, wanted.fourcc
        );
    }

    if config.fps > 0 {
        if let Err(e) = device.set_params(&Parameters::with_fps(config.fps)) {
            warn!("Failed to set hardware FPS on {}: {}", label, e);
        }
    }

    info!(
        "Capture device {} ready at {}x{} {}",
        label, actual.width, actual.height, actual.fourcc
    );
    Ok(device)
}

/// Blocking capture loop run on a dedicated thread.
///
/// Pushes one frame per capture tick into `frames` until the receiver is
/// dropped or the device fails; a failure is reported once and ends the
/// loop. The device and its mmap stream are dropped on return, so the
/// device is released on every exit path.
pub(crate) fn v4l_capture_loop(
    device: Device,
    config: CaptureConfig,
    frames: mpsc::Sender<Result<Bytes>>,
) {
    let label = config.device_label();

    let mut stream = match MmapStream::with_buffers(&device, Type::VideoCapture, config.buffer_count)
    {
        Ok(stream) => stream,
        Err(e) => {
            let _ = frames.blocking_send(Err(AppError::Capture {
                device: label,
                reason: format!("stream init failed: {}", e),
            }));
            return;
        }
    };

    loop {
        match stream.next() {
            Ok((data, meta)) => {
                let used = (meta.bytesused as usize).min(data.len());
                if used == 0 {
                    continue;
                }
                if frames
                    .blocking_send(Ok(Bytes::copy_from_slice(&data[..used])))
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                let _ = frames.blocking_send(Err(AppError::Capture {
                    device: label,
                    reason: format!("read failed: {}", e),
                }));
                break;
            }
        }
    }
}
