//! Camera capture and timed frame production

pub mod clock;
pub mod device;
pub mod source;

pub use clock::{VideoClock, VIDEO_CLOCK_RATE, VIDEO_TIME_BASE};
pub use device::{CaptureConfig, CaptureDevice};
pub use source::{FrameSource, VideoFrameSample};
