//! Reliable ordered control channel over the WebRTC transport

pub mod session;
pub mod state;
pub mod transport;

pub use session::DataChannelSession;
pub use state::ChannelState;
pub use transport::{ChannelTransport, RtcChannelTransport};

/// Channel label shared by controller and receiver so the rendezvous can
/// pair both ends of the same control pipe
pub const CONTROL_CHANNEL_LABEL: &str = "robot_control";
