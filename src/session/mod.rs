//! Role-specific session drivers built on the WebRTC transport

pub mod controller;
pub mod peer;
pub mod receiver;
pub mod streamer;

pub use controller::ControllerSession;
pub use peer::ConnectionState;
pub use receiver::ReceiverSession;
pub use streamer::StreamerSession;
