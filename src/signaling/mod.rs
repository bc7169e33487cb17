//! Offer/answer exchange with the HTTP signaling rendezvous

pub mod client;
pub mod types;

pub use client::SignalingClient;
pub use types::{ClientRole, HandshakeRequest, HandshakeResponse, SdpKind, SessionDescriptor};
