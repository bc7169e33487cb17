//! telearm - Robot-arm teleoperation over WebRTC
//!
//! This crate establishes point-to-point real-time sessions between a
//! controller or camera endpoint and a receiver endpoint, paired through an
//! HTTP signaling rendezvous. Joint-angle commands travel over a reliable
//! ordered data channel; live camera video travels as a media track.

pub mod capture;
pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod session;
pub mod signaling;

pub use error::{AppError, Result};
