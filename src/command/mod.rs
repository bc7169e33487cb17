//! Joint command payloads and their wire codec

pub mod codec;
pub mod joint;

pub use joint::JointCommand;
