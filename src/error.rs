use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Signaling request failed: {0}")]
    Signaling(String),

    #[error("Malformed signaling response: {0}")]
    MalformedResponse(String),

    #[error("Data channel not ready: {state}")]
    ChannelNotReady { state: String },

    #[error("Command decode failed: {0}")]
    Decode(String),

    #[error("Capture failed [{device}]: {reason}")]
    Capture { device: String, reason: String },

    #[error("WebRTC error: {0}")]
    WebRtc(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, AppError>;
