//! Control channel readiness states

/// Data channel lifecycle states.
///
/// Owned by the transport and mirrored here; callers observe transitions
/// but never set them. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Transport is still negotiating the channel
    Connecting,
    /// Channel is ready; sends are allowed
    Open,
    /// Teardown has been requested
    Closing,
    /// Channel is gone; no further transitions
    Closed,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Closing => write!(f, "closing"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}
