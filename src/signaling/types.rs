//! Signaling types exchanged with the rendezvous service

use serde::{Deserialize, Serialize};

/// Which half of the offer/answer pair a description is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl std::fmt::Display for SdpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdpKind::Offer => write!(f, "offer"),
            SdpKind::Answer => write!(f, "answer"),
        }
    }
}

/// A session description exchanged verbatim with the rendezvous.
///
/// Immutable once produced; the local description is never replaced for the
/// lifetime of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// SDP content
    pub sdp: String,
    /// Description kind
    #[serde(rename = "type")]
    pub kind: SdpKind,
}

impl SessionDescriptor {
    /// Create an offer description
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            kind: SdpKind::Offer,
        }
    }

    /// Create an answer description
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp: sdp.into(),
            kind: SdpKind::Answer,
        }
    }
}

/// Behavioral role announced to the rendezvous
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRole {
    /// Sends joint commands over the control channel
    Controller,
    /// Receives joint commands and hands them to a callback
    Receiver,
    /// Sends live camera video
    Streamer,
}

impl std::fmt::Display for ClientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientRole::Controller => write!(f, "controller"),
            ClientRole::Receiver => write!(f, "receiver"),
            ClientRole::Streamer => write!(f, "streamer"),
        }
    }
}

/// Offer request POSTed to the rendezvous, never mutated after send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeRequest {
    /// Local session description
    #[serde(flatten)]
    pub descriptor: SessionDescriptor,
    /// Role of this endpoint
    pub client_type: ClientRole,
    /// Pairing identifier
    pub robot_id: String,
    /// Requested server-side video transform
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_transform: Option<String>,
}

/// Answer returned by the rendezvous
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HandshakeResponse {
    /// Remote session description
    #[serde(flatten)]
    pub descriptor: SessionDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = HandshakeRequest {
            descriptor: SessionDescriptor::offer("v=0"),
            client_type: ClientRole::Controller,
            robot_id: "robot1".to_string(),
            video_transform: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "sdp": "v=0",
                "type": "offer",
                "client_type": "controller",
                "robot_id": "robot1",
            })
        );
    }

    #[test]
    fn test_request_carries_video_transform() {
        let request = HandshakeRequest {
            descriptor: SessionDescriptor::offer("v=0"),
            client_type: ClientRole::Streamer,
            robot_id: "robot1".to_string(),
            video_transform: Some("none".to_string()),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["client_type"], "streamer");
        assert_eq!(value["video_transform"], "none");
    }

    #[test]
    fn test_response_parses_answer() {
        let response: HandshakeResponse =
            serde_json::from_str(r#"{"sdp":"v=0","type":"answer"}"#).unwrap();
        assert_eq!(response.descriptor.kind, SdpKind::Answer);
        assert_eq!(response.descriptor.sdp, "v=0");
    }

    #[test]
    fn test_unexpected_kind_passes_through() {
        // Kind validation belongs to set_remote_description, not the parser
        let response: HandshakeResponse =
            serde_json::from_str(r#"{"sdp":"v=0","type":"offer"}"#).unwrap();
        assert_eq!(response.descriptor.kind, SdpKind::Offer);
    }
}
