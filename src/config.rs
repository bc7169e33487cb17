//! Session configuration

use serde::{Deserialize, Serialize};

/// Default rendezvous offer endpoint
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080/offer";
/// Default robot identifier
pub const DEFAULT_ROBOT_ID: &str = "robot1";
/// Default signaling request timeout in seconds
const DEFAULT_SIGNALING_TIMEOUT_SECS: u64 = 10;

/// Settings shared by every session role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Rendezvous endpoint the offer is POSTed to
    pub server_url: String,
    /// Identifier the rendezvous uses to pair a controller with a receiver
    pub robot_id: String,
    /// STUN server URLs
    ///
    /// Empty for local connections - host candidates work directly. For
    /// remote access, configure STUN servers.
    pub stun_servers: Vec<String>,
    /// Server-side transform requested for the video stream
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_transform: Option<String>,
    /// Signaling request timeout in seconds
    pub signaling_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            robot_id: DEFAULT_ROBOT_ID.to_string(),
            stun_servers: vec![],
            video_transform: None,
            signaling_timeout_secs: DEFAULT_SIGNALING_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    /// Create config for a specific rendezvous endpoint
    pub fn for_server(url: impl Into<String>) -> Self {
        Self {
            server_url: url.into(),
            ..Default::default()
        }
    }

    /// Set the robot identifier
    pub fn with_robot(mut self, robot_id: impl Into<String>) -> Self {
        self.robot_id = robot_id.into();
        self
    }

    /// Add a STUN server
    pub fn with_stun_server(mut self, url: impl Into<String>) -> Self {
        self.stun_servers.push(url.into());
        self
    }

    /// Set the requested video transform
    pub fn with_video_transform(mut self, transform: impl Into<String>) -> Self {
        self.video_transform = Some(transform.into());
        self
    }
}
