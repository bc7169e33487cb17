//! HTTP client for the rendezvous offer endpoint

use std::time::Duration;

use tracing::{debug, info};

use super::types::{HandshakeRequest, HandshakeResponse};
use crate::error::{AppError, Result};

/// One-shot signaling exchange against the rendezvous service.
///
/// A single POST carries the local description and role metadata; the
/// response carries the remote description. There is no retry - a failed
/// exchange leaves the session unestablished.
pub struct SignalingClient {
    http: reqwest::Client,
    server_url: String,
}

impl SignalingClient {
    /// Create a client for the given offer endpoint
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url: server_url.into(),
        }
    }

    /// Create a client with a request timeout
    pub fn with_timeout(server_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Signaling(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            server_url: server_url.into(),
        })
    }

    /// Endpoint this client talks to
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// POST the handshake request and await the remote description.
    ///
    /// Transport failures and non-2xx statuses surface as `Signaling`; a
    /// body that does not match the expected JSON shape surfaces as
    /// `MalformedResponse`. The descriptor kind is not validated here.
    pub async fn exchange(&self, request: &HandshakeRequest) -> Result<HandshakeResponse> {
        debug!(
            "Sending {} offer for robot '{}' to {}",
            request.client_type, request.robot_id, self.server_url
        );

        let response = self
            .http
            .post(&self.server_url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                AppError::Signaling(format!("request to {} failed: {}", self.server_url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Signaling(format!(
                "rendezvous returned HTTP {}",
                status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::Signaling(format!("failed to read response body: {}", e)))?;

        let response: HandshakeResponse = serde_json::from_slice(&body)
            .map_err(|e| AppError::MalformedResponse(e.to_string()))?;

        info!(
            "Rendezvous returned {} for robot '{}'",
            response.descriptor.kind, request.robot_id
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::future::IntoFuture;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;
    use crate::signaling::types::{ClientRole, SdpKind, SessionDescriptor};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(axum::serve(listener, router).into_future());
        format!("http://{}/offer", addr)
    }

    fn request() -> HandshakeRequest {
        HandshakeRequest {
            descriptor: SessionDescriptor::offer("v=0"),
            client_type: ClientRole::Controller,
            robot_id: "robot1".to_string(),
            video_transform: None,
        }
    }

    #[tokio::test]
    async fn test_exchange_returns_answer() {
        let router = Router::new().route(
            "/offer",
            post(|| async { Json(serde_json::json!({"sdp": "v=0 answer", "type": "answer"})) }),
        );
        let url = serve(router).await;

        let client = SignalingClient::new(url);
        let response = client.exchange(&request()).await.unwrap();
        assert_eq!(response.descriptor.kind, SdpKind::Answer);
        assert_eq!(response.descriptor.sdp, "v=0 answer");
    }

    #[tokio::test]
    async fn test_http_error_is_signaling_failure() {
        let router = Router::new().route(
            "/offer",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let url = serve(router).await;

        let client = SignalingClient::new(url);
        let err = client.exchange(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Signaling(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_connection_refused_is_signaling_failure() {
        // Grab a port that is free, then close it again
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = SignalingClient::new(format!("http://{}/offer", addr));
        let err = client.exchange(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::Signaling(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed_response() {
        let router = Router::new().route("/offer", post(|| async { "not json" }));
        let url = serve(router).await;

        let client = SignalingClient::new(url);
        let err = client.exchange(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_missing_fields_is_malformed_response() {
        let router = Router::new().route(
            "/offer",
            post(|| async { Json(serde_json::json!({"sdp": "v=0"})) }),
        );
        let url = serve(router).await;

        let client = SignalingClient::new(url);
        let err = client.exchange(&request()).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)), "got {:?}", err);
    }
}
