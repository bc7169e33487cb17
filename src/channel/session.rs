//! Control channel session: readiness state machine and message fan-in

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;

use super::state::ChannelState;
use super::transport::ChannelTransport;
use crate::command::{codec, JointCommand};
use crate::error::{AppError, Result};

/// Callback invoked for every decoded inbound command
pub type CommandObserver = Box<dyn Fn(JointCommand) + Send + Sync>;

/// One control channel with its readiness state machine.
///
/// State transitions are driven by transport notifications, never by
/// callers. Sends are gated on `Open` and fail fast otherwise - nothing is
/// buffered, nothing retried. Inbound payloads are decoded and handed to a
/// single registered observer; a payload that fails to decode is logged and
/// dropped without touching the session.
pub struct DataChannelSession {
    label: String,
    transport: Arc<dyn ChannelTransport>,
    state: watch::Sender<ChannelState>,
    state_rx: watch::Receiver<ChannelState>,
    observer: RwLock<Option<CommandObserver>>,
    decode_failures: AtomicU64,
}

impl DataChannelSession {
    /// Create a session in the `Connecting` state
    pub fn new(label: impl Into<String>, transport: Arc<dyn ChannelTransport>) -> Self {
        let (state, state_rx) = watch::channel(ChannelState::Connecting);
        Self {
            label: label.into(),
            transport,
            state,
            state_rx,
            observer: RwLock::new(None),
            decode_failures: AtomicU64::new(0),
        }
    }

    /// Wire the transport's channel callbacks into this session.
    ///
    /// Must run before the handshake completes so an early remote message
    /// is never dropped.
    pub fn bind(session: &Arc<Self>, channel: &Arc<RTCDataChannel>) {
        let open_session = session.clone();
        channel.on_open(Box::new(move || {
            open_session.notify_open();
            Box::pin(async {})
        }));

        let close_session = session.clone();
        channel.on_close(Box::new(move || {
            close_session.notify_closed();
            Box::pin(async {})
        }));

        let message_session = session.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            message_session.handle_message(&msg.data);
            Box::pin(async {})
        }));

        // The channel may have opened before the callbacks were registered
        if channel.ready_state() == RTCDataChannelState::Open {
            session.notify_open();
        }
    }

    /// Channel label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current readiness state
    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// Subscribe to state changes
    pub fn state_watch(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Number of inbound payloads dropped because they failed to decode
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Register the observer invoked for every decoded inbound command.
    ///
    /// Replaces any previously registered observer.
    pub fn set_observer<F>(&self, observer: F)
    where
        F: Fn(JointCommand) + Send + Sync + 'static,
    {
        *self.observer.write() = Some(Box::new(observer));
    }

    /// Wait until the channel reports open.
    ///
    /// Fails with `ChannelNotReady` if the channel closes first.
    pub async fn wait_open(&self) -> Result<()> {
        let mut rx = self.state_rx.clone();
        loop {
            let current = *rx.borrow_and_update();
            match current {
                ChannelState::Open => return Ok(()),
                ChannelState::Closed => {
                    return Err(AppError::ChannelNotReady {
                        state: current.to_string(),
                    })
                }
                _ => {}
            }
            if rx.changed().await.is_err() {
                return Err(AppError::ChannelNotReady {
                    state: self.state().to_string(),
                });
            }
        }
    }

    /// Send one command over the channel.
    ///
    /// Allowed only in state `Open`; any other state fails with
    /// `ChannelNotReady` without touching the transport.
    pub async fn send(&self, command: &JointCommand) -> Result<()> {
        let current = self.state();
        if current != ChannelState::Open {
            return Err(AppError::ChannelNotReady {
                state: current.to_string(),
            });
        }

        let payload = codec::encode(command)?;
        self.transport.send_payload(payload).await
    }

    /// Request transport-level teardown.
    ///
    /// Moves to `Closing`; the transport's close notification finalizes
    /// `Closed`. Further calls after that are no-ops.
    pub async fn close(&self) -> Result<()> {
        let moved = self.state.send_if_modified(|state| match *state {
            ChannelState::Closing | ChannelState::Closed => false,
            _ => {
                *state = ChannelState::Closing;
                true
            }
        });
        if !moved {
            return Ok(());
        }

        debug!("Closing control channel '{}'", self.label);
        self.transport.close_channel().await
    }

    /// Transport notification: channel became ready
    pub fn notify_open(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == ChannelState::Connecting {
                *state = ChannelState::Open;
                true
            } else {
                false
            }
        });
        if changed {
            info!("Control channel '{}' open", self.label);
        }
    }

    /// Transport notification: channel is gone
    pub fn notify_closed(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == ChannelState::Closed {
                false
            } else {
                *state = ChannelState::Closed;
                true
            }
        });
        if changed {
            info!("Control channel '{}' closed", self.label);
        }
    }

    /// Transport notification: inbound payload arrived.
    ///
    /// Decodes and forwards to the observer synchronously. A malformed
    /// payload is counted and logged; it never tears the session down.
    pub fn handle_message(&self, payload: &[u8]) {
        match codec::decode(payload) {
            Ok(command) => {
                let observer = self.observer.read();
                match observer.as_ref() {
                    Some(callback) => callback(command),
                    None => debug!(
                        "No observer registered on channel '{}'; dropping command",
                        self.label
                    ),
                }
            }
            Err(e) => {
                self.decode_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Dropping malformed message on channel '{}': {}",
                    self.label, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;

    use super::*;

    /// Transport double that records every call
    #[derive(Default)]
    struct MockTransport {
        sent: Mutex<Vec<Bytes>>,
        closed: AtomicUsize,
    }

    #[async_trait]
    impl ChannelTransport for MockTransport {
        async fn send_payload(&self, payload: Bytes) -> Result<()> {
            self.sent.lock().push(payload);
            Ok(())
        }

        async fn close_channel(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Transport double that delivers sends straight into a peer session
    struct LoopbackTransport {
        peer: Arc<DataChannelSession>,
    }

    #[async_trait]
    impl ChannelTransport for LoopbackTransport {
        async fn send_payload(&self, payload: Bytes) -> Result<()> {
            self.peer.handle_message(&payload);
            Ok(())
        }

        async fn close_channel(&self) -> Result<()> {
            self.peer.notify_closed();
            Ok(())
        }
    }

    fn session_with_mock() -> (DataChannelSession, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let session = DataChannelSession::new("robot_control", transport.clone());
        (session, transport)
    }

    fn sample_command() -> JointCommand {
        JointCommand::new()
            .with_field("timestamp", 0i64)
            .with_field("joint1", 90i64)
    }

    #[tokio::test]
    async fn test_send_while_connecting_fails_without_side_effect() {
        let (session, transport) = session_with_mock();
        assert_eq!(session.state(), ChannelState::Connecting);

        let err = session.send(&sample_command()).await.unwrap_err();
        assert!(matches!(err, AppError::ChannelNotReady { .. }), "got {:?}", err);
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_send_after_open_reaches_transport() {
        let (session, transport) = session_with_mock();
        session.notify_open();
        assert_eq!(session.state(), ChannelState::Open);

        let command = sample_command();
        session.send(&command).await.unwrap();

        let sent = transport.sent.lock();
        assert_eq!(sent.len(), 1);
        assert_eq!(codec::decode(&sent[0]).unwrap(), command);
    }

    #[tokio::test]
    async fn test_send_after_close_fails_without_side_effect() {
        let (session, transport) = session_with_mock();
        session.notify_open();
        session.close().await.unwrap();
        assert_eq!(session.state(), ChannelState::Closing);

        let err = session.send(&sample_command()).await.unwrap_err();
        assert!(matches!(err, AppError::ChannelNotReady { .. }), "got {:?}", err);

        session.notify_closed();
        assert_eq!(session.state(), ChannelState::Closed);
        let err = session.send(&sample_command()).await.unwrap_err();
        assert!(matches!(err, AppError::ChannelNotReady { .. }), "got {:?}", err);

        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (session, transport) = session_with_mock();
        session.notify_open();

        session.close().await.unwrap();
        session.close().await.unwrap();
        session.notify_closed();
        session.close().await.unwrap();

        assert_eq!(transport.closed.load(Ordering::SeqCst), 1);
        assert_eq!(session.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_closed_is_terminal() {
        let (session, _transport) = session_with_mock();
        session.notify_closed();
        session.notify_open();
        assert_eq!(session.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_observer_receives_decoded_commands() {
        let (session, _transport) = session_with_mock();
        let received: Arc<Mutex<Vec<JointCommand>>> = Arc::new(Mutex::new(vec![]));

        let sink = received.clone();
        session.set_observer(move |command| sink.lock().push(command));

        session.handle_message(br#"{"timestamp": 0, "joint1": 90}"#);

        let got = received.lock();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].timestamp(), Some(0));
        assert_eq!(got[0].angle("joint1"), Some(90.0));
    }

    #[tokio::test]
    async fn test_malformed_message_is_swallowed() {
        let (session, _transport) = session_with_mock();
        let received: Arc<Mutex<Vec<JointCommand>>> = Arc::new(Mutex::new(vec![]));

        let sink = received.clone();
        session.set_observer(move |command| sink.lock().push(command));

        session.handle_message(b"{broken");
        session.handle_message(br#"{"joint1": 45}"#);

        assert_eq!(session.decode_failures(), 1);
        // Delivery continues after the bad payload
        let got = received.lock();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].angle("joint1"), Some(45.0));
    }

    #[tokio::test]
    async fn test_wait_open_resolves_on_open_notification() {
        let (session, _transport) = session_with_mock();
        let session = Arc::new(session);

        let waiter = session.clone();
        let handle = tokio::spawn(async move { waiter.wait_open().await });

        tokio::task::yield_now().await;
        session.notify_open();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_wait_open_fails_when_channel_closes_first() {
        let (session, _transport) = session_with_mock();
        let session = Arc::new(session);

        let waiter = session.clone();
        let handle = tokio::spawn(async move { waiter.wait_open().await });

        tokio::task::yield_now().await;
        session.notify_closed();
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, AppError::ChannelNotReady { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_paired_sessions_deliver_commands_end_to_end() {
        // Receiver side with an inert transport; it only observes
        let receiver = Arc::new(DataChannelSession::new(
            "robot_control",
            Arc::new(MockTransport::default()),
        ));
        let received: Arc<Mutex<Vec<JointCommand>>> = Arc::new(Mutex::new(vec![]));
        let sink = received.clone();
        receiver.set_observer(move |command| sink.lock().push(command));
        receiver.notify_open();

        // Controller side delivering straight into the receiver
        let controller = DataChannelSession::new(
            "robot_control",
            Arc::new(LoopbackTransport {
                peer: receiver.clone(),
            }),
        );
        controller.notify_open();

        let command = sample_command();
        controller.send(&command).await.unwrap();

        let got = received.lock();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0], command);
    }
}
