//! # Session Manager
//!
//! Owns the single connection to the receiver: its state, the heartbeat
//! and the serialization of controller events into wire messages.
//!
//! ## Connection State
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Connecting | transport established | Open (heartbeat starts) |
//! | Connecting | connect failed | Closed |
//! | Open | transport error / remote close / `close()` | Closed |
//!
//! Closed is terminal: there is no reconnection. A new connection needs a
//! new `SessionManager`.
//!
//! The manager never performs I/O itself. The event loop feeds it
//! transport events, timer ticks and inbound text, each stamped with the
//! time it was observed, and the manager writes through a [`Transport`].

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::heartbeat::Heartbeat;
use super::identity::IdentityProvider;
use super::transport::Transport;
use crate::error::{GamepadError, Result};
use crate::protocol::{decode_inbound, encode_outbound, Endpoint, InboundMessage, OutboundEvent};

/// Lifecycle of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is being established.
    Connecting,
    /// Transport is up; events flow.
    Open,
    /// Transport is gone. Terminal.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Open => f.write_str("connected"),
            Self::Closed => f.write_str("disconnected"),
        }
    }
}

/// What the UI shows: state plus the last measured round-trip time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    /// Connection state.
    pub state: ConnectionState,
    /// Last heartbeat round-trip time, if one was measured.
    pub latency: Option<Duration>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Connecting,
            latency: None,
        }
    }
}

/// Connection owner.
pub struct SessionManager<T> {
    endpoint: Endpoint,
    client_id: String,
    state: ConnectionState,
    transport: Option<T>,
    heartbeat: Heartbeat,
    latency: Option<Duration>,
    dropped_events: u64,
}

impl<T> fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoint", &self.endpoint)
            .field("state", &self.state)
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> SessionManager<T> {
    /// Creates a session in the Connecting state.
    ///
    /// The client id is resolved once here and carried in the endpoint URL.
    ///
    /// # Arguments
    ///
    /// * `origin` - Receiver origin, e.g. `http://192.168.1.20:3000`
    /// * `identity` - Provider of the persistent client id
    /// * `heartbeat_period` - Ping period once the connection is open
    ///
    /// # Errors
    ///
    /// Returns error if the identity cannot be resolved or the endpoint
    /// cannot be derived from `origin`.
    pub fn new(origin: &str, identity: &dyn IdentityProvider, heartbeat_period: Duration) -> Result<Self> {
        let client_id = identity.client_id()?;
        let endpoint = Endpoint::from_origin(origin, &client_id)?;

        Ok(Self {
            endpoint,
            client_id,
            state: ConnectionState::Connecting,
            transport: None,
            heartbeat: Heartbeat::new(heartbeat_period),
            latency: None,
            dropped_events: 0,
        })
    }

    /// WebSocket endpoint to connect to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Client id carried by the endpoint.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Last measured round-trip time.
    #[must_use]
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// State and latency together.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            latency: self.latency,
        }
    }

    /// Heartbeat bookkeeping (the event loop arms its timer from it).
    #[must_use]
    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    /// Number of events dropped because the session was not open.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }

    /// The transport is established: Connecting -> Open, heartbeat starts.
    ///
    /// A transport arriving after the session was closed is closed at once.
    pub fn on_open(&mut self, mut transport: T) {
        match self.state {
            ConnectionState::Connecting => {
                self.transport = Some(transport);
                self.state = ConnectionState::Open;
                self.heartbeat.start();
                info!("Connected to {}", self.endpoint);
            }
            ConnectionState::Open => {
                warn!("Ignoring second transport for an open session");
                transport.close();
            }
            ConnectionState::Closed => {
                debug!("Session already closed, discarding late transport");
                transport.close();
            }
        }
    }

    /// Establishing the transport failed: Connecting -> Closed.
    pub fn on_connect_failed(&mut self, error: &GamepadError) {
        warn!("Failed to connect to {}: {}", self.endpoint, error);
        self.shutdown();
    }

    /// The transport reported an error: -> Closed.
    pub fn on_transport_error(&mut self, error: &GamepadError) {
        if self.state != ConnectionState::Closed {
            warn!("Connection error: {}", error);
        }
        self.shutdown();
    }

    /// The receiver closed the connection: -> Closed.
    pub fn on_remote_close(&mut self) {
        if self.state != ConnectionState::Closed {
            info!("Receiver closed the connection");
        }
        self.shutdown();
    }

    /// Heartbeat tick at `now`: records the ping time and sends a ping if open.
    pub fn on_heartbeat_tick(&mut self, now: Instant) {
        if self.state != ConnectionState::Open || !self.heartbeat.is_active() {
            return;
        }
        self.heartbeat.record_ping(now);
        trace!("Heartbeat ping");
        self.write(&OutboundEvent::Ping);
    }

    /// Handles an inbound text frame observed at `now`.
    ///
    /// Malformed frames are logged and ignored; the connection stays open.
    pub fn on_text(&mut self, text: &str, now: Instant) {
        match decode_inbound(text) {
            Ok(InboundMessage::Pong) => match self.heartbeat.round_trip(now) {
                Some(rtt) => {
                    self.latency = Some(rtt);
                    debug!("Heartbeat round trip {} ms", rtt.as_millis());
                }
                None => debug!("Pong without a preceding ping"),
            },
            Ok(other) => trace!("Ignoring inbound {:?}", other),
            Err(e) => warn!("{} ({:?})", e, text),
        }
    }

    /// Sends a controller event.
    ///
    /// Only writes while Open. Otherwise the event is dropped with a
    /// warning; dropped input is expected around connection gaps and is
    /// never reported to the caller as an error.
    pub fn send(&mut self, event: OutboundEvent) {
        if self.state != ConnectionState::Open {
            self.dropped_events += 1;
            warn!("Not connected ({}), dropping {} event", self.state, event.kind());
            return;
        }
        self.write(&event);
    }

    /// Sends several events in order.
    pub fn send_all<I: IntoIterator<Item = OutboundEvent>>(&mut self, events: I) {
        for event in events {
            self.send(event);
        }
    }

    /// Tears the session down: heartbeat first, then the transport.
    ///
    /// Idempotent.
    pub fn close(&mut self) {
        if self.state != ConnectionState::Closed {
            info!("Closing connection to {}", self.endpoint);
        }
        self.shutdown();
    }

    fn write(&mut self, event: &OutboundEvent) {
        let text = match encode_outbound(event) {
            Ok(text) => text,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        if let Err(e) = transport.send_text(text) {
            warn!("Failed to send {} message: {}", event.kind(), e);
            self.shutdown();
        }
    }

    fn shutdown(&mut self) {
        self.heartbeat.cancel();
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.state = ConnectionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes::{AXIS_X, BTN_A};
    use crate::session::identity::{MockIdentityProvider, StaticIdentity};
    use crate::session::transport::mocks::{Recorded, RecordingTransport};

    const ORIGIN: &str = "http://10.0.0.2:3000";

    fn session() -> SessionManager<RecordingTransport> {
        SessionManager::new(ORIGIN, &StaticIdentity("client-1".to_string()), Duration::from_millis(5000)).unwrap()
    }

    fn open_session() -> (SessionManager<RecordingTransport>, RecordingTransport) {
        let mut s = session();
        let transport = RecordingTransport::new();
        s.on_open(transport.clone());
        (s, transport)
    }

    // ==================== Construction ====================

    #[test]
    fn test_new_session_is_connecting() {
        let s = session();
        assert_eq!(s.state(), ConnectionState::Connecting);
        assert_eq!(s.latency(), None);
        assert!(!s.heartbeat().is_active());
        assert_eq!(s.endpoint().url(), "ws://10.0.0.2:3000/ws?client_id=client-1");
        assert_eq!(s.client_id(), "client-1");
    }

    #[test]
    fn test_identity_resolved_exactly_once() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_client_id()
            .times(1)
            .returning(|| Ok("abc".to_string()));

        let mut s: SessionManager<RecordingTransport> =
            SessionManager::new(ORIGIN, &identity, Duration::from_millis(5000)).unwrap();
        s.on_open(RecordingTransport::new());
        s.send(OutboundEvent::button(BTN_A, true));
        s.close();
    }

    #[test]
    fn test_identity_failure_propagates() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_client_id()
            .returning(|| Err(GamepadError::Identity("no storage".to_string())));

        let result: Result<SessionManager<RecordingTransport>> =
            SessionManager::new(ORIGIN, &identity, Duration::from_millis(5000));
        assert!(matches!(result, Err(GamepadError::Identity(_))));
    }

    // ==================== Lifecycle ====================

    #[test]
    fn test_open_starts_heartbeat() {
        let (s, _) = open_session();
        assert_eq!(s.state(), ConnectionState::Open);
        assert!(s.heartbeat().is_active());
    }

    #[test]
    fn test_connect_failure_closes() {
        let mut s = session();
        s.on_connect_failed(&GamepadError::TransportClosed);
        assert_eq!(s.state(), ConnectionState::Closed);
        assert!(!s.heartbeat().is_active());
    }

    #[test]
    fn test_closed_is_terminal() {
        let mut s = session();
        s.on_connect_failed(&GamepadError::TransportClosed);

        let late = RecordingTransport::new();
        s.on_open(late.clone());
        assert_eq!(s.state(), ConnectionState::Closed);
        assert_eq!(late.log(), vec![Recorded::Close]);
    }

    #[test]
    fn test_second_transport_is_rejected() {
        let (mut s, first) = open_session();
        let second = RecordingTransport::new();
        s.on_open(second.clone());

        assert_eq!(second.log(), vec![Recorded::Close]);
        s.send(OutboundEvent::button(BTN_A, true));
        assert_eq!(first.texts().len(), 1);
    }

    #[test]
    fn test_remote_close_and_error_close() {
        let (mut s, transport) = open_session();
        s.on_remote_close();
        assert_eq!(s.state(), ConnectionState::Closed);
        assert!(!s.heartbeat().is_active());
        assert_eq!(transport.log(), vec![Recorded::Close]);

        let (mut s, _) = open_session();
        s.on_transport_error(&GamepadError::TransportClosed);
        assert_eq!(s.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut s, transport) = open_session();
        s.close();
        s.close();
        assert_eq!(transport.log(), vec![Recorded::Close]);
        assert_eq!(s.state(), ConnectionState::Closed);
    }

    // ==================== send ====================

    #[test]
    fn test_send_while_open_writes_json() {
        let (mut s, transport) = open_session();
        s.send(OutboundEvent::axis(AXIS_X, 32767));
        s.send(OutboundEvent::button(BTN_A, true));

        assert_eq!(
            transport.texts(),
            vec![
                r#"{"kind":"axis","code":0,"value":32767}"#.to_string(),
                r#"{"kind":"btn","code":304,"value":1}"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_send_while_connecting_is_dropped() {
        let mut s = session();
        s.send(OutboundEvent::button(BTN_A, true));
        assert_eq!(s.dropped_events(), 1);
        assert_eq!(s.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_send_while_closed_never_writes() {
        let (mut s, transport) = open_session();
        s.close();
        s.send(OutboundEvent::button(BTN_A, true));
        s.send_all([OutboundEvent::axis(AXIS_X, 1), OutboundEvent::axis(AXIS_X, 2)]);

        assert!(transport.texts().is_empty());
        assert_eq!(s.dropped_events(), 3);
    }

    #[test]
    fn test_write_failure_closes_session() {
        let (mut s, transport) = open_session();
        transport.set_fail_writes(true);

        s.send(OutboundEvent::button(BTN_A, true));
        assert_eq!(s.state(), ConnectionState::Closed);
        assert!(!s.heartbeat().is_active());
        assert_eq!(transport.log(), vec![Recorded::Close]);
    }

    // ==================== Heartbeat ====================

    #[test]
    fn test_heartbeat_latency() {
        // Ping at t = 1000 ms, pong at t = 1042 ms -> 42 ms
        let (mut s, transport) = open_session();
        let t0 = Instant::now();

        s.on_heartbeat_tick(t0 + Duration::from_millis(1000));
        assert_eq!(transport.texts(), vec![r#"{"kind":"ping"}"#.to_string()]);

        s.on_text(r#"{"kind":"pong"}"#, t0 + Duration::from_millis(1042));
        assert_eq!(s.latency(), Some(Duration::from_millis(42)));
        assert_eq!(
            s.status(),
            SessionStatus {
                state: ConnectionState::Open,
                latency: Some(Duration::from_millis(42)),
            }
        );
    }

    #[test]
    fn test_pong_uses_most_recent_ping() {
        let (mut s, _) = open_session();
        let t0 = Instant::now();

        s.on_heartbeat_tick(t0);
        s.on_heartbeat_tick(t0 + Duration::from_millis(5000));
        s.on_text(r#"{"kind":"pong"}"#, t0 + Duration::from_millis(5007));
        assert_eq!(s.latency(), Some(Duration::from_millis(7)));
    }

    #[test]
    fn test_pong_without_ping_is_ignored() {
        let (mut s, _) = open_session();
        s.on_text(r#"{"kind":"pong"}"#, Instant::now());
        assert_eq!(s.latency(), None);
    }

    #[test]
    fn test_tick_while_not_open_sends_nothing() {
        let mut s = session();
        s.on_heartbeat_tick(Instant::now());
        assert!(s.heartbeat().last_sent().is_none());

        let (mut s, transport) = open_session();
        s.close();
        s.on_heartbeat_tick(Instant::now());
        assert_eq!(transport.log(), vec![Recorded::Close]);
    }

    #[test]
    fn test_teardown_stops_heartbeat_before_close() {
        let (mut s, transport) = open_session();
        let t0 = Instant::now();
        s.on_heartbeat_tick(t0);
        s.close();
        s.on_heartbeat_tick(t0 + Duration::from_millis(5000));

        assert!(!s.heartbeat().is_active());
        assert_eq!(
            transport.log(),
            vec![Recorded::Text(r#"{"kind":"ping"}"#.to_string()), Recorded::Close]
        );
    }

    #[test]
    fn test_latency_survives_close() {
        let (mut s, _) = open_session();
        let t0 = Instant::now();
        s.on_heartbeat_tick(t0);
        s.on_text(r#"{"kind":"pong"}"#, t0 + Duration::from_millis(20));
        s.on_remote_close();

        assert_eq!(s.status().state, ConnectionState::Closed);
        assert_eq!(s.status().latency, Some(Duration::from_millis(20)));
    }

    // ==================== Inbound ====================

    #[test]
    fn test_malformed_inbound_keeps_connection_open() {
        let (mut s, _) = open_session();
        s.on_text("{{{ not json", Instant::now());
        s.on_text(r#"{"error":"maximum client limit reached"}"#, Instant::now());
        assert_eq!(s.state(), ConnectionState::Open);
    }

    #[test]
    fn test_echo_messages_are_ignored() {
        let (mut s, transport) = open_session();
        s.on_text(r#"{"kind":"btn","code":304,"value":1}"#, Instant::now());
        assert_eq!(s.state(), ConnectionState::Open);
        assert_eq!(s.latency(), None);
        assert!(transport.texts().is_empty());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Open.to_string(), "connected");
        assert_eq!(ConnectionState::Closed.to_string(), "disconnected");
    }
}
