//! # Event Loop
//!
//! Everything runs on one task, so the session, the trackers and the
//! heartbeat never need locking:
//!
//! ```text
//!   touch events ──► ContactDecoder ──► Dispatcher ──┐
//!   inbound frames ──────────────────────────────────┼──► SessionManager ──► writer task ──► socket
//!   heartbeat ticks / tap deadlines / shutdown ──────┘
//! ```
//!
//! The loop ends when the session reaches Closed (there is no
//! reconnection) or when shutdown is requested, in which case held
//! controls are released and the session is closed cleanly.

use std::future::Future;
use std::io;
use std::time::Duration;

use evdev::InputEvent;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::input::Haptics;
use crate::session::websocket::{self, apply_inbound_frame, Connection, WsOutbox};
use crate::session::{ConnectionState, HeartbeatTimer, SessionManager, SessionStatus};
use crate::touch::{ContactDecoder, Dispatcher};

/// How long teardown waits for the writer to flush the close frame.
const WRITER_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// The controller's event loop.
pub struct Runtime<H> {
    session: SessionManager<WsOutbox>,
    dispatcher: Dispatcher<H>,
    decoder: ContactDecoder,
    connect_timeout: Duration,
    status: watch::Sender<SessionStatus>,
}

impl<H: Haptics> Runtime<H> {
    /// Creates the loop and a receiver for connection status updates.
    pub fn new(
        session: SessionManager<WsOutbox>,
        dispatcher: Dispatcher<H>,
        decoder: ContactDecoder,
        connect_timeout: Duration,
    ) -> (Self, watch::Receiver<SessionStatus>) {
        let (status, status_rx) = watch::channel(session.status());
        (
            Self {
                session,
                dispatcher,
                decoder,
                connect_timeout,
                status,
            },
            status_rx,
        )
    }

    /// Connects and runs until the session closes or `shutdown` completes.
    ///
    /// Returns the final status.
    pub async fn run<S, F>(mut self, mut touch: S, shutdown: F) -> SessionStatus
    where
        S: Stream<Item = io::Result<InputEvent>> + Unpin,
        F: Future<Output = ()>,
    {
        let Connection {
            outbox,
            mut inbound,
            writer,
        } = match websocket::connect(self.session.endpoint(), self.connect_timeout).await {
            Ok(connection) => connection,
            Err(e) => {
                self.session.on_connect_failed(&e);
                self.publish();
                return self.session.status();
            }
        };

        self.session.on_open(outbox);
        self.publish();

        let mut heartbeat = HeartbeatTimer::new();
        heartbeat.follow(self.session.heartbeat());
        tokio::pin!(shutdown);

        loop {
            let tap_deadline = self.dispatcher.next_tap_deadline();

            tokio::select! {
                event = touch.next() => match event {
                    Some(Ok(event)) => self.on_touch_event(&event),
                    Some(Err(e)) => {
                        error!("Touch device error: {}", e);
                        break;
                    }
                    None => {
                        warn!("Touch input ended");
                        break;
                    }
                },

                frame = inbound.next() => {
                    apply_inbound_frame(&mut self.session, frame, Instant::now());
                }

                _ = heartbeat.tick(), if heartbeat.is_armed() => {
                    self.session.on_heartbeat_tick(Instant::now());
                }

                _ = sleep_until(tap_deadline.unwrap_or_else(Instant::now)), if tap_deadline.is_some() => {
                    let released = self.dispatcher.taps_due(Instant::now());
                    self.session.send_all(released);
                }

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }

            heartbeat.follow(self.session.heartbeat());
            self.publish();

            if self.session.state() == ConnectionState::Closed {
                break;
            }
        }

        if self.session.state() == ConnectionState::Open {
            let released = self.dispatcher.release_all();
            self.session.send_all(released);
        }
        self.session.close();
        heartbeat.disarm();
        self.publish();

        match tokio::time::timeout(WRITER_FLUSH_TIMEOUT, writer).await {
            Ok(Ok(())) => debug!("Writer finished"),
            Ok(Err(e)) => warn!("Writer task failed: {}", e),
            Err(_) => warn!("Writer did not finish within {:?}", WRITER_FLUSH_TIMEOUT),
        }

        if self.session.dropped_events() > 0 {
            info!("{} events were dropped while disconnected", self.session.dropped_events());
        }
        self.session.status()
    }

    fn on_touch_event(&mut self, event: &InputEvent) {
        let now = Instant::now();
        for contact in self.decoder.feed(event) {
            let events = self.dispatcher.handle(contact, now);
            self.session.send_all(events);
        }
    }

    fn publish(&self) {
        let status = self.session.status();
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}

/// Logs every status change until the runtime goes away.
pub async fn log_status(mut status: watch::Receiver<SessionStatus>) {
    while status.changed().await.is_ok() {
        let current = *status.borrow_and_update();
        match current.latency {
            Some(latency) => info!("Status: {} ({} ms)", current.state, latency.as_millis()),
            None => info!("Status: {}", current.state),
        }
    }
}
