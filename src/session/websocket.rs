//! # WebSocket Transport
//!
//! The socket is split once connected. The write half is owned by a
//! writer task fed through a bounded channel, so the session can queue
//! frames synchronously from the event loop. When the socket stalls and
//! the queue fills, new frames are dropped with a warning rather than
//! piling up stale input. The read half is polled by
//! the event loop and each frame is handed to [`apply_inbound_frame`].

use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::manager::SessionManager;
use super::transport::Transport;
use crate::error::{GamepadError, Result};
use crate::protocol::Endpoint;

/// Frames queued for the writer before new ones are dropped.
pub const OUTBOX_CAPACITY: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read half of the receiver connection.
pub type Inbound = SplitStream<WsStream>;

/// [`Transport`] queuing frames to the writer task.
#[derive(Debug, Clone)]
pub struct WsOutbox {
    tx: Option<mpsc::Sender<Message>>,
}

impl WsOutbox {
    fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx: Some(tx) }
    }
}

impl Transport for WsOutbox {
    fn send_text(&mut self, text: String) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(GamepadError::TransportClosed)?;
        match tx.try_send(Message::Text(text)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                warn!("Outbox full ({} frames), dropping frame", OUTBOX_CAPACITY);
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(GamepadError::TransportClosed),
        }
    }

    fn close(&mut self) {
        if let Some(tx) = self.tx.take() {
            // Dropping the sender still ends the writer, which closes the sink
            if let Err(TrySendError::Full(_)) = tx.try_send(Message::Close(None)) {
                debug!("Outbox full, closing after queued frames");
            }
        }
    }
}

/// An established connection.
pub struct Connection {
    /// Write side, handed to the session.
    pub outbox: WsOutbox,
    /// Read side, polled by the event loop.
    pub inbound: Inbound,
    /// Writer task; completes after the close frame is flushed.
    pub writer: JoinHandle<()>,
}

/// Opens the WebSocket to `endpoint`, giving up after `timeout`.
///
/// # Errors
///
/// Returns `WebSocket` if the handshake fails, or `Io` with kind
/// `TimedOut` if it does not complete in time.
pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Connection> {
    info!("Connecting to {}", endpoint);

    let (stream, response) = tokio::time::timeout(timeout, connect_async(endpoint.url()))
        .await
        .map_err(|_| {
            GamepadError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("connection to {} timed out after {:?}", endpoint, timeout),
            ))
        })??;
    debug!("Handshake complete (HTTP {})", response.status());

    let (sink, inbound) = stream.split();
    let (tx, rx) = mpsc::channel(OUTBOX_CAPACITY);
    let writer = tokio::spawn(write_loop(sink, rx));

    Ok(Connection {
        outbox: WsOutbox::new(tx),
        inbound,
        writer,
    })
}

async fn write_loop(mut sink: SplitSink<WsStream, Message>, mut rx: mpsc::Receiver<Message>) {
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = sink.send(message).await {
            debug!("WebSocket write failed: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
    trace!("Writer task finished");
}

/// Feeds one item read from the socket into the session.
///
/// `None` means the stream ended, which is treated like a remote close.
pub fn apply_inbound_frame<T: Transport>(
    session: &mut SessionManager<T>,
    frame: Option<std::result::Result<Message, WsError>>,
    now: Instant,
) {
    match frame {
        Some(Ok(Message::Text(text))) => session.on_text(&text, now),
        Some(Ok(Message::Close(frame))) => {
            if let Some(frame) = frame {
                debug!("Close frame: {} {}", frame.code, frame.reason);
            }
            session.on_remote_close();
        }
        Some(Ok(Message::Binary(data))) => {
            warn!("Ignoring {}-byte binary frame", data.len());
        }
        Some(Ok(_)) => {}
        Some(Err(e)) => session.on_transport_error(&GamepadError::WebSocket(e)),
        None => session.on_remote_close(),
    }
}
