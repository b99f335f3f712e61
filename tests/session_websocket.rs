//! End-to-end tests of the event loop against a local WebSocket receiver.

use std::io;
use std::time::Duration;

use evdev::{AbsoluteAxisType, EventType, InputEvent, Synchronization};
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use touch_gamepad::config::Config;
use touch_gamepad::input::NoHaptics;
use touch_gamepad::runtime::Runtime;
use touch_gamepad::session::{ConnectionState, SessionManager, SessionStatus, StaticIdentity, WsOutbox};
use touch_gamepad::touch::{AxisRange, ContactDecoder, Dispatcher, SurfaceMapping};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// What the fake receiver saw.
struct Received {
    uri: String,
    /// Every text frame except pings, in order
    events: Vec<Value>,
    pings: usize,
    closed_by_client: bool,
}

/// Accepts one client, answers pings with pongs and records the rest.
async fn spawn_receiver(close_immediately: bool) -> (String, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut uri = String::new();
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            uri = req.uri().to_string();
            Ok(resp)
        })
        .await
        .unwrap();

        let mut received = Received {
            uri,
            events: Vec::new(),
            pings: 0,
            closed_by_client: false,
        };

        if close_immediately {
            ws.close(None).await.unwrap();
            // Drain until the client acknowledges
            while let Some(Ok(_)) = ws.next().await {}
            return received;
        }

        while let Some(frame) = ws.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let value: Value = serde_json::from_str(&text).unwrap();
                    if value["kind"] == "ping" {
                        received.pings += 1;
                        ws.send(Message::Text(r#"{"kind":"pong"}"#.to_string())).await.unwrap();
                    } else {
                        received.events.push(value);
                    }
                }
                Ok(Message::Close(_)) => {
                    received.closed_by_client = true;
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
        received
    });

    (origin, handle)
}

fn runtime(origin: &str, heartbeat: Duration) -> (Runtime<NoHaptics>, watch::Receiver<SessionStatus>) {
    let config = Config::default();
    let session: SessionManager<WsOutbox> =
        SessionManager::new(origin, &StaticIdentity("it-client".to_string()), heartbeat).unwrap();

    // Raw coordinates equal surface coordinates
    let decoder = ContactDecoder::new(SurfaceMapping {
        x_range: AxisRange { min: 0, max: 1280 },
        y_range: AxisRange { min: 0, max: 720 },
        width: 1280.0,
        height: 720.0,
    });
    let dispatcher = Dispatcher::from_config(&config, NoHaptics);

    Runtime::new(session, dispatcher, decoder, Duration::from_secs(2))
}

fn abs(axis: AbsoluteAxisType, value: i32) -> io::Result<InputEvent> {
    Ok(InputEvent::new(EventType::ABSOLUTE, axis.0, value))
}

fn syn() -> io::Result<InputEvent> {
    Ok(InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0))
}

fn axis(code: u64, value: i64) -> Value {
    serde_json::json!({ "kind": "axis", "code": code, "value": value })
}

#[tokio::test]
async fn test_stream_touches_measure_latency_and_close() {
    let (origin, receiver) = spawn_receiver(false).await;
    let (runtime, mut status) = runtime(&origin, Duration::from_millis(50));

    let (mut touch_tx, touch_rx) = mpsc::unbounded();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let driver = async move {
        // Finger down on the resting centre of the stick, then full right
        for event in [
            abs(AbsoluteAxisType::ABS_MT_SLOT, 0),
            abs(AbsoluteAxisType::ABS_MT_TRACKING_ID, 1),
            abs(AbsoluteAxisType::ABS_MT_POSITION_X, 320),
            abs(AbsoluteAxisType::ABS_MT_POSITION_Y, 360),
            syn(),
            abs(AbsoluteAxisType::ABS_MT_POSITION_X, 420),
            syn(),
        ] {
            touch_tx.send(event).await.unwrap();
        }

        status.wait_for(|s| s.latency.is_some()).await.unwrap();
        shutdown_tx.send(()).unwrap();
        touch_tx
    };

    let shutdown = async {
        let _ = shutdown_rx.await;
    };

    let (last, _touch_tx) = tokio::time::timeout(TEST_TIMEOUT, async {
        tokio::join!(runtime.run(touch_rx, shutdown), driver)
    })
    .await
    .unwrap();

    assert_eq!(last.state, ConnectionState::Closed);
    assert!(last.latency.is_some());

    let received = tokio::time::timeout(TEST_TIMEOUT, receiver).await.unwrap().unwrap();
    assert_eq!(received.uri, "/ws?client_id=it-client");
    assert!(received.pings >= 1);
    assert!(received.closed_by_client);
    assert_eq!(
        received.events,
        vec![
            axis(0, 0),
            axis(1, 0),
            axis(0, 32767),
            axis(1, 0),
            // Held stick is released on shutdown
            axis(0, 0),
            axis(1, 0),
        ]
    );
}

#[tokio::test]
async fn test_remote_close_ends_the_loop() {
    let (origin, receiver) = spawn_receiver(true).await;
    let (runtime, _status) = runtime(&origin, Duration::from_millis(5000));

    let last = tokio::time::timeout(
        TEST_TIMEOUT,
        runtime.run(futures::stream::pending(), std::future::pending::<()>()),
    )
    .await
    .unwrap();

    assert_eq!(last.state, ConnectionState::Closed);
    assert_eq!(last.latency, None);
    tokio::time::timeout(TEST_TIMEOUT, receiver).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_connect_failure_is_closed() {
    // Grab a free port, then release it so nothing is listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let (runtime, status) = runtime(&origin, Duration::from_millis(5000));
    let last = tokio::time::timeout(
        TEST_TIMEOUT,
        runtime.run(futures::stream::pending(), std::future::pending::<()>()),
    )
    .await
    .unwrap();

    assert_eq!(last.state, ConnectionState::Closed);
    assert_eq!(status.borrow().state, ConnectionState::Closed);
}
