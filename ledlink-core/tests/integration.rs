//! Integration tests: pipeline and WebSocket connection against a real
//! WebSocket server on localhost.

use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::StreamExt;
use ledlink_core::{
    Connection, LedMatrix, LedPipeline, PipelineConfig, RasterSize, ReadyState, ReconnectPolicy,
    Scene, SendOutcome, Tick, TickOutcome, WsConnection, decode_records,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

// ── Helpers ──────────────────────────────────────────────────────

/// Bind a listener on an OS-assigned port and return it with its ws:// URL.
async fn ephemeral_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}/"))
}

/// Accept WebSocket clients and forward every binary payload received.
/// Each accepted client is served until it disconnects or, when
/// `drop_after` is set, until that many frames arrived.
fn spawn_server(
    listener: TcpListener,
    drop_after: Option<usize>,
) -> mpsc::UnboundedReceiver<Vec<u8>> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let mut seen = 0;
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Binary(data) = msg {
                    let _ = tx.send(data.to_vec());
                    seen += 1;
                    if drop_after == Some(seen) {
                        break;
                    }
                }
            }
        }
    });
    rx
}

fn tick(frame: u64) -> Tick {
    Tick {
        frame,
        time: Duration::from_millis(frame * 50),
        delta: Duration::from_millis(50),
    }
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Vec<u8>>) -> Vec<u8> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timeout")
        .expect("server gone")
}

// ── Pipeline over WebSocket ──────────────────────────────────────

#[tokio::test]
async fn test_pipeline_delivers_deltas() {
    let (listener, url) = ephemeral_listener().await;
    let mut frames = spawn_server(listener, None);

    let conn = WsConnection::spawn(url, ReconnectPolicy::Never, 16);
    assert!(conn.wait_open(Duration::from_secs(5)).await);

    let config = PipelineConfig {
        size: RasterSize::new(8, 8).unwrap(),
        ..PipelineConfig::default()
    };
    let mut pipeline = LedPipeline::new(Scene::Dots, conn, config);
    let mut matrix = LedMatrix::new(config.size);

    for f in 0..10 {
        let report = pipeline.tick(&tick(f)).unwrap();
        if let TickOutcome::Delta {
            send: SendOutcome::Sent(len),
            ..
        } = report.outcome
        {
            let payload = recv(&mut frames).await;
            assert_eq!(payload.len(), len);
            assert_eq!(payload.len() % 5, 0);
            matrix.apply_message(&payload).unwrap();
        }
        assert!(matrix.matches_rgb(pipeline.buffers().current()));
    }
}

#[tokio::test]
async fn test_static_scene_sends_nothing_after_first_frame() {
    let (listener, url) = ephemeral_listener().await;
    let mut frames = spawn_server(listener, None);

    let conn = WsConnection::spawn(url, ReconnectPolicy::Never, 16);
    assert!(conn.wait_open(Duration::from_secs(5)).await);

    let config = PipelineConfig {
        size: RasterSize::new(2, 2).unwrap(),
        ..PipelineConfig::default()
    };
    let mut pipeline = LedPipeline::new(Scene::Solid([10, 0, 0]), conn, config);

    pipeline.tick(&tick(0)).unwrap();
    let first = recv(&mut frames).await;
    assert_eq!(
        decode_records(&first).unwrap().len(),
        4,
        "every pixel changed from black"
    );

    for f in 1..5 {
        let r = pipeline.tick(&tick(f)).unwrap();
        assert!(matches!(
            r.outcome,
            TickOutcome::Delta {
                changed: 0,
                send: SendOutcome::SkippedEmpty
            }
        ));
    }
    assert_eq!(pipeline.sender().messages_sent(), 1);
}

// ── Connection lifecycle ─────────────────────────────────────────

#[tokio::test]
async fn test_unreachable_endpoint_stays_closed() {
    // Bind and drop to get a port nothing listens on.
    let (listener, url) = ephemeral_listener().await;
    drop(listener);

    let conn = WsConnection::spawn(url, ReconnectPolicy::Never, 4);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(conn.ready_state(), ReadyState::Closed);
    assert_eq!(conn.session(), 0);
}

#[tokio::test]
async fn test_reconnect_opens_new_session_and_resyncs() {
    let (listener, url) = ephemeral_listener().await;
    // The server hangs up after every single frame.
    let mut frames = spawn_server(listener, Some(1));

    let policy = ReconnectPolicy::Backoff {
        initial: Duration::from_millis(20),
        max: Duration::from_millis(100),
    };
    let conn = WsConnection::spawn(url, policy, 16);
    assert!(conn.wait_open(Duration::from_secs(5)).await);

    let config = PipelineConfig {
        size: RasterSize::new(2, 2).unwrap(),
        resync_on_connect: true,
        ..PipelineConfig::default()
    };
    let mut pipeline = LedPipeline::new(Scene::Solid([1, 2, 3]), conn, config);

    let r = pipeline.tick(&tick(0)).unwrap();
    assert!(matches!(r.outcome, TickOutcome::Resync { .. }));
    assert_eq!(recv(&mut frames).await.len(), 20);

    // Keep ticking until the connection has cycled and a second resync went out.
    let mut resynced = false;
    for f in 1..200 {
        let r = pipeline.tick(&tick(f)).unwrap();
        if let TickOutcome::Resync {
            send: SendOutcome::Sent(_),
        } = r.outcome
        {
            resynced = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(resynced, "no resync after reconnect");
    assert!(pipeline.sender().connection().session() >= 2);
    assert_eq!(recv(&mut frames).await.len(), 20);
}

#[tokio::test]
async fn test_run_loop_paces_and_stops() {
    let (listener, url) = ephemeral_listener().await;
    let mut frames = spawn_server(listener, None);

    let conn = WsConnection::spawn(url, ReconnectPolicy::Never, 16);
    assert!(conn.wait_open(Duration::from_secs(5)).await);

    let config = PipelineConfig {
        size: RasterSize::new(8, 8).unwrap(),
        tick_rate: 20,
        ..PipelineConfig::default()
    };
    let mut pipeline = LedPipeline::new(Scene::Gradient, conn, config);
    let stop = pipeline.stop_handle();

    let handle = tokio::spawn(async move { pipeline.run().await });
    let first = recv(&mut frames).await;
    assert_eq!(first.len() % 5, 0);

    stop.store(false, Ordering::SeqCst);
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("run loop did not stop")
        .unwrap()
        .unwrap();
}
