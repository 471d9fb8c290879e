//! Integration tests: sender connection through a live bridge into a
//! byte-stream sink standing in for the serial port.

use std::time::Duration;

use futures::SinkExt;
use ledlink_bridge::server::{router, serve};
use ledlink_bridge::sink::StreamSink;
use ledlink_bridge::spawn_writer;
use ledlink_core::{
    Connection, LedMatrix, LedPipeline, PipelineConfig, RasterSize, ReconnectPolicy, Scene, Tick,
    WsConnection,
};
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

// ── Helpers ──────────────────────────────────────────────────────

struct Harness {
    url: String,
    /// Host side of the fake serial port.
    device: DuplexStream,
    shutdown: oneshot::Sender<()>,
}

async fn start_bridge() -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    let (port, device) = tokio::io::duplex(64 * 1024);
    let (state, _writer) = spawn_writer(Box::new(StreamSink::new(port)), 16);

    let (shutdown, rx) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, router(state), async {
        rx.await.ok();
    }));

    Harness {
        url,
        device,
        shutdown,
    }
}

async fn read_exact(device: &mut DuplexStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0; n];
    tokio::time::timeout(Duration::from_secs(5), device.read_exact(&mut buf))
        .await
        .expect("timeout")
        .unwrap();
    buf
}

// ── Tests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ws_payload_reaches_serial_unchanged() {
    let mut h = start_bridge().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(h.url.as_str()).await.unwrap();

    ws.send(Message::Binary(vec![0, 0, 10, 0, 0, 0, 2, 0, 5, 0].into()))
        .await
        .unwrap();
    assert_eq!(
        read_exact(&mut h.device, 10).await,
        [0, 0, 10, 0, 0, 0, 2, 0, 5, 0]
    );
    h.shutdown.send(()).ok();
}

#[tokio::test]
async fn test_invalid_and_text_messages_are_dropped() {
    let mut h = start_bridge().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(h.url.as_str()).await.unwrap();

    ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
    ws.send(Message::Text("hello".into())).await.unwrap();
    ws.send(Message::Binary(vec![0, 4, 9, 9, 9].into()))
        .await
        .unwrap();

    // Only the valid record made it; the connection stayed up.
    assert_eq!(read_exact(&mut h.device, 5).await, [0, 4, 9, 9, 9]);
    h.shutdown.send(()).ok();
}

#[tokio::test]
async fn test_pipeline_drives_device_through_bridge() {
    let mut h = start_bridge().await;

    let conn = WsConnection::spawn(h.url.clone(), ReconnectPolicy::Never, 16);
    assert!(conn.wait_open(Duration::from_secs(5)).await);

    let config = PipelineConfig {
        size: RasterSize::new(4, 4).unwrap(),
        resync_on_connect: true,
        ..PipelineConfig::default()
    };
    let mut pipeline = LedPipeline::new(Scene::Grid, conn, config);
    let mut matrix = LedMatrix::new(config.size);

    let mut expected = 0;
    for frame in 0..5 {
        let tick = Tick {
            frame,
            time: Duration::from_millis(frame * 50),
            delta: Duration::from_millis(50),
        };
        pipeline.tick(&tick).unwrap();
        let sent = pipeline.sender().bytes_sent() as usize;
        let bytes = read_exact(&mut h.device, sent - expected).await;
        expected = sent;
        matrix.apply_message(&bytes).unwrap();
    }

    assert!(pipeline.sender().connection().session() >= 1);
    assert!(matrix.matches_rgb(pipeline.buffers().current()));
    h.shutdown.send(()).ok();
}
