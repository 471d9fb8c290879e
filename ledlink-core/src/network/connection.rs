use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::led::transport::{AtomicReadyState, Connection, ReadyState};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What to do after the WebSocket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Stay closed; every later tick is skipped.
    Never,
    /// Reopen after `initial`, doubling up to `max` on each failed attempt.
    Backoff { initial: Duration, max: Duration },
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy::Backoff {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: AtomicReadyState,
    session: AtomicU64,
}

/// A long-lived WebSocket client to the bridge.
///
/// A background task owns the socket; this handle only queues outbound
/// frames and reads the published ready state, so `send_binary` never
/// blocks.
#[derive(Debug)]
pub struct WsConnection {
    shared: Arc<Shared>,
    tx: mpsc::Sender<Bytes>,
    task: JoinHandle<()>,
}

impl WsConnection {
    /// Start connecting to `url` in the background.
    ///
    /// `queue` bounds the number of frames buffered between the pipeline
    /// and the socket writer.
    pub fn spawn(url: impl Into<String>, policy: ReconnectPolicy, queue: usize) -> Self {
        let url = url.into();
        let shared = Arc::new(Shared {
            state: AtomicReadyState::new(ReadyState::Connecting),
            session: AtomicU64::new(0),
        });
        let (tx, rx) = mpsc::channel(queue.max(1));
        let task = tokio::spawn(drive(url, policy, Arc::clone(&shared), rx));
        Self { shared, tx, task }
    }

    /// Poll until the connection is open or `timeout` elapses.
    pub async fn wait_open(&self, timeout: Duration) -> bool {
        let poll = async {
            while self.ready_state() != ReadyState::Open {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    /// Stop the background task and mark the connection closed.
    pub fn close(&self) {
        self.task.abort();
        self.shared.state.store(ReadyState::Closed);
    }
}

impl Connection for WsConnection {
    fn ready_state(&self) -> ReadyState {
        self.shared.state.load()
    }

    fn send_binary(&self, payload: Bytes) -> Result<(), TransportError> {
        self.tx.try_send(payload)?;
        Ok(())
    }

    fn session(&self) -> u64 {
        self.shared.session.load(Ordering::Acquire)
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ── Background task ──────────────────────────────────────────────

enum Ended {
    /// The peer closed or the socket failed.
    Peer,
    /// Every handle was dropped.
    HandleDropped,
}

async fn drive(
    url: String,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    mut rx: mpsc::Receiver<Bytes>,
) {
    let mut backoff = match policy {
        ReconnectPolicy::Backoff { initial, .. } => initial,
        ReconnectPolicy::Never => Duration::ZERO,
    };

    loop {
        shared.state.store(ReadyState::Connecting);
        debug!(%url, "connecting");

        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                // Frames queued for a previous session are stale.
                while rx.try_recv().is_ok() {}

                let session = shared.session.fetch_add(1, Ordering::AcqRel) + 1;
                shared.state.store(ReadyState::Open);
                info!(%url, session, "websocket open");
                if let ReconnectPolicy::Backoff { initial, .. } = policy {
                    backoff = initial;
                }

                match pump(ws, &mut rx, &shared).await {
                    Ok(Ended::HandleDropped) => {
                        shared.state.store(ReadyState::Closed);
                        return;
                    }
                    Ok(Ended::Peer) => info!(%url, "websocket closed"),
                    Err(e) => warn!(%url, "websocket error: {e}"),
                }
            }
            Err(e) => warn!(%url, "connect failed: {e}"),
        }

        shared.state.store(ReadyState::Closed);

        match policy {
            ReconnectPolicy::Never => return,
            ReconnectPolicy::Backoff { max, .. } => {
                debug!(delay = ?backoff, "reconnecting after delay");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(max);
            }
        }
    }
}

/// Shuttle queued frames out and log whatever the bridge sends back.
async fn pump(
    ws: WsStream,
    rx: &mut mpsc::Receiver<Bytes>,
    shared: &Shared,
) -> Result<Ended, TransportError> {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            out = rx.recv() => match out {
                Some(payload) => sink.send(Message::Binary(payload)).await?,
                None => {
                    shared.state.store(ReadyState::Closing);
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(Ended::HandleDropped);
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => debug!(text = text.as_str(), "message from bridge"),
                Some(Ok(Message::Binary(data))) => debug!(len = data.len(), "binary message from bridge"),
                Some(Ok(Message::Close(frame))) => {
                    shared.state.store(ReadyState::Closing);
                    debug!(?frame, "close frame from bridge");
                    return Ok(Ended::Peer);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(Ended::Peer),
            },
        }
    }
}
