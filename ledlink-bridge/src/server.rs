//! HTTP / WebSocket front end of the bridge.
//!
//! ```text
//! GET  /ws    WebSocket; each binary message is one delta payload
//! POST /send  raw application/octet-stream body, one delta payload
//! ```
//!
//! Both routes validate the payload length and hand the message to the
//! writer task over a bounded channel. Payloads are never modified.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use ledlink_core::{EncodedMessage, LedError};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    tx: mpsc::Sender<EncodedMessage>,
}

/// Why a payload was not forwarded.
#[derive(Debug)]
pub enum Rejected {
    /// Length is not a multiple of the record size.
    Invalid(LedError),
    /// The writer task is gone.
    WriterClosed,
}

impl AppState {
    pub fn new(tx: mpsc::Sender<EncodedMessage>) -> Self {
        Self { tx }
    }

    /// Validate `payload` and queue it for the writer. Empty payloads are
    /// accepted and dropped.
    pub async fn forward(&self, payload: Bytes) -> Result<usize, Rejected> {
        let message = EncodedMessage::from_bytes(payload).map_err(Rejected::Invalid)?;
        if message.is_empty() {
            return Ok(0);
        }
        let records = message.record_count();
        self.tx
            .send(message)
            .await
            .map_err(|_| Rejected::WriterClosed)?;
        Ok(records)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/send", post(send_handler))
        .with_state(state)
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!("bridge listening on {}", listener.local_addr()?);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}

// ── POST /send ───────────────────────────────────────────────────

async fn send_handler(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let len = body.len();
    match state.forward(body).await {
        Ok(records) => {
            trace!(len, records, "queued http payload");
            StatusCode::OK
        }
        Err(Rejected::Invalid(e)) => {
            warn!(len, "rejected http payload: {e}");
            StatusCode::BAD_REQUEST
        }
        Err(Rejected::WriterClosed) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

// ── GET /ws ──────────────────────────────────────────────────────

async fn ws_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

async fn handle_socket(mut socket: WebSocket, state: AppState, peer: SocketAddr) {
    info!(?peer, "sender connected");
    let mut forwarded: u64 = 0;

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Binary(data)) => {
                let len = data.len();
                match state.forward(data).await {
                    Ok(_) => forwarded += 1,
                    Err(Rejected::Invalid(e)) => warn!(?peer, len, "dropping message: {e}"),
                    Err(Rejected::WriterClosed) => {
                        warn!(?peer, "writer closed; dropping connection");
                        break;
                    }
                }
            }
            Ok(Message::Text(text)) => {
                warn!(?peer, len = text.as_str().len(), "ignoring text frame");
            }
            // Pongs are queued by the protocol layer itself.
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(frame)) => {
                debug!(?peer, ?frame, "close frame");
                break;
            }
            Err(err) => {
                warn!(?err, ?peer, "ws recv error");
                break;
            }
        }
    }

    info!(?peer, forwarded, "sender disconnected");
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state(queue: usize) -> (AppState, mpsc::Receiver<EncodedMessage>) {
        let (tx, rx) = mpsc::channel(queue);
        (AppState::new(tx), rx)
    }

    fn post_send(body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/send")
            .header("content-type", "application/octet-stream")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn forward_validates_length() {
        let (state, mut rx) = state(4);
        assert!(matches!(
            state.forward(Bytes::from_static(&[1, 2, 3])).await,
            Err(Rejected::Invalid(LedError::TruncatedMessage { len: 3, .. }))
        ));
        assert_eq!(
            state.forward(Bytes::from_static(&[0, 1, 2, 3, 4])).await.unwrap(),
            1
        );
        assert_eq!(rx.recv().await.unwrap().as_bytes(), &[0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn empty_payload_is_not_queued() {
        let (state, mut rx) = state(4);
        assert_eq!(state.forward(Bytes::new()).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn writer_gone_is_reported() {
        let (state, rx) = state(1);
        drop(rx);
        assert!(matches!(
            state.forward(Bytes::from_static(&[0; 5])).await,
            Err(Rejected::WriterClosed)
        ));
    }

    #[tokio::test]
    async fn post_send_accepts_valid_payload() {
        let (state, mut rx) = state(4);
        let res = router(state)
            .oneshot(post_send(&[0, 0, 10, 0, 0, 0, 2, 0, 5, 0]))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap().record_count(), 2);
    }

    #[tokio::test]
    async fn post_send_rejects_truncated_payload() {
        let (state, mut rx) = state(4);
        let res = router(state)
            .oneshot(post_send(&[0, 0, 10, 0]))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }
}
