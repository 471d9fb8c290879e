//! Domain-specific error types for the LED link.
//!
//! Library operations return `Result<T, LedError>`; the transport layer
//! has its own [`TransportError`] because send failures are logged and
//! swallowed rather than propagated.

use thiserror::Error;

/// The canonical error type for the frame pipeline.
#[derive(Debug, Error)]
pub enum LedError {
    // ── Configuration Errors ─────────────────────────────────────
    /// The raster holds more pixels than a 16-bit LED index can address.
    #[error("raster of {pixels} pixels exceeds wire capacity of {max} pixels")]
    CapacityExceeded { pixels: usize, max: usize },

    /// A raster dimension was zero.
    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    // ── Frame Errors ─────────────────────────────────────────────
    /// Two rasters compared against each other have different sizes.
    #[error("raster size mismatch: {current_w}x{current_h} vs {previous_w}x{previous_h}")]
    SizeMismatch {
        current_w: u32,
        current_h: u32,
        previous_w: u32,
        previous_h: u32,
    },

    /// A pixel buffer did not have the expected byte length.
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidBufferLength { expected: usize, actual: usize },

    /// The frame source could not produce a full raster this tick.
    #[error("frame source failed: {0}")]
    FrameSource(String),

    // ── Wire Errors ──────────────────────────────────────────────
    /// An encoded message length is not a multiple of the record size.
    #[error("truncated message: {len} bytes is not a multiple of {record_size}")]
    TruncatedMessage { len: usize, record_size: usize },

    // ── I/O Errors ───────────────────────────────────────────────
    /// The underlying I/O layer reported an error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

// ── TransportError ────────────────────────────────────────────────

/// Failure of a single non-blocking send.
///
/// None of these are fatal: the sender logs them and tries again on the
/// next tick.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is not in the `Open` state.
    #[error("connection is not open")]
    NotOpen,

    /// The outbound queue is full.
    #[error("send queue full")]
    Backpressure,

    /// The connection task has shut down.
    #[error("connection closed")]
    Closed,

    /// The WebSocket layer reported an error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl<T> From<tokio::sync::mpsc::error::TrySendError<T>> for TransportError {
    fn from(e: tokio::sync::mpsc::error::TrySendError<T>) -> Self {
        match e {
            tokio::sync::mpsc::error::TrySendError::Full(_) => TransportError::Backpressure,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        }
    }
}

impl From<String> for LedError {
    fn from(s: String) -> Self {
        LedError::Config(s)
    }
}
