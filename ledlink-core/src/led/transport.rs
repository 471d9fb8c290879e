//! Fire-and-forget sender for encoded delta messages.
//!
//! A message goes out as one binary frame only when it is non-empty and
//! the connection reports exactly [`ReadyState::Open`]. Everything else is
//! a silent skip for this tick: no retry, no queueing on our side, and a
//! transport error is logged rather than returned.

use std::sync::atomic::{AtomicU8, Ordering};

use bytes::Bytes;
use tracing::{trace, warn};

use crate::error::TransportError;
use crate::led::message::EncodedMessage;

// ── ReadyState ───────────────────────────────────────────────────

/// Connection lifecycle, numbered like the WebSocket `readyState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    pub const fn from_u8(v: u8) -> Self {
        match v {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Lock-free cell holding a [`ReadyState`], shared between a connection
/// task and its handles.
#[derive(Debug)]
pub struct AtomicReadyState(AtomicU8);

impl AtomicReadyState {
    pub fn new(state: ReadyState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ReadyState {
        ReadyState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ReadyState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

// ── Connection ───────────────────────────────────────────────────

/// A bidirectional byte-stream connection that can carry binary frames.
///
/// `send_binary` must not block: implementations buffer internally and
/// report backpressure as an error.
pub trait Connection {
    fn ready_state(&self) -> ReadyState;

    fn send_binary(&self, payload: Bytes) -> Result<(), TransportError>;

    /// Number of times the connection has reached `Open`. A change tells
    /// the sender that the receiver may have lost its state.
    fn session(&self) -> u64 {
        0
    }
}

impl<C: Connection + ?Sized> Connection for std::sync::Arc<C> {
    fn ready_state(&self) -> ReadyState {
        (**self).ready_state()
    }

    fn send_binary(&self, payload: Bytes) -> Result<(), TransportError> {
        (**self).send_binary(payload)
    }

    fn session(&self) -> u64 {
        (**self).session()
    }
}

// ── SendOutcome ──────────────────────────────────────────────────

/// What happened to one tick's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Handed to the connection; carries the payload size.
    Sent(usize),
    /// Nothing changed this tick.
    SkippedEmpty,
    /// The connection was connecting, closing or closed.
    SkippedNotOpen(ReadyState),
    /// The connection rejected the frame; already logged.
    Failed,
}

// ── TransportSender ──────────────────────────────────────────────

/// Pushes encoded messages over a shared connection.
pub struct TransportSender<C> {
    connection: C,
    messages_sent: u64,
    bytes_sent: u64,
    skipped: u64,
    failed: u64,
}

impl<C: Connection> TransportSender<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            messages_sent: 0,
            bytes_sent: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Transmit `message` if it is non-empty and the connection is open.
    pub fn send(&mut self, message: &EncodedMessage) -> SendOutcome {
        if message.is_empty() {
            self.skipped += 1;
            trace!("no changed pixels; nothing to send");
            return SendOutcome::SkippedEmpty;
        }

        let state = self.connection.ready_state();
        if state != ReadyState::Open {
            self.skipped += 1;
            trace!(?state, "connection not open; skipping send");
            return SendOutcome::SkippedNotOpen(state);
        }

        match self.connection.send_binary(message.to_bytes()) {
            Ok(()) => {
                self.messages_sent += 1;
                self.bytes_sent += message.len() as u64;
                SendOutcome::Sent(message.len())
            }
            Err(e) => {
                self.failed += 1;
                warn!("send failed: {e}");
                SendOutcome::Failed
            }
        }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Total messages handed to the connection.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent
    }

    /// Total payload bytes handed to the connection.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Ticks skipped because the message was empty or the connection not open.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

// ── Tests ────────────────────────────────────────────────────────
