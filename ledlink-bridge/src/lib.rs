//! # ledlink-bridge: WebSocket/HTTP to serial bridge
//!
//! Accepts delta messages from the sender on `GET /ws` (binary WebSocket
//! messages) or `POST /send` (raw body), checks that each is a whole
//! number of 5-byte records, and writes it unchanged to the LED
//! controller's serial port. A single writer task owns the port.
//!
//! With `serial.dry_run` the messages are applied to an in-memory LED
//! matrix instead, for running without hardware.

pub mod config;
pub mod server;
pub mod sink;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use ledlink_core::LedError;

use crate::config::BridgeConfig;
use crate::server::AppState;
use crate::sink::{DryRunSink, FrameSink, SerialSink, run_writer};

/// Open the sink the configuration asks for.
pub fn open_sink(config: &BridgeConfig) -> Result<Box<dyn FrameSink>, LedError> {
    if config.serial.dry_run {
        return Ok(Box::new(DryRunSink::new(config.raster_size()?)));
    }
    Ok(Box::new(SerialSink::open(
        &config.serial.path,
        config.serial.baud_rate,
    )?))
}

/// Start the writer task for `sink` and return the handler state feeding it.
///
/// The task ends once every clone of the returned state is dropped and
/// yields the number of messages written.
pub fn spawn_writer(sink: Box<dyn FrameSink>, queue: usize) -> (AppState, JoinHandle<u64>) {
    let (tx, rx) = mpsc::channel(queue.max(1));
    let writer = tokio::spawn(run_writer(sink, rx));
    (AppState::new(tx), writer)
}
