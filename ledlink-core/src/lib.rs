//! # ledlink-core
//!
//! Core library for driving an LED matrix from rendered frames.
//!
//! This crate contains:
//! - **Frames**: `Raster`, `RasterSize`, and the `FrameBufferPair` swapped every tick
//! - **Delta codec**: `DeltaEncoder` and the 5-byte record `EncodedMessage` wire format
//! - **Codec**: `DeltaCodec` for record streams via `tokio_util`
//! - **Transport**: `TransportSender` over any `Connection`, plus `WsConnection`
//! - **Pipeline**: `LedPipeline`, the paced per-tick driver, and built-in `Scene`s
//! - **Receiver model**: `LedMatrix`, the bridge-side view of the LEDs
//! - **Error**: `LedError` / `TransportError`: typed `thiserror`-based errors

pub mod codec;
pub mod error;
pub mod led;
pub mod network;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::DeltaCodec;
pub use error::{LedError, TransportError};
pub use network::{ReconnectPolicy, WsConnection};

pub use led::{
    Connection, DeltaEncoder, DeltaRecord, DiffOptions, EncodedMessage, FrameBufferPair,
    FrameSource, LedMatrix, LedPipeline, MAX_PIXELS, PipelineConfig, RECORD_SIZE, Raster,
    RasterSize, ReadyState, Scene, SendOutcome, Tick, TickOutcome, TickReport, TransportSender,
    decode_records,
};
