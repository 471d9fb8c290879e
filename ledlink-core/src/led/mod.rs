//! # led: frame-delta pipeline for an LED matrix
//!
//! Turns a small RGBA raster, rendered once per tick, into a compact list
//! of changed pixels and pushes it to a bridge that drives the LEDs over a
//! serial line.
//!
//! ## Architecture
//!
//! ```text
//! SENDER                                        BRIDGE
//! ┌──────────────────────────┐                ┌───────────────────────┐
//! │ FrameSource::fill        │                │ /ws or POST /send     │
//! │   ↓                      │                │   ↓                   │
//! │ FrameBufferPair          │   WebSocket    │ DeltaCodec            │
//! │   ↓                      │ ──────────►    │   ↓                   │
//! │ DeltaEncoder             │  5-byte recs   │ serial device / LEDs  │
//! │   ↓                      │                │                       │
//! │ TransportSender::send    │                │ (LedMatrix dry run)   │
//! └──────────────────────────┘                └───────────────────────┘
//! ```
//!
//! ## Sub-modules
//!
//! | Module       | Purpose                                           |
//! |------------- |---------------------------------------------------|
//! | `raster`     | RGBA rasters and the current/previous buffer pair |
//! | `delta`      | Per-pixel change detection                        |
//! | `message`    | 5-byte record wire format                         |
//! | `matrix`     | Receiver-side LED state model                     |
//! | `source`     | Frame sources and built-in scenes                 |
//! | `transport`  | Fire-and-forget sender over a `Connection`        |
//! | `throughput` | Rolling send-rate meter                           |
//! | `pipeline`   | Per-tick driver and paced run loop                |

pub mod delta;
pub mod matrix;
pub mod message;
pub mod pipeline;
pub mod raster;
pub mod source;
pub mod throughput;
pub mod transport;

// ── Re-exports ───────────────────────────────────────────────────

pub use delta::{DeltaEncoder, DeltaRecord, DiffOptions};
pub use matrix::LedMatrix;
pub use message::{EncodedMessage, RECORD_SIZE, decode_records};
pub use pipeline::{LedPipeline, PipelineConfig, TickOutcome, TickReport};
pub use raster::{FrameBufferPair, MAX_PIXELS, Raster, RasterSize};
pub use source::{FrameSource, Scene, Tick};
pub use throughput::ThroughputMeter;
pub use transport::{AtomicReadyState, Connection, ReadyState, SendOutcome, TransportSender};
