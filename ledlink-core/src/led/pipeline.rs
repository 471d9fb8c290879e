//! Per-tick driver of the LED pipeline.
//!
//! Each tick runs the full stage:
//!
//! 1. [`FrameBufferPair::swap`] moves `current` into `previous`.
//! 2. The [`FrameSource`] refills `current`.
//! 3. [`DeltaEncoder`] diffs the pair into an encoded message.
//! 4. [`TransportSender`] pushes it if the connection is open.
//!
//! The loop runs in a Tokio task and stops when its `running` flag clears.
//! The flag starts set, so a stop requested before the loop begins holds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::LedError;
use crate::led::delta::{DeltaEncoder, DiffOptions};
use crate::led::raster::{FrameBufferPair, RasterSize};
use crate::led::source::{FrameSource, Tick};
use crate::led::throughput::ThroughputMeter;
use crate::led::transport::{Connection, ReadyState, SendOutcome, TransportSender};

// ── PipelineConfig ───────────────────────────────────────────────

/// Configuration for [`LedPipeline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Raster dimensions.
    pub size: RasterSize,
    /// Change test tuning.
    pub diff: DiffOptions,
    /// Ticks per second (1..=120).
    pub tick_rate: u32,
    /// Send every pixel on the first tick after the connection (re)opens,
    /// since the receiver missed whatever was skipped while it was down.
    pub resync_on_connect: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            size: RasterSize::default(),
            diff: DiffOptions::default(),
            tick_rate: 20,
            resync_on_connect: false,
        }
    }
}

// ── TickReport ───────────────────────────────────────────────────

/// Result of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The source failed; nothing was diffed or sent.
    SourceFailed,
    /// The delta was computed and handed to the sender.
    Delta {
        changed: usize,
        send: SendOutcome,
    },
    /// The whole raster was sent to resynchronise a fresh connection.
    Resync { send: SendOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    pub outcome: TickOutcome,
}

// ── LedPipeline ──────────────────────────────────────────────────

/// Owns the buffer pair exclusively; nothing else touches the rasters.
pub struct LedPipeline<S, C> {
    buffers: FrameBufferPair,
    encoder: DeltaEncoder,
    sender: TransportSender<C>,
    source: S,
    meter: ThroughputMeter,
    running: Arc<AtomicBool>,
    config: PipelineConfig,
    /// Connection session the receiver is known to be in sync with.
    synced_session: u64,
}

impl<S: FrameSource, C: Connection> LedPipeline<S, C> {
    pub fn new(source: S, connection: C, config: PipelineConfig) -> Self {
        Self {
            buffers: FrameBufferPair::new(config.size),
            encoder: DeltaEncoder::new(config.diff),
            sender: TransportSender::new(connection),
            source,
            meter: ThroughputMeter::new(),
            running: Arc::new(AtomicBool::new(true)),
            config,
            synced_session: 0,
        }
    }

    /// A cloneable handle that stops [`run`](Self::run) from another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn buffers(&self) -> &FrameBufferPair {
        &self.buffers
    }

    pub fn sender(&self) -> &TransportSender<C> {
        &self.sender
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one capture / diff / send step.
    ///
    /// A source failure skips the tick and is not an error; a raster size
    /// mismatch is, since it means the buffer invariants are broken.
    pub fn tick(&mut self, tick: &Tick) -> Result<TickReport, LedError> {
        self.buffers.swap();

        if let Err(e) = self.source.fill(tick, self.buffers.current_mut()) {
            self.buffers.rollback();
            warn!(frame = tick.frame, "frame source failed, skipping tick: {e}");
            return Ok(TickReport {
                frame: tick.frame,
                outcome: TickOutcome::SourceFailed,
            });
        }

        if self.needs_resync() {
            let message = self.encoder.encode_full(self.buffers.current());
            let send = self.sender.send(&message);
            if let SendOutcome::Sent(bytes) = send {
                self.meter.record(bytes as u64);
                self.synced_session = self.sender.connection().session();
                info!(frame = tick.frame, bytes, "sent full frame to resync receiver");
            }
            return Ok(TickReport {
                frame: tick.frame,
                outcome: TickOutcome::Resync { send },
            });
        }

        let message = self
            .encoder
            .encode(self.buffers.current(), self.buffers.previous())?;
        let changed = message.record_count();

        let send = self.sender.send(&message);
        if let SendOutcome::Sent(bytes) = send {
            self.meter.record(bytes as u64);
            debug!(frame = tick.frame, changed, bytes, "sent delta");
        }

        Ok(TickReport {
            frame: tick.frame,
            outcome: TickOutcome::Delta { changed, send },
        })
    }

    fn needs_resync(&self) -> bool {
        let conn = self.sender.connection();
        self.config.resync_on_connect
            && conn.ready_state() == ReadyState::Open
            && conn.session() != self.synced_session
    }

    /// Run the tick loop until the stop handle is cleared.
    ///
    /// ```no_run
    /// # use ledlink_core::led::pipeline::LedPipeline;
    /// # use ledlink_core::led::source::Scene;
    /// # use ledlink_core::network::WsConnection;
    /// # async fn example(mut p: LedPipeline<Scene, WsConnection>) {
    /// let handle = p.stop_handle();
    /// tokio::spawn(async move { p.run().await });
    /// // … later …
    /// handle.store(false, std::sync::atomic::Ordering::SeqCst);
    /// # }
    /// ```
    pub async fn run(&mut self) -> Result<(), LedError> {
        let interval = Duration::from_secs_f64(1.0 / self.config.tick_rate.clamp(1, 120) as f64);
        let started = Instant::now();
        let mut last_tick = started;
        let mut last_report = started;
        let mut frame: u64 = 0;

        info!(
            width = self.config.size.width,
            height = self.config.size.height,
            tick_rate = self.config.tick_rate,
            "pipeline started"
        );

        while self.running.load(Ordering::SeqCst) {
            let loop_start = Instant::now();
            let tick = Tick {
                frame,
                time: loop_start - started,
                delta: loop_start - last_tick,
            };
            last_tick = loop_start;

            self.tick(&tick)?;
            frame += 1;

            if last_report.elapsed() >= Duration::from_secs(1) {
                info!(
                    bytes_per_sec = self.meter.bytes_per_sec(),
                    messages_per_sec = self.meter.messages_per_sec(),
                    sent = self.sender.messages_sent(),
                    skipped = self.sender.skipped(),
                    state = ?self.sender.connection().ready_state(),
                    "throughput"
                );
                last_report = Instant::now();
            }

            Self::pace(loop_start, interval).await;
        }

        info!(frames = frame, "pipeline stopped");
        Ok(())
    }

    /// Signal the loop to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sleep for the remainder of the tick interval.
    async fn pace(loop_start: Instant, interval: Duration) {
        let elapsed = loop_start.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
