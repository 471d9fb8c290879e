//! Destinations for validated delta messages.
//!
//! The bridge forwards payloads bit-exact; a sink only decides where the
//! bytes end up. [`StreamSink`] writes to any byte stream (the serial
//! device in production), [`DryRunSink`] applies them to an in-memory
//! [`LedMatrix`] for running without hardware.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use ledlink_core::{DeltaCodec, EncodedMessage, LedError, LedMatrix, RasterSize};

/// Where the writer task puts each message.
#[async_trait]
pub trait FrameSink: Send {
    async fn write(&mut self, message: EncodedMessage) -> Result<(), LedError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

// ── StreamSink ───────────────────────────────────────────────────

/// Writes messages unchanged to a byte stream.
pub struct StreamSink<W> {
    framed: FramedWrite<W, DeltaCodec>,
    /// Task echoing whatever the device prints back.
    reader: Option<JoinHandle<()>>,
}

/// The production sink: the LED controller's serial port.
pub type SerialSink = StreamSink<WriteHalf<SerialStream>>;

impl<W: AsyncWrite + Unpin + Send> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            framed: FramedWrite::new(writer, DeltaCodec),
            reader: None,
        }
    }

    pub fn get_ref(&self) -> &W {
        self.framed.get_ref()
    }
}

impl SerialSink {
    /// Open the serial device and start logging the lines it sends back.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, LedError> {
        let port = tokio_serial::new(path, baud_rate)
            .open_native_async()
            .map_err(std::io::Error::from)?;
        info!(path, baud_rate, "serial port open");

        let (read, write) = tokio::io::split(port);
        let mut sink = Self::new(write);
        sink.reader = Some(spawn_line_logger(read));
        Ok(sink)
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> FrameSink for StreamSink<W> {
    async fn write(&mut self, message: EncodedMessage) -> Result<(), LedError> {
        self.framed.send(message).await
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

impl<W> Drop for StreamSink<W> {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// Log whatever the device writes, until it closes.
///
/// Output is read in raw chunks and decoded lossily, so stray bytes from
/// the controller never end the logging and no line buffer can grow
/// without bound.
pub fn spawn_line_logger<R>(reader: R) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunks = FramedRead::new(reader, BytesCodec::new());
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(chunk) => {
                    for line in device_lines(&chunk) {
                        info!(target: "ledlink_bridge::device", "{line}");
                    }
                }
                Err(e) => {
                    warn!("serial read error: {e}");
                    break;
                }
            }
        }
        debug!("serial reader finished");
    })
}

/// Split one chunk of device output into printable, non-empty lines.
fn device_lines(chunk: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(chunk)
        .split(['\r', '\n'])
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

// ── DryRunSink ───────────────────────────────────────────────────

/// Applies messages to an in-memory matrix instead of hardware.
pub struct DryRunSink {
    matrix: LedMatrix,
    messages: u64,
}

impl DryRunSink {
    pub fn new(size: RasterSize) -> Self {
        Self {
            matrix: LedMatrix::new(size),
            messages: 0,
        }
    }

    pub fn matrix(&self) -> &LedMatrix {
        &self.matrix
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }
}

#[async_trait]
impl FrameSink for DryRunSink {
    async fn write(&mut self, message: EncodedMessage) -> Result<(), LedError> {
        let applied = self.matrix.apply(&message.decode());
        self.messages += 1;
        debug!(
            records = message.record_count(),
            applied,
            total = self.messages,
            "dry run: applied message"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

// ── Writer task ──────────────────────────────────────────────────

/// Drain `rx` into `sink` until every sender is dropped.
///
/// Write errors are logged and the message is dropped; the next message
/// is attempted as usual. Returns the number of messages written.
pub async fn run_writer(mut sink: Box<dyn FrameSink>, mut rx: mpsc::Receiver<EncodedMessage>) -> u64 {
    let mut written = 0;
    info!(sink = sink.name(), "writer started");
    while let Some(message) = rx.recv().await {
        let len = message.len();
        match sink.write(message).await {
            Ok(()) => {
                written += 1;
                debug!(len, "forwarded message");
            }
            Err(e) => warn!(sink = sink.name(), len, "write failed: {e}"),
        }
    }
    info!(written, "writer stopped");
    written
}

// ── Tests ────────────────────────────────────────────────────────
