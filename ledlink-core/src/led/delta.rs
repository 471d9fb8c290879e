//! Pixel-level delta detection between consecutive rasters.
//!
//! Walks both rasters in scan order (`y` outer, `x` inner) and emits one
//! [`DeltaRecord`] for every pixel whose RGB channels moved by more than
//! the configured threshold. Alpha is never compared.

use crate::error::LedError;
use crate::led::message::EncodedMessage;
use crate::led::raster::{BYTES_PER_PIXEL, Raster, size_mismatch};

// ── DeltaRecord ──────────────────────────────────────────────────

/// A changed pixel: its scan-order LED index and its new color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeltaRecord {
    /// Row-major pixel index, `y * width + x`.
    pub index: u16,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl DeltaRecord {
    pub const fn new(index: u16, red: u8, green: u8, blue: u8) -> Self {
        Self {
            index,
            red,
            green,
            blue,
        }
    }
}

// ── DiffOptions ──────────────────────────────────────────────────

/// Tuning for the change test.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// A channel counts as changed when `|current - previous| > threshold`.
    /// Zero means any difference at all.
    pub threshold: u8,
}

// ── DeltaEncoder ─────────────────────────────────────────────────

/// Stateless diff + encode stage. The caller owns both rasters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaEncoder {
    options: DiffOptions,
}

impl DeltaEncoder {
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> DiffOptions {
        self.options
    }

    /// Changed pixels of `current` relative to `previous`, in scan order.
    pub fn diff(&self, current: &Raster, previous: &Raster) -> Result<Vec<DeltaRecord>, LedError> {
        let mut records = Vec::new();
        self.for_each_change(current, previous, |r| records.push(r))?;
        Ok(records)
    }

    /// Diff and encode in a single pass without an intermediate record list.
    pub fn encode(&self, current: &Raster, previous: &Raster) -> Result<EncodedMessage, LedError> {
        let mut message = EncodedMessage::builder();
        self.for_each_change(current, previous, |r| message.push(r))?;
        Ok(message.finish())
    }

    /// Encode every pixel of `raster`, for resynchronising a receiver
    /// whose state is unknown.
    pub fn encode_full(&self, raster: &Raster) -> EncodedMessage {
        let mut message = EncodedMessage::builder();
        for (index, px) in raster.as_bytes().chunks_exact(BYTES_PER_PIXEL).enumerate() {
            message.push(DeltaRecord::new(index as u16, px[0], px[1], px[2]));
        }
        message.finish()
    }

    fn for_each_change(
        &self,
        current: &Raster,
        previous: &Raster,
        mut emit: impl FnMut(DeltaRecord),
    ) -> Result<(), LedError> {
        if current.size() != previous.size() {
            return Err(size_mismatch(current.size(), previous.size()));
        }

        let threshold = self.options.threshold;
        let changed = |a: u8, b: u8| a.abs_diff(b) > threshold;

        let cur = current.as_bytes().chunks_exact(BYTES_PER_PIXEL);
        let prev = previous.as_bytes().chunks_exact(BYTES_PER_PIXEL);

        // Chunks are already in scan order, so the enumeration index is the LED index.
        for (index, (c, p)) in cur.zip(prev).enumerate() {
            if changed(c[0], p[0]) || changed(c[1], p[1]) || changed(c[2], p[2]) {
                emit(DeltaRecord::new(index as u16, c[0], c[1], c[2]));
            }
        }

        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
