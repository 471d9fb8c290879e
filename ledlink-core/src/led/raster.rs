//! Pixel rasters and the current/previous frame buffer pair.
//!
//! A [`Raster`] is a tightly packed RGBA8 bitmap: `width * height` pixels,
//! row-major, four bytes per pixel, no row padding. Pixel `(x, y)` lives at
//! byte offset `(y * width + x) * 4`.

use crate::error::LedError;

/// Bytes per RGBA8 pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// Largest pixel count a 16-bit LED index can address.
pub const MAX_PIXELS: usize = 1 << 16;

// ── RasterSize ───────────────────────────────────────────────────

/// Fixed raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl RasterSize {
    /// Validate and build a size that fits the wire format.
    pub fn new(width: u32, height: u32) -> Result<Self, LedError> {
        if width == 0 || height == 0 {
            return Err(LedError::InvalidSize { width, height });
        }
        let size = Self { width, height };
        let pixels = size.pixel_count();
        if pixels > MAX_PIXELS {
            return Err(LedError::CapacityExceeded {
                pixels,
                max: MAX_PIXELS,
            });
        }
        Ok(size)
    }

    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    pub const fn byte_len(self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    /// Row-major LED index of `(x, y)`.
    pub const fn index_of(self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Byte offset of the first channel of `(x, y)`.
    pub const fn offset_of(self, x: u32, y: u32) -> usize {
        self.index_of(x, y) * BYTES_PER_PIXEL
    }
}

impl Default for RasterSize {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
        }
    }
}

// ── Raster ───────────────────────────────────────────────────────

/// A fixed-size RGBA8 bitmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    size: RasterSize,
    data: Vec<u8>,
}

impl Raster {
    /// Allocate a zeroed (transparent black) raster.
    pub fn new(size: RasterSize) -> Self {
        Self {
            size,
            data: vec![0u8; size.byte_len()],
        }
    }

    /// Wrap existing RGBA bytes. The length must be exactly `size.byte_len()`.
    pub fn from_bytes(size: RasterSize, data: Vec<u8>) -> Result<Self, LedError> {
        if data.len() != size.byte_len() {
            return Err(LedError::InvalidBufferLength {
                expected: size.byte_len(),
                actual: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Raw RGBA bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw RGBA bytes, for readback into the raster in place.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Returns the RGBA bytes at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let o = self.size.offset_of(x, y);
        [
            self.data[o],
            self.data[o + 1],
            self.data[o + 2],
            self.data[o + 3],
        ]
    }

    /// Overwrite the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let o = self.size.offset_of(x, y);
        self.data[o..o + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    /// Fill every pixel with one color.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Copy the contents of `other` into `self` without reallocating.
    pub fn copy_from(&mut self, other: &Raster) -> Result<(), LedError> {
        if self.size != other.size {
            return Err(size_mismatch(self.size, other.size));
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }
}

pub(crate) fn size_mismatch(current: RasterSize, previous: RasterSize) -> LedError {
    LedError::SizeMismatch {
        current_w: current.width,
        current_h: current.height,
        previous_w: previous.width,
        previous_h: previous.height,
    }
}

// ── FrameBufferPair ──────────────────────────────────────────────

/// The `current` and `previous` rasters, allocated once and never resized.
///
/// Each tick calls [`swap`](Self::swap) before the frame source refills
/// `current`, so `previous` always holds the frame one tick behind.
#[derive(Debug, Clone)]
pub struct FrameBufferPair {
    current: Raster,
    previous: Raster,
}

impl FrameBufferPair {
    pub fn new(size: RasterSize) -> Self {
        Self {
            current: Raster::new(size),
            previous: Raster::new(size),
        }
    }

    pub fn size(&self) -> RasterSize {
        self.current.size()
    }

    pub fn current(&self) -> &Raster {
        &self.current
    }

    pub fn previous(&self) -> &Raster {
        &self.previous
    }

    /// Mutable access to `current` for the frame source.
    pub fn current_mut(&mut self) -> &mut Raster {
        &mut self.current
    }

    /// Overwrite `previous` with the bytes of `current`.
    pub fn swap(&mut self) {
        self.previous.data.copy_from_slice(&self.current.data);
    }

    /// Restore `current` from `previous` after a failed capture, so the
    /// next tick never diffs against a partially written buffer.
    pub fn rollback(&mut self) {
        self.current.data.copy_from_slice(&self.previous.data);
    }
}

// ── Tests ────────────────────────────────────────────────────────
