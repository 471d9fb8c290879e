//! Receiver-side model of the LED matrix.
//!
//! Documents the implicit contract of the serial listener: every record
//! sets LED `index` to its RGB color, LEDs are numbered in the sender's
//! scan order, and anything not mentioned keeps its last color.

use tracing::warn;

use crate::error::LedError;
use crate::led::delta::DeltaRecord;
use crate::led::message::decode_records;
use crate::led::raster::{Raster, RasterSize};

/// Persistent LED state, updated incrementally by delta messages.
#[derive(Debug, Clone)]
pub struct LedMatrix {
    size: RasterSize,
    leds: Vec<[u8; 3]>,
    /// Records whose index fell outside the matrix.
    out_of_range: u64,
}

impl LedMatrix {
    /// All LEDs start off (black).
    pub fn new(size: RasterSize) -> Self {
        Self {
            size,
            leds: vec![[0, 0, 0]; size.pixel_count()],
            out_of_range: 0,
        }
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    /// Apply decoded records and return how many were applied.
    pub fn apply(&mut self, records: &[DeltaRecord]) -> usize {
        let mut applied = 0;
        for r in records {
            match self.leds.get_mut(r.index as usize) {
                Some(led) => {
                    *led = [r.red, r.green, r.blue];
                    applied += 1;
                }
                None => {
                    self.out_of_range += 1;
                    warn!(index = r.index, "LED index out of range; ignoring");
                }
            }
        }
        applied
    }

    /// Decode a raw wire payload and apply it.
    pub fn apply_message(&mut self, payload: &[u8]) -> Result<usize, LedError> {
        let records = decode_records(payload)?;
        Ok(self.apply(&records))
    }

    /// Color of LED `index`, if it exists.
    pub fn led(&self, index: usize) -> Option<[u8; 3]> {
        self.leds.get(index).copied()
    }

    pub fn out_of_range(&self) -> u64 {
        self.out_of_range
    }

    /// Switch every LED off.
    pub fn clear(&mut self) {
        self.leds.fill([0, 0, 0]);
    }

    /// Render the matrix as an opaque RGBA raster (for previews and tests).
    pub fn to_raster(&self) -> Raster {
        let mut raster = Raster::new(self.size);
        for (px, led) in raster.as_bytes_mut().chunks_exact_mut(4).zip(&self.leds) {
            px[..3].copy_from_slice(led);
            px[3] = 255;
        }
        raster
    }

    /// True when every LED matches the RGB channels of `raster`.
    pub fn matches_rgb(&self, raster: &Raster) -> bool {
        raster.size() == self.size
            && raster
                .as_bytes()
                .chunks_exact(4)
                .zip(&self.leds)
                .all(|(px, led)| px[..3] == led[..])
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_records_by_index() {
        let mut m = LedMatrix::new(RasterSize::new(2, 2).unwrap());
        let applied = m.apply(&[DeltaRecord::new(3, 1, 2, 3), DeltaRecord::new(0, 9, 9, 9)]);
        assert_eq!(applied, 2);
        assert_eq!(m.led(3), Some([1, 2, 3]));
        assert_eq!(m.led(0), Some([9, 9, 9]));
        assert_eq!(m.led(1), Some([0, 0, 0]));
    }

    #[test]
    fn out_of_range_is_counted_not_applied() {
        let mut m = LedMatrix::new(RasterSize::new(2, 2).unwrap());
        assert_eq!(m.apply(&[DeltaRecord::new(4, 1, 1, 1)]), 0);
        assert_eq!(m.out_of_range(), 1);
    }

    #[test]
    fn apply_message_decodes_wire_bytes() {
        let mut m = LedMatrix::new(RasterSize::new(2, 2).unwrap());
        let n = m
            .apply_message(&[0x00, 0x00, 10, 0, 0, 0x00, 0x02, 0, 5, 0])
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(m.led(2), Some([0, 5, 0]));
        assert!(m.apply_message(&[0, 0, 1]).is_err());
    }

    #[test]
    fn to_raster_is_opaque() {
        let mut m = LedMatrix::new(RasterSize::new(1, 1).unwrap());
        m.apply(&[DeltaRecord::new(0, 4, 5, 6)]);
        let r = m.to_raster();
        assert_eq!(r.pixel(0, 0), [4, 5, 6, 255]);
        assert!(m.matches_rgb(&r));
        m.clear();
        assert!(!m.matches_rgb(&r));
    }
}
