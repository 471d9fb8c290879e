//! Rolling-window throughput meter for the send path.
//!
//! Tracks bytes and messages sent over the last `window` and derives the
//! current rate. The pipeline logs it once per second in place of a stats
//! overlay.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling-window throughput meter.
pub struct ThroughputMeter {
    /// Samples: `(when, bytes)`.
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    /// Running total of bytes in the window.
    total_bytes: u64,
}

impl ThroughputMeter {
    /// Create a meter with a 1-second rolling window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(64),
            window,
            total_bytes: 0,
        }
    }

    /// Record that a message of `bytes` was sent now.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(Instant::now(), bytes);
    }

    /// Record with an explicit timestamp (useful for testing).
    pub fn record_at(&mut self, when: Instant, bytes: u64) {
        self.samples.push_back((when, bytes));
        self.total_bytes += bytes;
        self.evict(when);
    }

    /// Bytes per second over the rolling window.
    pub fn bytes_per_sec(&self) -> u64 {
        let Some(secs) = self.span_secs() else {
            return 0;
        };
        (self.total_bytes as f64 / secs) as u64
    }

    /// Messages per second over the rolling window.
    pub fn messages_per_sec(&self) -> f64 {
        let Some(secs) = self.span_secs() else {
            return 0.0;
        };
        self.samples.len() as f64 / secs
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    // ── Internal ─────────────────────────────────────────────────

    fn span_secs(&self) -> Option<f64> {
        let (first, last) = (self.samples.front()?, self.samples.back()?);
        let d = last.0.duration_since(first.0);
        let d = if d.is_zero() {
            Duration::from_millis(1)
        } else {
            d
        };
        Some(d.as_secs_f64())
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&(ts, bytes)) = self.samples.front() {
            if now.duration_since(ts) > self.window {
                self.samples.pop_front();
                self.total_bytes = self.total_bytes.saturating_sub(bytes);
            } else {
                break;
            }
        }
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_meter_returns_zero() {
        let m = ThroughputMeter::new();
        assert_eq!(m.bytes_per_sec(), 0);
        assert_eq!(m.messages_per_sec(), 0.0);
    }

    #[test]
    fn two_samples_one_second_apart() {
        let mut m = ThroughputMeter::with_window(Duration::from_secs(5));
        let t0 = Instant::now();
        m.record_at(t0, 5_000);
        m.record_at(t0 + Duration::from_secs(1), 5_000);
        let bps = m.bytes_per_sec();
        assert!((9_900..=10_100).contains(&bps), "bps = {bps}");
        assert!((m.messages_per_sec() - 2.0).abs() < 0.01);
    }

    #[test]
    fn evicts_old_samples() {
        let mut m = ThroughputMeter::with_window(Duration::from_millis(500));
        let t0 = Instant::now();
        m.record_at(t0, 1000);
        m.record_at(t0 + Duration::from_secs(1), 500);
        assert_eq!(m.sample_count(), 1);
    }
}
