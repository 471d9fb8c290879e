//! Frame sources: producers that fill the `current` raster once per tick.
//!
//! The real renderer reads back a small offscreen target; here the
//! built-in [`Scene`]s rasterize procedurally on the CPU. Scenes are a
//! closed enum resolved from the configuration at startup.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::LedError;
use crate::led::raster::Raster;

// ── Tick ─────────────────────────────────────────────────────────

/// Timing for one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
    /// Sequential tick counter starting at 0.
    pub frame: u64,
    /// Time since the pipeline started.
    pub time: Duration,
    /// Time since the previous tick.
    pub delta: Duration,
}

// ── FrameSource ──────────────────────────────────────────────────

/// Produces a full raster for the current tick.
///
/// An implementation must either write every byte of `raster` and return
/// `Ok`, or return an error; the pipeline then discards whatever was
/// written and skips the tick.
pub trait FrameSource {
    fn fill(&mut self, tick: &Tick, raster: &mut Raster) -> Result<(), LedError>;
}

impl<F> FrameSource for F
where
    F: FnMut(&Tick, &mut Raster) -> Result<(), LedError>,
{
    fn fill(&mut self, tick: &Tick, raster: &mut Raster) -> Result<(), LedError> {
        self(tick, raster)
    }
}

// ── Scene ────────────────────────────────────────────────────────

/// Built-in procedural scenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scene {
    /// One static color; after the first tick nothing changes.
    Solid([u8; 3]),
    /// Horizontal color ramp scrolling left to right.
    Gradient,
    /// A handful of dots orbiting the center.
    Dots,
    /// Grid lines whose brightness pulses over time.
    #[default]
    Grid,
}

impl Scene {
    pub const NAMES: [&'static str; 4] = ["solid", "gradient", "dots", "grid"];

    fn draw(&self, t: f32, raster: &mut Raster) {
        let (w, h) = (raster.width(), raster.height());
        match *self {
            Scene::Solid([r, g, b]) => raster.fill([r, g, b, 255]),
            Scene::Gradient => {
                let shift = (t * 8.0) as u32;
                for y in 0..h {
                    for x in 0..w {
                        let u = ((x + shift) % w) * 255 / w.max(2).saturating_sub(1);
                        let v = y * 255 / h.max(2).saturating_sub(1);
                        raster.set_pixel(x, y, [u.min(255) as u8, v.min(255) as u8, 96, 255]);
                    }
                }
            }
            Scene::Dots => {
                raster.fill([0, 0, 0, 255]);
                let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
                let radius = cx.min(cy) * 0.7;
                const COLORS: [[u8; 4]; 4] = [
                    [255, 40, 40, 255],
                    [40, 255, 40, 255],
                    [40, 40, 255, 255],
                    [255, 255, 255, 255],
                ];
                for (i, color) in COLORS.iter().enumerate() {
                    let phase = t + i as f32 * std::f32::consts::FRAC_PI_2;
                    let x = (cx + radius * phase.cos()).clamp(0.0, (w - 1) as f32) as u32;
                    let y = (cy + radius * phase.sin()).clamp(0.0, (h - 1) as f32) as u32;
                    raster.set_pixel(x, y, *color);
                }
            }
            Scene::Grid => {
                let level = ((t * 2.0).sin() * 0.5 + 0.5) * 255.0;
                let on = [0, level as u8, (255.0 - level) as u8, 255];
                for y in 0..h {
                    for x in 0..w {
                        let px = if x % 4 == 0 || y % 4 == 0 {
                            on
                        } else {
                            [0, 0, 0, 255]
                        };
                        raster.set_pixel(x, y, px);
                    }
                }
            }
        }
    }
}

impl FrameSource for Scene {
    fn fill(&mut self, tick: &Tick, raster: &mut Raster) -> Result<(), LedError> {
        self.draw(tick.time.as_secs_f32(), raster);
        Ok(())
    }
}

impl FromStr for Scene {
    type Err = LedError;

    /// Accepts a scene name, or `solid:RRGGBB` for a specific color.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, arg) = match lower.split_once(':') {
            Some((n, a)) => (n, Some(a)),
            None => (lower.as_str(), None),
        };
        match (name, arg) {
            ("solid", None) => Ok(Scene::Solid([255, 255, 255])),
            ("solid", Some(hex)) => parse_hex_color(hex).map(Scene::Solid),
            ("gradient", None) => Ok(Scene::Gradient),
            ("dots", None) => Ok(Scene::Dots),
            ("grid", None) => Ok(Scene::Grid),
            _ => Err(LedError::Config(format!(
                "unknown scene {s:?} (expected one of {})",
                Scene::NAMES.join(", ")
            ))),
        }
    }
}

impl fmt::Display for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scene::Solid([r, g, b]) => write!(f, "solid:{r:02x}{g:02x}{b:02x}"),
            Scene::Gradient => f.write_str("gradient"),
            Scene::Dots => f.write_str("dots"),
            Scene::Grid => f.write_str("grid"),
        }
    }
}

fn parse_hex_color(hex: &str) -> Result<[u8; 3], LedError> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(LedError::Config(format!("invalid color {hex:?}")));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| LedError::Config(format!("invalid color {hex:?}")))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

// ── Tests ────────────────────────────────────────────────────────
