//! Configuration for the LED sender.

use std::path::Path;
use std::time::Duration;

use ledlink_core::{DiffOptions, LedError, PipelineConfig, RasterSize, ReconnectPolicy, Scene};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// LED matrix dimensions.
    pub raster: RasterConfig,
    /// Change detection.
    pub diff: DiffConfig,
    /// Frame production.
    pub pipeline: PipelineSettings,
    /// Bridge connection.
    pub network: NetworkConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Raster dimensions. `width * height` must not exceed 65536.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Per-channel difference that must be exceeded for a pixel to count
    /// as changed. 0 sends every difference.
    pub threshold: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Ticks per second (1-120).
    pub tick_rate: u32,
    /// Scene name: "solid", "solid:RRGGBB", "gradient", "dots", "grid".
    pub scene: String,
    /// Send a full frame whenever the bridge connection (re)opens.
    pub resync_on_connect: bool,
}

/// Bridge connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// WebSocket URL of the bridge.
    pub url: String,
    /// Reopen the connection after it closes.
    pub reconnect: bool,
    /// First reconnect delay in milliseconds.
    pub reconnect_initial_ms: u64,
    /// Upper bound for the doubling reconnect delay.
    pub reconnect_max_ms: u64,
    /// Frames buffered between the pipeline and the socket.
    pub send_queue: usize,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            scene: "grid".into(),
            resync_on_connect: true,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:6842/ws".into(),
            reconnect: true,
            reconnect_initial_ms: 500,
            reconnect_max_ms: 10_000,
            send_queue: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl SenderConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error.
    pub fn load(path: &Path) -> Result<Self, LedError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&contents).map_err(|e| LedError::Config(format!("{}: {e}", path.display())))
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    /// Check everything that would otherwise fail at runtime.
    pub fn validate(&self) -> Result<(), LedError> {
        self.raster_size()?;
        self.scene()?;
        if !(1..=120).contains(&self.pipeline.tick_rate) {
            return Err(LedError::Config(format!(
                "tick_rate {} out of range 1-120",
                self.pipeline.tick_rate
            )));
        }
        if self.network.url.is_empty() {
            return Err(LedError::Config("network.url is empty".into()));
        }
        Ok(())
    }

    pub fn raster_size(&self) -> Result<RasterSize, LedError> {
        RasterSize::new(self.raster.width, self.raster.height)
    }

    pub fn scene(&self) -> Result<Scene, LedError> {
        self.pipeline.scene.parse()
    }

    pub fn to_pipeline_config(&self) -> Result<PipelineConfig, LedError> {
        Ok(PipelineConfig {
            size: self.raster_size()?,
            diff: DiffOptions {
                threshold: self.diff.threshold,
            },
            tick_rate: self.pipeline.tick_rate.clamp(1, 120),
            resync_on_connect: self.pipeline.resync_on_connect,
        })
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        if !self.network.reconnect {
            return ReconnectPolicy::Never;
        }
        let initial = self.network.reconnect_initial_ms.max(1);
        ReconnectPolicy::Backoff {
            initial: Duration::from_millis(initial),
            max: Duration::from_millis(self.network.reconnect_max_ms.max(initial)),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
