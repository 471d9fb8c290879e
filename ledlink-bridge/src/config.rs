//! Configuration for the serial bridge.

use std::net::SocketAddr;
use std::path::Path;

use ledlink_core::{LedError, RasterSize};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP / WebSocket listener.
    pub server: ServerConfig,
    /// LED controller serial link.
    pub serial: SerialConfig,
    /// Matrix dimensions, used by the dry-run sink.
    pub raster: RasterConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. "0.0.0.0:6842".
    pub listen: String,
    /// Messages buffered between the handlers and the serial writer.
    pub queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device path.
    pub path: String,
    /// Line speed in baud.
    pub baud_rate: u32,
    /// Apply messages to an in-memory matrix instead of opening the device.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub width: u32,
    pub height: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:6842".into(),
            queue: 64,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: "/dev/ttyUSB0".into(),
            baud_rate: 28_800,
            dry_run: false,
        }
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 32,
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

impl BridgeConfig {
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

    pub fn validate(&self) -> Result<(), LedError> {
        self.listen_addr()?;
        self.raster_size()?;
        if self.serial.baud_rate == 0 {
            return Err(LedError::Config("serial.baud_rate must be positive".into()));
        }
        if !self.serial.dry_run && self.serial.path.is_empty() {
            return Err(LedError::Config("serial.path is empty".into()));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, LedError> {
        self.server
            .listen
            .parse()
            .map_err(|e| LedError::Config(format!("server.listen {:?}: {e}", self.server.listen)))
    }

    pub fn raster_size(&self) -> Result<RasterSize, LedError> {
        RasterSize::new(self.raster.width, self.raster.height)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&BridgeConfig::default()).unwrap();
        assert!(text.contains("baud_rate = 28800"));
        assert!(text.contains("dry_run"));
    }

    #[test]
    fn roundtrip_config() {
        let text = toml::to_string_pretty(&BridgeConfig::default()).unwrap();
        let parsed: BridgeConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.listen, "0.0.0.0:6842");
        assert_eq!(parsed.serial.baud_rate, 28_800);
    }

    #[test]
    fn defaults_validate() {
        BridgeConfig::default().validate().unwrap();
    }

    #[test]
    fn bad_listen_address_rejected() {
        let mut cfg = BridgeConfig::default();
        cfg.server.listen = "not-an-address".into();
        assert!(matches!(cfg.validate(), Err(LedError::Config(_))));
    }

    #[test]
    fn oversized_raster_rejected() {
        let cfg: BridgeConfig = toml::from_str("[raster]\nwidth = 512\nheight = 512\n").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(LedError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn dry_run_needs_no_device() {
        let mut cfg = BridgeConfig::default();
        cfg.serial.path.clear();
        assert!(cfg.validate().is_err());
        cfg.serial.dry_run = true;
        cfg.validate().unwrap();
    }

    fn temp_config(tag: &str, text: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ledlink-bridge-{tag}-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn load_reads_file_values() {
        let path = temp_config("valid", "[serial]\nbaud_rate = 115200\n");
        let cfg = BridgeConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.unwrap().serial.baud_rate, 115_200);
    }

    #[test]
    fn load_rejects_unparsable_file() {
        let path = temp_config("invalid", "[raster]\nwidth = 64\nheight = -1\n");
        let result = BridgeConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(LedError::Config(_))));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("ledlink-bridge-does-not-exist.toml");
        let cfg = BridgeConfig::load(&path).unwrap();
        assert_eq!(cfg.serial.baud_rate, 28_800);
    }
}
