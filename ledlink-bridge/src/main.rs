//! LED bridge: entry point.
//!
//! ```text
//! ledlink-bridge                  Serve on the configured address
//! ledlink-bridge --config <path>  Load a custom config TOML
//! ledlink-bridge --gen-config     Write default config to stdout
//! ledlink-bridge --dry-run        Do not open the serial device
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ledlink_bridge::config::BridgeConfig;
use ledlink_bridge::server::{router, serve};
use ledlink_bridge::{open_sink, spawn_writer};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ledlink-bridge", about = "Forwards LED delta messages to the serial controller")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "ledlink-bridge.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Serial device path, overriding the config file.
    #[arg(long)]
    serial: Option<String>,

    /// Apply messages to an in-memory matrix instead of the serial device.
    #[arg(long)]
    dry_run: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&BridgeConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = BridgeConfig::load(&cli.config)?;
    if let Some(path) = cli.serial {
        config.serial.path = path;
    }
    config.serial.dry_run |= cli.dry_run;

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    config.validate()?;

    info!("ledlink-bridge v{}", env!("CARGO_PKG_VERSION"));
    if config.serial.dry_run {
        info!("dry run: serial output disabled");
    } else {
        info!("serial: {} @ {} baud", config.serial.path, config.serial.baud_rate);
    }

    let sink = open_sink(&config)?;
    let (state, writer) = spawn_writer(sink, config.server.queue);

    let listener = TcpListener::bind(config.listen_addr()?).await?;
    serve(listener, router(state), async {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
    })
    .await?;

    // Upgraded WebSocket tasks may still hold a channel sender.
    match tokio::time::timeout(Duration::from_secs(2), writer).await {
        Ok(written) => info!(written = written?, "bridge stopped"),
        Err(_) => warn!("writer still draining at exit"),
    }

    Ok(())
}
