//! LED sender: entry point.
//!
//! ```text
//! ledlink-sender                  Run in the foreground
//! ledlink-sender --config <path>  Load a custom config TOML
//! ledlink-sender --gen-config     Write default config to stdout
//! ledlink-sender --scene dots     Override the configured scene
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledlink_sender::config::SenderConfig;
use ledlink_sender::service::SenderService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "ledlink-sender", about = "Streams LED frame deltas to the bridge")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "ledlink-sender.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Scene to render, overriding the config file.
    #[arg(long)]
    scene: Option<String>,

    /// Bridge WebSocket URL, overriding the config file.
    #[arg(long)]
    url: Option<String>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&SenderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = SenderConfig::load(&cli.config)?;
    if let Some(scene) = cli.scene {
        config.pipeline.scene = scene;
    }
    if let Some(url) = cli.url {
        config.network.url = url;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("ledlink-sender v{}", env!("CARGO_PKG_VERSION"));
    info!("bridge: {}", config.network.url);
    info!("raster: {}x{}", config.raster.width, config.raster.height);
    info!("tick rate: {}/s", config.pipeline.tick_rate);
    info!("diff threshold: {}", config.diff.threshold);

    let service = SenderService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    let stop_clone = stop.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop_clone.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
