//! Sender service lifecycle.
//!
//! Validates the configuration, opens the bridge connection and runs the
//! frame pipeline until the stop flag clears.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::info;

use ledlink_core::{Connection, LedError, LedPipeline, PipelineConfig, Scene, WsConnection};

use crate::config::SenderConfig;

// ── SenderService ────────────────────────────────────────────────

/// The top-level sender service.
///
/// Owns nothing long-lived until [`run`](Self::run): the connection and
/// pipeline are created there and dropped when it returns. The stop flag
/// starts set; clearing it before `run` makes `run` return at once.
pub struct SenderService {
    config: SenderConfig,
    running: Arc<AtomicBool>,
}

impl SenderService {
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task or a signal handler.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run the service until stopped.
    ///
    /// 1. Validates the configuration.
    /// 2. Spawns the WebSocket connection to the bridge.
    /// 3. Drives the pipeline; ticks are skipped while the link is down.
    /// 4. Closes the connection when `running` becomes `false`.
    pub async fn run(&self) -> Result<(), LedError> {
        let (pipeline_config, scene) = match self.prepare() {
            Ok(parts) => parts,
            Err(e) => {
                self.stop();
                return Err(e);
            }
        };
        if !self.is_running() {
            info!("stopped before start");
            return Ok(());
        }

        let connection = WsConnection::spawn(
            self.config.network.url.clone(),
            self.config.reconnect_policy(),
            self.config.network.send_queue,
        );
        info!(url = %self.config.network.url, %scene, "sender started");

        let mut pipeline = LedPipeline::new(scene, connection, pipeline_config);

        // The pipeline only awaits between ticks, so dropping its future
        // on stop never leaves a half-applied swap.
        let result = tokio::select! {
            r = pipeline.run() => r,
            _ = Self::wait_for_stop(&self.running) => Ok(()),
        };

        let sender = pipeline.sender();
        sender.connection().close();
        info!(
            sent = sender.messages_sent(),
            bytes = sender.bytes_sent(),
            skipped = sender.skipped(),
            failed = sender.failed(),
            state = ?sender.connection().ready_state(),
            "sender stopped"
        );

        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn prepare(&self) -> Result<(PipelineConfig, Scene), LedError> {
        self.config.validate()?;
        Ok((self.config.to_pipeline_config()?, self.config.scene()?))
    }

    /// Signal the service to stop.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        while running.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_creates_with_defaults() {
        let svc = SenderService::new(SenderConfig::default());
        assert!(svc.is_running());
    }

    #[test]
    fn stop_handle_works() {
        let svc = SenderService::new(SenderConfig::default());
        let handle = svc.stop_handle();
        handle.store(false, Ordering::SeqCst);
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn stop_before_run_is_honoured() {
        let mut cfg = SenderConfig::default();
        cfg.network.url = "ws://127.0.0.1:9/ws".into();
        cfg.network.reconnect = false;
        let svc = SenderService::new(cfg);
        svc.stop();

        tokio::time::timeout(Duration::from_millis(500), svc.run())
            .await
            .expect("run ignored the earlier stop")
            .unwrap();
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn invalid_config_fails_before_starting() {
        let mut cfg = SenderConfig::default();
        cfg.raster.width = 1024;
        cfg.raster.height = 1024;
        let svc = SenderService::new(cfg);
        assert!(matches!(
            svc.run().await,
            Err(LedError::CapacityExceeded { .. })
        ));
        assert!(!svc.is_running());
    }

    #[tokio::test]
    async fn stops_without_a_bridge() {
        let mut cfg = SenderConfig::default();
        // Nothing listens here; every tick is skipped.
        cfg.network.url = "ws://127.0.0.1:9/ws".into();
        cfg.network.reconnect = false;
        let svc = Arc::new(SenderService::new(cfg));
        let stop = svc.stop_handle();

        let task = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.run().await })
        };

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(svc.is_running());
        stop.store(false, Ordering::SeqCst);

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("service did not stop")
            .unwrap()
            .unwrap();
        assert!(!svc.is_running());
    }
}
