//! Foreground listener
//!
//! Runs the monitor service until Ctrl+C or SIGTERM, logging every
//! published alert as the foreground observer would see it.

use super::super::CliContext;
use anyhow::{anyhow, Result};
use cry_monitor::config::ConfigManager;
use cry_monitor::daemon::{MonitorService, RunMarker};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Handler for the listen command
pub struct ListenHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ListenHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle_listen(
        &self,
        port: Option<u16>,
        trust: Vec<String>,
        dry_run: bool,
    ) -> Result<()> {
        // command-line overrides apply to this run only and are never saved
        let mut config_manager = ConfigManager::new(self.context.config_dir.clone())?;
        let listener = &mut config_manager.config_mut().listener;
        if let Some(port) = port {
            listener.port = port;
        }
        listener.trusted_senders.extend(trust);
        if listener.port == 0 {
            return Err(anyhow!("listener.port must be non-zero"));
        }
        config_manager.config().validate()?;

        if config_manager.config().listener.trusted_senders.is_empty() {
            warn!("No trusted senders configured; every alert will be dropped");
        }

        let service = MonitorService::from_config(&config_manager, dry_run)?;
        let outcome = service.start().await?;

        // remove the marker even if we leave through an error below
        let marker = RunMarker::new(config_manager.marker_path());
        let _marker_guard = scopeguard::guard(marker, |marker| {
            let _ = marker.remove();
        });

        println!("Listening for cry alerts on {} (Ctrl+C to stop)", outcome.local_addr());

        let mut alerts = service.subscribe_alerts();
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    if let Err(e) = result {
                        warn!("Signal handling failed, stopping: {}", e);
                    }
                    info!("Shutdown requested");
                    break;
                }

                event = alerts.recv() => match event {
                    Ok(event) => info!(
                        cry_type = %event.cry_type,
                        confidence = event.confidence_percent,
                        "Alert published"
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Alert observer lagged, {} events skipped", skipped)
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }

        service.stop().await;
        println!("Cry monitor stopped");
        Ok(())
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
