//! CLI Context for dependency injection and shared state
//!
//! This module provides the CliContext abstraction that centralizes
//! configuration management and reduces coupling in CLI handlers.

use anyhow::{Context, Result};
use cry_monitor::config::ConfigManager;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// CLI execution context containing shared dependencies and configuration
#[derive(Clone)]
pub struct CliContext {
    pub config_dir: Option<PathBuf>,
    pub verbose: bool,
    pub config_manager: Arc<ConfigManager>,
}

impl CliContext {
    /// Create a new CLI context for the given base directory and verbosity
    pub fn new(config_dir: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let config_manager = Arc::new(ConfigManager::new(config_dir.clone())?);

        Ok(Self {
            config_dir,
            verbose,
            config_manager,
        })
    }

    fn env_filter(&self) -> EnvFilter {
        let log_level = if self.verbose {
            "debug"
        } else {
            self.config_manager.config().daemon.log_level.as_str()
        };

        EnvFilter::from_default_env().add_directive(
            log_level
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        )
    }

    /// Initialize console logging based on verbosity and configuration
    pub fn init_logging(&self) -> Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        if self.verbose {
            tracing::debug!("Verbose logging enabled");
            tracing::debug!("Config path: {:?}", self.config_manager.config_path());
        }

        Ok(())
    }

    /// Console logging plus a daily-rolling file when `daemon.log_path` is
    /// set. Keep the returned guard alive until shutdown so buffered lines
    /// are flushed.
    pub fn init_listener_logging(&self) -> Result<Option<WorkerGuard>> {
        let Some(log_path) = self.config_manager.config().daemon.log_path.clone() else {
            self.init_logging()?;
            return Ok(None);
        };

        let log_path = Path::new(&log_path);
        let log_dir = log_path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("cry-monitor.log");

        let file_appender = tracing_appender::rolling::daily(log_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(self.env_filter())
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

        tracing::info!("Logging to {}", log_path.display());
        Ok(Some(guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_creation() {
        let temp_dir = TempDir::new().unwrap();
        let context = CliContext::new(Some(temp_dir.path().to_path_buf()), false).unwrap();

        assert_eq!(context.config_dir, Some(temp_dir.path().to_path_buf()));
        assert!(!context.verbose);
        assert_eq!(context.config_manager.config().listener.port, 5005);
    }

    #[test]
    fn test_context_rejects_broken_config() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.toml"), "not = [valid").unwrap();
        assert!(CliContext::new(Some(temp_dir.path().to_path_buf()), false).is_err());
    }

    #[test]
    fn test_context_verbose_mode() {
        let temp_dir = TempDir::new().unwrap();
        let context = CliContext::new(Some(temp_dir.path().to_path_buf()), true).unwrap();
        assert!(context.verbose);
    }
}
