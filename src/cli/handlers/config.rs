//! Configuration management handler
//!
//! This module handles initialization and the `config show|get|set`
//! commands.

use super::super::{CliContext, ConfigAction};
use anyhow::{anyhow, Context, Result};
use cry_monitor::config::ConfigManager;
use cry_monitor::shared::config::{Config, SurfaceBackend, WakeHoldBackend};
use std::path::PathBuf;

/// Handler for configuration operations
pub struct ConfigHandler<'a> {
    context: &'a CliContext,
}

impl<'a> ConfigHandler<'a> {
    /// Create new configuration handler
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    /// Handle configuration initialization
    pub fn handle_init(config_dir: Option<PathBuf>, force: bool) -> Result<()> {
        let base_dir = ConfigManager::resolve_base_dir(config_dir)?;
        let config_path = base_dir.join("config.toml");

        if config_path.exists() && !force {
            println!("Configuration already initialized at: {}", config_path.display());
            println!("Use --force to overwrite");
            return Ok(());
        }

        let manager = if force {
            ConfigManager::reset(Some(base_dir))?
        } else {
            ConfigManager::new(Some(base_dir))?
        };
        println!(
            "Configuration initialized successfully at: {}",
            manager.config_path().display()
        );
        Ok(())
    }

    /// Handle configuration management
    pub fn handle_config(&self, action: ConfigAction) -> Result<()> {
        // Fresh manager so edits do not touch the shared context copy
        let mut config_manager = ConfigManager::new(self.context.config_dir.clone())?;

        match action {
            ConfigAction::Show => {
                let config = config_manager.config();
                println!("{}", toml::to_string_pretty(config)?);
            }
            ConfigAction::Get { key } => {
                println!("{}", get_value(config_manager.config(), &key)?);
            }
            ConfigAction::Set { key, value } => {
                set_value(config_manager.config_mut(), &key, &value)?;
                config_manager.save()?;
                println!("Configuration updated: {key} = {value}");
            }
        }

        Ok(())
    }
}

fn get_value(config: &Config, key: &str) -> Result<String> {
    let value = match key {
        "listener.bind_address" => config.listener.bind_address.to_string(),
        "listener.port" => config.listener.port.to_string(),
        "listener.buffer_size" => config.listener.buffer_size.to_string(),
        "listener.retry_delay_ms" => config.listener.retry_delay_ms.to_string(),
        "listener.trusted_senders" => config.listener.trusted_senders.join(","),
        "dispatch.high_confidence_threshold" => {
            config.dispatch.high_confidence_threshold.to_string()
        }
        "notifications.backend" => backend_name(config.notifications.backend).to_string(),
        "notifications.ntfy.server_url" => config.notifications.ntfy.server_url.clone(),
        "notifications.ntfy.topic" => config.notifications.ntfy.topic.clone(),
        "notifications.ntfy.auth_token" => config
            .notifications
            .ntfy
            .auth_token
            .as_ref()
            .map(|_| "<set>".to_string())
            .unwrap_or_else(|| "None".to_string()),
        "wake_hold.backend" => match config.wake_hold.backend {
            WakeHoldBackend::None => "none".to_string(),
            WakeHoldBackend::SystemdInhibit => "systemd-inhibit".to_string(),
        },
        "wake_hold.hold_secs" => config.wake_hold.hold_secs.to_string(),
        "wake_hold.renew_secs" => config.wake_hold.renew_secs.to_string(),
        "daemon.log_level" => config.daemon.log_level.clone(),
        "daemon.log_path" => config
            .daemon
            .log_path
            .as_ref()
            .cloned()
            .unwrap_or_else(|| "None".to_string()),
        _ => return Err(anyhow!("Unknown configuration key: {}", key)),
    };
    Ok(value)
}

fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "listener.bind_address" => {
            config.listener.bind_address = value.parse().context("Expected an IP address")?
        }
        "listener.port" => config.listener.port = value.parse().context("Port must be 1-65535")?,
        "listener.buffer_size" => config.listener.buffer_size = value.parse()?,
        "listener.retry_delay_ms" => config.listener.retry_delay_ms = value.parse()?,
        "listener.trusted_senders" => {
            config.listener.trusted_senders = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }
        "dispatch.high_confidence_threshold" => {
            config.dispatch.high_confidence_threshold = value.parse()?
        }
        "notifications.backend" => {
            config.notifications.backend = match value {
                "console" => SurfaceBackend::Console,
                "ntfy" => SurfaceBackend::Ntfy,
                "none" => SurfaceBackend::None,
                _ => return Err(anyhow!("Backend must be one of: console, ntfy, none")),
            }
        }
        "notifications.ntfy.server_url" => config.notifications.ntfy.server_url = value.to_string(),
        "notifications.ntfy.topic" => config.notifications.ntfy.topic = value.to_string(),
        "notifications.ntfy.auth_token" => {
            config.notifications.ntfy.auth_token = optional(value)
        }
        "wake_hold.backend" => {
            config.wake_hold.backend = match value {
                "none" => WakeHoldBackend::None,
                "systemd-inhibit" => WakeHoldBackend::SystemdInhibit,
                _ => return Err(anyhow!("Wake hold backend must be one of: none, systemd-inhibit")),
            }
        }
        "wake_hold.hold_secs" => config.wake_hold.hold_secs = value.parse()?,
        "wake_hold.renew_secs" => config.wake_hold.renew_secs = value.parse()?,
        "daemon.log_level" => config.daemon.log_level = value.to_string(),
        "daemon.log_path" => config.daemon.log_path = optional(value),
        _ => return Err(anyhow!("Unknown configuration key: {}", key)),
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn backend_name(backend: SurfaceBackend) -> &'static str {
    match backend {
        SurfaceBackend::Console => "console",
        SurfaceBackend::Ntfy => "ntfy",
        SurfaceBackend::None => "none",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        let mut config = Config::default();
        set_value(&mut config, "listener.port", "6006").unwrap();
        set_value(&mut config, "listener.trusted_senders", "10.0.0.7, 192.168.1.").unwrap();
        set_value(&mut config, "notifications.backend", "ntfy").unwrap();

        assert_eq!(get_value(&config, "listener.port").unwrap(), "6006");
        assert_eq!(
            get_value(&config, "listener.trusted_senders").unwrap(),
            "10.0.0.7,192.168.1."
        );
        assert_eq!(get_value(&config, "notifications.backend").unwrap(), "ntfy");
    }

    #[test]
    fn test_unknown_key() {
        let mut config = Config::default();
        assert!(get_value(&config, "listener.colour").is_err());
        assert!(set_value(&mut config, "listener.colour", "red").is_err());
    }

    #[test]
    fn test_bad_values() {
        let mut config = Config::default();
        assert!(set_value(&mut config, "listener.port", "70000").is_err());
        assert!(set_value(&mut config, "wake_hold.backend", "caffeinate").is_err());
        assert!(set_value(&mut config, "listener.bind_address", "localhost").is_err());
    }

    #[test]
    fn test_auth_token_is_masked() {
        let mut config = Config::default();
        set_value(&mut config, "notifications.ntfy.auth_token", "tk_secret").unwrap();
        assert_eq!(get_value(&config, "notifications.ntfy.auth_token").unwrap(), "<set>");
        set_value(&mut config, "notifications.ntfy.auth_token", "").unwrap();
        assert_eq!(get_value(&config, "notifications.ntfy.auth_token").unwrap(), "None");
    }
}
