use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::daemon::trust::TrustPolicy;
use crate::errors::{AppError, AppResult};

/// Main configuration structure for the cry monitor
///
/// Contains the listener transport settings, dispatch policy, notification
/// backend, wake hold behaviour and daemon logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listener: ListenerConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub wake_hold: WakeHoldConfig,
    pub daemon: DaemonConfig,
}

/// UDP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub bind_address: IpAddr,
    pub port: u16,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Addresses, CIDR blocks or dotted prefixes allowed to originate alerts
    pub trusted_senders: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5005,
            buffer_size: default_buffer_size(),
            retry_delay_ms: default_retry_delay_ms(),
            trusted_senders: vec!["192.168.1.0/24".to_string()],
        }
    }
}

fn default_buffer_size() -> usize {
    2048
}

fn default_retry_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f64,
}

fn default_high_confidence_threshold() -> f64 {
    0.70
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            high_confidence_threshold: default_high_confidence_threshold(),
        }
    }
}

/// Where rendered notifications are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurfaceBackend {
    Console,
    Ntfy,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    pub backend: SurfaceBackend,
    #[serde(default)]
    pub ntfy: NtfyConfig,
    #[serde(default)]
    pub templates: TemplateConfig,
}

/// Configuration for pushing alerts to an ntfy topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NtfyConfig {
    pub server_url: String,
    pub topic: String,
    pub auth_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            server_url: "https://ntfy.sh".to_string(),
            topic: "cry-monitor".to_string(),
            auth_token: None,
            timeout_secs: Some(10),
        }
    }
}

/// Optional handlebars overrides for the two notification tiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub high_confidence: Option<String>,
    pub low_confidence: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WakeHoldBackend {
    None,
    SystemdInhibit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeHoldConfig {
    pub backend: WakeHoldBackend,
    pub hold_secs: u64,
    pub renew_secs: u64,
}

impl Default for WakeHoldConfig {
    fn default() -> Self {
        Self {
            backend: WakeHoldBackend::None,
            hold_secs: 600,
            renew_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub log_level: String,
    pub log_path: Option<String>,
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl WakeHoldConfig {
    pub fn hold_duration(&self) -> Duration {
        Duration::from_secs(self.hold_secs)
    }

    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.renew_secs)
    }
}

impl Config {
    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> AppResult<()> {
        if self.listener.buffer_size < 256 {
            return Err(AppError::invalid_value(
                "listener.buffer_size",
                self.listener.buffer_size.to_string(),
            ));
        }

        if self.listener.retry_delay_ms == 0 {
            return Err(AppError::invalid_value(
                "listener.retry_delay_ms",
                "0 (must be non-zero)",
            ));
        }

        TrustPolicy::parse(&self.listener.trusted_senders)?;

        let threshold = self.dispatch.high_confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::invalid_value(
                "dispatch.high_confidence_threshold",
                threshold.to_string(),
            ));
        }

        if self.wake_hold.renew_secs == 0 || self.wake_hold.renew_secs >= self.wake_hold.hold_secs {
            return Err(AppError::invalid_value(
                "wake_hold.renew_secs",
                format!(
                    "{} (must be non-zero and below hold_secs = {})",
                    self.wake_hold.renew_secs, self.wake_hold.hold_secs
                ),
            ));
        }

        if self.notifications.backend == SurfaceBackend::Ntfy {
            url::Url::parse(&self.notifications.ntfy.server_url)?;
            if self.notifications.ntfy.topic.is_empty() {
                return Err(AppError::invalid_value("notifications.ntfy.topic", ""));
            }
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: ListenerConfig::default(),
            dispatch: DispatchConfig::default(),
            notifications: NotificationsConfig {
                backend: SurfaceBackend::Console,
                ntfy: NtfyConfig::default(),
                templates: TemplateConfig::default(),
            },
            wake_hold: WakeHoldConfig::default(),
            daemon: DaemonConfig {
                log_level: "info".to_string(),
                log_path: None,
            },
        }
    }
}
