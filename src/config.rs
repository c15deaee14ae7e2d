use crate::errors::{AppError, AppResult};
use directories::BaseDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub use crate::shared::config::{Config, NtfyConfig};

/// Configuration manager for the cry monitor
///
/// Loads, validates and saves `config.toml` inside the monitor's base
/// directory. The same directory also holds `preferences.toml` and the
/// `monitor.pid` marker, so everything a running listener touches lives in
/// one place.
///
/// # Example
///
/// ```rust,no_run
/// use cry_monitor::config::ConfigManager;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config_manager = ConfigManager::new(None)?;
///     println!("Listening on port {}", config_manager.config().listener.port);
///     Ok(())
/// }
/// ```
pub struct ConfigManager {
    base_dir: PathBuf,
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Creates a new ConfigManager instance
    ///
    /// Uses `base_dir` when given, otherwise `~/.cry-monitor`. A default
    /// configuration is written if none exists yet.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The base directory cannot be created
    /// - The configuration file cannot be read, parsed or validated
    /// - Default configuration cannot be serialized and written
    pub fn new(base_dir: Option<PathBuf>) -> AppResult<Self> {
        let base_dir = Self::resolve_base_dir(base_dir)?;
        let config_path = base_dir.join("config.toml");
        let config = Self::load_or_create(&config_path)?;
        config.validate()?;

        Ok(ConfigManager {
            base_dir,
            config_path,
            config,
        })
    }

    /// Overwrite any existing configuration with defaults
    pub fn reset(base_dir: Option<PathBuf>) -> AppResult<Self> {
        let base_dir = Self::resolve_base_dir(base_dir)?;
        let manager = ConfigManager {
            config_path: base_dir.join("config.toml"),
            base_dir,
            config: Config::default(),
        };
        manager.save()?;
        Ok(manager)
    }

    /// Resolve and create the base directory
    pub fn resolve_base_dir(base_dir: Option<PathBuf>) -> AppResult<PathBuf> {
        let base_path = match base_dir {
            Some(path) => path,
            None => {
                let base_dirs = BaseDirs::new()
                    .ok_or_else(|| AppError::config("Failed to get base directories"))?;
                base_dirs.home_dir().join(".cry-monitor")
            }
        };

        fs::create_dir_all(&base_path)
            .map_err(|e| AppError::io_with_source(&base_path, "create config directory", e))?;

        Ok(base_path)
    }

    fn load_or_create(path: &Path) -> AppResult<Config> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| AppError::io_with_source(path, "read config file", e))?;
            toml::from_str(&content)
                .map_err(|e| AppError::config_with_source("Failed to parse config file", e))
        } else {
            let config = Config::default();
            let content = toml::to_string_pretty(&config)
                .map_err(|e| {
                    AppError::config_with_source("Failed to serialize default config", e)
                })?;
            fs::write(path, content)
                .map_err(|e| AppError::io_with_source(path, "write default config", e))?;
            Ok(config)
        }
    }

    /// Saves the current configuration to disk
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, cannot be
    /// serialized, or cannot be written.
    pub fn save(&self) -> AppResult<()> {
        self.config.validate()?;
        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| AppError::config_with_source("Failed to serialize config", e))?;
        fs::write(&self.config_path, content)
            .map_err(|e| AppError::io_with_source(&self.config_path, "write config file", e))?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mutable access; call [`save()`](Self::save) to persist changes.
    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Location of the notification preference store
    pub fn preferences_path(&self) -> PathBuf {
        self.base_dir.join("preferences.toml")
    }

    /// Location of the running-listener marker
    pub fn marker_path(&self) -> PathBuf {
        self.base_dir.join("monitor.pid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(Some(temp_dir.path().to_path_buf())).unwrap();

        assert!(manager.config_path().exists());
        assert_eq!(manager.config().listener.port, 5005);
        assert_eq!(manager.marker_path(), temp_dir.path().join("monitor.pid"));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().to_path_buf();

        let mut manager = ConfigManager::new(Some(base.clone())).unwrap();
        manager.config_mut().listener.port = 6006;
        manager.config_mut().listener.trusted_senders = vec!["10.0.0.7".to_string()];
        manager.save().unwrap();

        let reloaded = ConfigManager::new(Some(base)).unwrap();
        assert_eq!(reloaded.config().listener.port, 6006);
        assert_eq!(reloaded.config().listener.trusted_senders, vec!["10.0.0.7"]);
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.toml"), "listener = 3").unwrap();

        let result = ConfigManager::new(Some(temp_dir.path().to_path_buf()));
        assert!(matches!(result, Err(AppError::Config { .. })));
    }

    #[test]
    fn test_reset_replaces_broken_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.toml"), "listener = 3").unwrap();

        let manager = ConfigManager::reset(Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(manager.config().listener.port, 5005);
        assert!(ConfigManager::new(Some(temp_dir.path().to_path_buf())).is_ok());
    }

    #[test]
    fn test_save_rejects_invalid_values() {
        let temp_dir = TempDir::new().unwrap();
        let mut manager = ConfigManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
        manager.config_mut().dispatch.high_confidence_threshold = 2.0;
        assert!(manager.save().is_err());
    }
}
