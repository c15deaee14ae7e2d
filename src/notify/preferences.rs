//! Notification preference store
//!
//! The notifier asks the store on every alert; nothing here caches values
//! between reads, so a change made by `cry-monitor prefs set` while the
//! listener runs applies to the next alert.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use crate::errors::{AppResult, ErrorContextExt};

/// Two independent user gates read at dispatch time
pub trait PreferenceStore: Send + Sync {
    fn notifications_enabled(&self) -> bool;
    fn vibration_enabled(&self) -> bool;
}

/// On-disk shape of `preferences.toml`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "enabled")]
    pub notifications_enabled: bool,
    #[serde(default = "enabled")]
    pub vibration_enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            vibration_enabled: true,
        }
    }
}

/// TOML-backed store, re-read on every query
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current preferences; a missing file means defaults.
    pub fn load(&self) -> AppResult<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let content = fs::read_to_string(&self.path)
            .in_file_operation(&self.path, "read preferences")?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, preferences: &Preferences) -> AppResult<()> {
        let content = toml::to_string_pretty(preferences)
            .with_context("serialize preferences")?;
        fs::write(&self.path, content).in_file_operation(&self.path, "write preferences")
    }

    fn current(&self) -> Preferences {
        self.load().unwrap_or_else(|e| {
            warn!("Failed to read preferences, using defaults: {}", e);
            Preferences::default()
        })
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn notifications_enabled(&self) -> bool {
        self.current().notifications_enabled
    }

    fn vibration_enabled(&self) -> bool {
        self.current().vibration_enabled
    }
}

/// In-process store; flags can be flipped from another thread.
#[derive(Debug)]
pub struct StaticPreferences {
    notifications: AtomicBool,
    vibration: AtomicBool,
}

impl StaticPreferences {
    pub fn new(notifications: bool, vibration: bool) -> Self {
        Self {
            notifications: AtomicBool::new(notifications),
            vibration: AtomicBool::new(vibration),
        }
    }

    pub fn set_notifications(&self, enabled: bool) {
        self.notifications.store(enabled, Ordering::SeqCst);
    }

    pub fn set_vibration(&self, enabled: bool) {
        self.vibration.store(enabled, Ordering::SeqCst);
    }
}

impl Default for StaticPreferences {
    fn default() -> Self {
        Self::new(true, true)
    }
}

impl PreferenceStore for StaticPreferences {
    fn notifications_enabled(&self) -> bool {
        self.notifications.load(Ordering::SeqCst)
    }

    fn vibration_enabled(&self) -> bool {
        self.vibration.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_means_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(temp_dir.path().join("preferences.toml"));

        assert!(store.notifications_enabled());
        assert!(store.vibration_enabled());
    }

    #[test]
    fn test_changes_are_seen_without_reload() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(temp_dir.path().join("preferences.toml"));

        store
            .save(&Preferences {
                notifications_enabled: true,
                vibration_enabled: false,
            })
            .unwrap();
        assert!(!store.vibration_enabled());

        std::fs::write(store.path(), "notifications_enabled = false\n").unwrap();
        assert!(!store.notifications_enabled());
        assert!(store.vibration_enabled());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let store = FilePreferenceStore::new(temp_dir.path().join("preferences.toml"));
        std::fs::write(store.path(), "notifications_enabled = maybe").unwrap();

        assert!(store.load().is_err());
        assert!(store.notifications_enabled());
    }

    #[test]
    fn test_static_preferences_toggle() {
        let prefs = StaticPreferences::default();
        prefs.set_vibration(false);
        assert!(prefs.notifications_enabled());
        assert!(!prefs.vibration_enabled());
    }
}
