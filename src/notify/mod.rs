//! User-facing notification rendering
//!
//! This module provides:
//! - The tier-aware [`Notifier`] gated by user preferences
//! - Notification surfaces (console, ntfy push, in-memory)
//! - Haptic feedback with the fixed cry-alert waveform
//! - Handlebars templates for alert bodies

pub mod haptics;
pub mod notifier;
pub mod ntfy;
pub mod preferences;
pub mod surface;
pub mod templates;

use std::sync::Arc;

pub use haptics::{Haptics, NoActuator, RecordingHaptics, Waveform};
pub use notifier::Notifier;
pub use preferences::{FilePreferenceStore, PreferenceStore, Preferences, StaticPreferences};
pub use surface::{
    Channel, ConsoleSurface, MemorySurface, Notification, NotificationSurface, NullSurface,
    CRY_ALERT_ID, MONITORING_ID,
};
pub use templates::TemplateEngine;

use crate::errors::AppResult;
use crate::shared::config::{NotificationsConfig, SurfaceBackend};

/// Build the surface selected in the configuration
pub fn create_surface(config: &NotificationsConfig) -> AppResult<Arc<dyn NotificationSurface>> {
    Ok(match config.backend {
        SurfaceBackend::Console => Arc::new(ConsoleSurface),
        SurfaceBackend::Ntfy => Arc::new(ntfy::NtfySurface::new(&config.ntfy)?),
        SurfaceBackend::None => Arc::new(NullSurface),
    })
}
