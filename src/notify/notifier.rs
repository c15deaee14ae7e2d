use std::sync::Arc;
use tracing::{debug, error, warn};

use super::haptics::{Haptics, Waveform};
use super::preferences::PreferenceStore;
use super::surface::{Channel, Notification, NotificationSurface, Priority, CRY_ALERT_ID};
use super::templates::{TemplateEngine, ALERT_TITLE};
use crate::alert::{Alert, Tier};

/// Renders user-visible cry alerts, gated by the user's preferences
///
/// The visual and haptic paths fail independently: an error in one is logged
/// and never prevents the other from running.
pub struct Notifier {
    surface: Arc<dyn NotificationSurface>,
    haptics: Arc<dyn Haptics>,
    preferences: Arc<dyn PreferenceStore>,
    templates: TemplateEngine,
    waveform: Waveform,
}

impl Notifier {
    pub fn new(
        surface: Arc<dyn NotificationSurface>,
        haptics: Arc<dyn Haptics>,
        preferences: Arc<dyn PreferenceStore>,
        templates: TemplateEngine,
    ) -> Self {
        Self {
            surface,
            haptics,
            preferences,
            templates,
            waveform: Waveform::cry_alert(),
        }
    }

    /// Build the notification `show` would post
    pub fn render(&self, alert: &Alert, tier: Tier) -> Notification {
        Notification {
            id: CRY_ALERT_ID.to_string(),
            channel: Channel::Alerts,
            title: ALERT_TITLE.to_string(),
            body: self.templates.render(alert, tier),
            priority: Priority::High,
            ongoing: false,
        }
    }

    pub fn show(&self, alert: &Alert, tier: Tier) {
        if !self.preferences.notifications_enabled() {
            debug!("Notifications disabled, skipping alert for {}", alert.cry_type);
            return;
        }

        let notification = self.render(alert, tier);
        if let Err(e) = self.surface.post(&notification) {
            error!(category = e.category(), "Failed to show cry alert: {}", e);
        }

        if self.preferences.vibration_enabled() {
            if let Err(e) = self.haptics.vibrate(&self.waveform) {
                warn!(category = e.category(), "Vibration failed: {}", e);
            }
        }
    }

    /// Surface used for this notifier's alerts, shared with the lifecycle
    /// manager for the monitoring indicator
    pub fn surface(&self) -> Arc<dyn NotificationSurface> {
        Arc::clone(&self.surface)
    }
}
