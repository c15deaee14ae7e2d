//! Notification surfaces
//!
//! A surface is wherever a rendered notification becomes visible. Every
//! notification carries a fixed id: posting again under the same id replaces
//! the previous one instead of stacking next to it.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};

/// Id shared by all cry alerts; a new alert replaces the pending one.
pub const CRY_ALERT_ID: &str = "cry-alert";

/// Id of the "actively monitoring" indicator.
pub const MONITORING_ID: &str = "cry-monitor-active";

/// Separate delivery lanes so the indicator never competes with alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Alerts,
    Monitoring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Default,
    High,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    /// Cannot be dismissed by the user while set
    pub ongoing: bool,
}

impl Notification {
    /// The persistent indicator shown while the listener runs
    pub fn monitoring_indicator(port: u16) -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "this device".to_string());
        Self {
            id: MONITORING_ID.to_string(),
            channel: Channel::Monitoring,
            title: "Cry monitor active".to_string(),
            body: format!("Listening for cry alerts on {} (UDP {})", host, port),
            priority: Priority::Low,
            ongoing: true,
        }
    }
}

pub trait NotificationSurface: Send + Sync {
    /// Show `notification`, replacing any visible one with the same id.
    fn post(&self, notification: &Notification) -> AppResult<()>;

    /// Remove the notification with `id` if it is visible.
    fn cancel(&self, id: &str) -> AppResult<()>;
}

/// Prints notifications to stdout
#[derive(Debug, Default)]
pub struct ConsoleSurface;

impl NotificationSurface for ConsoleSurface {
    fn post(&self, notification: &Notification) -> AppResult<()> {
        match notification.channel {
            Channel::Alerts => {
                println!("🔔 {}: {}", notification.title, notification.body.replace('\n', " | "));
            }
            Channel::Monitoring => {
                info!("{}: {}", notification.title, notification.body);
            }
        }
        Ok(())
    }

    fn cancel(&self, id: &str) -> AppResult<()> {
        debug!("Cleared notification {}", id);
        Ok(())
    }
}

/// Discards everything
#[derive(Debug, Default)]
pub struct NullSurface;

impl NotificationSurface for NullSurface {
    fn post(&self, notification: &Notification) -> AppResult<()> {
        debug!("Notification suppressed: {}", notification.title);
        Ok(())
    }

    fn cancel(&self, _id: &str) -> AppResult<()> {
        Ok(())
    }
}

/// Keeps visible notifications in memory, keyed by id
#[derive(Debug, Default)]
pub struct MemorySurface {
    visible: Mutex<HashMap<String, Notification>>,
    posted: Mutex<usize>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently visible notification with `id`
    pub fn visible(&self, id: &str) -> Option<Notification> {
        self.visible.lock().ok().and_then(|v| v.get(id).cloned())
    }

    pub fn visible_count(&self) -> usize {
        self.visible.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Total number of posts, including replaced ones
    pub fn posted_count(&self) -> usize {
        self.posted.lock().map(|p| *p).unwrap_or(0)
    }
}

impl NotificationSurface for MemorySurface {
    fn post(&self, notification: &Notification) -> AppResult<()> {
        let mut visible = self
            .visible
            .lock()
            .map_err(|_| AppError::internal("notification surface poisoned"))?;
        visible.insert(notification.id.clone(), notification.clone());
        if let Ok(mut posted) = self.posted.lock() {
            *posted += 1;
        }
        Ok(())
    }

    fn cancel(&self, id: &str) -> AppResult<()> {
        self.visible
            .lock()
            .map_err(|_| AppError::internal("notification surface poisoned"))?
            .remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert_notification(body: &str) -> Notification {
        Notification {
            id: CRY_ALERT_ID.to_string(),
            channel: Channel::Alerts,
            title: "Baby is crying".to_string(),
            body: body.to_string(),
            priority: Priority::High,
            ongoing: false,
        }
    }

    #[test]
    fn test_same_id_replaces() {
        let surface = MemorySurface::new();
        surface.post(&alert_notification("first")).unwrap();
        surface.post(&alert_notification("second")).unwrap();

        assert_eq!(surface.visible_count(), 1);
        assert_eq!(surface.posted_count(), 2);
        assert_eq!(surface.visible(CRY_ALERT_ID).unwrap().body, "second");
    }

    #[test]
    fn test_indicator_is_separate_from_alerts() {
        let surface = MemorySurface::new();
        surface.post(&alert_notification("crying")).unwrap();
        surface.post(&Notification::monitoring_indicator(5005)).unwrap();
        assert_eq!(surface.visible_count(), 2);

        surface.cancel(MONITORING_ID).unwrap();
        assert!(surface.visible(MONITORING_ID).is_none());
        assert!(surface.visible(CRY_ALERT_ID).is_some());
    }

    #[test]
    fn test_monitoring_indicator_shape() {
        let indicator = Notification::monitoring_indicator(5005);
        assert_eq!(indicator.channel, Channel::Monitoring);
        assert_eq!(indicator.priority, Priority::Low);
        assert!(indicator.ongoing);
        assert!(indicator.body.contains("UDP 5005"));
    }
}
