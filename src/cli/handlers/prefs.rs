//! Notification preference handler

use super::super::{CliContext, PrefsAction};
use anyhow::Result;
use cry_monitor::notify::FilePreferenceStore;

/// Handler for preference operations
pub struct PrefsHandler<'a> {
    context: &'a CliContext,
}

impl<'a> PrefsHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub fn handle_prefs(&self, action: PrefsAction) -> Result<()> {
        let store = FilePreferenceStore::new(self.context.config_manager.preferences_path());

        match action {
            PrefsAction::Show => {
                let prefs = store.load()?;
                println!("notifications_enabled = {}", prefs.notifications_enabled);
                println!("vibration_enabled = {}", prefs.vibration_enabled);
            }
            PrefsAction::Set {
                notifications,
                vibration,
            } => {
                if notifications.is_none() && vibration.is_none() {
                    return Err(anyhow::anyhow!(
                        "Nothing to change; pass --notifications and/or --vibration"
                    ));
                }

                let mut prefs = store.load()?;
                if let Some(enabled) = notifications {
                    prefs.notifications_enabled = enabled;
                }
                if let Some(enabled) = vibration {
                    prefs.vibration_enabled = enabled;
                }
                store.save(&prefs)?;
                println!("Preferences updated in {}", store.path().display());
            }
        }

        Ok(())
    }
}
