//! Command handlers for all CLI operations
//!
//! This module contains the implementation of all command handlers,
//! providing clean separation between CLI parsing and business logic.

pub mod config;
pub mod lifecycle;
pub mod listen;
pub mod prefs;
pub mod simulate;

use super::{CliContext, Commands};
use anyhow::Result;

pub use config::ConfigHandler;
pub use lifecycle::LifecycleHandler;
pub use listen::ListenHandler;
pub use prefs::PrefsHandler;
pub use simulate::{SimulateHandler, SimulatedAlert};

/// Coordinates all command handling operations with dependency injection via CliContext
pub struct CommandHandler {
    context: CliContext,
}

impl CommandHandler {
    /// Create a new command handler instance with the provided context
    pub fn new(context: CliContext) -> Self {
        Self { context }
    }

    /// Route commands to their appropriate handlers
    pub async fn handle_command(&self, command: Commands) -> Result<()> {
        // the file writer guard must outlive the command
        let _log_guard = match &command {
            Commands::Listen { .. } => self.context.init_listener_logging()?,
            _ => {
                self.context.init_logging()?;
                None
            }
        };

        match command {
            Commands::Listen { port, trust, dry_run } => {
                ListenHandler::new(&self.context)
                    .handle_listen(port, trust, dry_run)
                    .await
            }
            Commands::Status => LifecycleHandler::new(&self.context).handle_status(),
            Commands::Stop => LifecycleHandler::new(&self.context).handle_stop().await,
            Commands::Simulate {
                cry_type,
                detection,
                classification,
                temperature,
                humidity,
                target,
                raw,
            } => {
                let alert = SimulatedAlert {
                    cry_type,
                    detection,
                    classification,
                    temperature,
                    humidity,
                };
                SimulateHandler::new(&self.context)
                    .handle_simulate(alert, target, raw)
                    .await
            }
            Commands::Init { force } => {
                ConfigHandler::handle_init(self.context.config_dir.clone(), force)
            }
            Commands::Config { action } => ConfigHandler::new(&self.context).handle_config(action),
            Commands::Prefs { action } => PrefsHandler::new(&self.context).handle_prefs(action),
        }
    }
}
