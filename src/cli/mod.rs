//! CLI module providing command-line interface functionality
//!
//! This module handles argument parsing, command validation, and routing
//! to appropriate handlers while maintaining separation of concerns.

pub mod commands;
pub mod context;
pub mod handlers;

use anyhow::Result;
use clap::Parser;

pub use commands::{Cli, Commands, ConfigAction, PrefsAction};
pub use context::CliContext;
pub use handlers::{CommandHandler, ConfigHandler};

/// Main CLI application following the CliContext pattern
pub struct CliApp;

impl CliApp {
    /// Parse command line arguments and execute the requested command
    pub async fn run() -> Result<()> {
        let cli = Cli::parse();

        // init must work even when the existing config no longer loads
        if let Commands::Init { force } = cli.command {
            return ConfigHandler::handle_init(cli.config_dir, force);
        }

        let context = CliContext::new(cli.config_dir.clone(), cli.verbose)?;
        let handler = CommandHandler::new(context);

        handler.handle_command(cli.command).await
    }
}
