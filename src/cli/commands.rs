//! Command definitions and structures for the CLI
//!
//! This module contains all the clap-based command line argument definitions,
//! including the main CLI structure and all subcommands.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main CLI structure
#[derive(Parser)]
#[command(name = "cry-monitor")]
#[command(about = "Background cry-alert listener for a baby-monitoring appliance")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding config.toml, preferences.toml and the run marker
    #[arg(long, global = true, env = "CRY_MONITOR_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Listen for cry alerts until interrupted
    Listen {
        /// Override the configured UDP port
        #[arg(short, long)]
        port: Option<u16>,

        /// Additional trusted sender (address, CIDR or dotted prefix)
        #[arg(short, long = "trust")]
        trust: Vec<String>,

        /// Print notifications to the console and skip the wake hold
        #[arg(long)]
        dry_run: bool,
    },

    /// Show whether a listener is running
    Status,

    /// Stop the running listener
    Stop,

    /// Send one alert datagram, standing in for the monitoring device
    Simulate {
        /// Cry type label
        #[arg(short, long, default_value = "hungry")]
        cry_type: String,

        /// Detection confidence (0.0-1.0)
        #[arg(short, long, default_value = "0.9")]
        detection: f64,

        /// Classification confidence (0.0-1.0), omitted when not given
        #[arg(long)]
        classification: Option<f64>,

        /// Room temperature in °C
        #[arg(long)]
        temperature: Option<f64>,

        /// Relative humidity in %
        #[arg(long)]
        humidity: Option<f64>,

        /// Destination; defaults to the configured port on localhost
        #[arg(long)]
        target: Option<SocketAddr>,

        /// Send this text verbatim instead of building a payload
        #[arg(long, conflicts_with_all = ["classification", "temperature", "humidity"])]
        raw: Option<String>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Notification preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

/// Configuration management actions
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Get configuration value
    Get {
        /// Configuration key (e.g., listener.port)
        key: String,
    },

    /// Set configuration value
    Set {
        /// Configuration key (e.g., listener.port)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Preference actions
#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show current preferences
    Show,

    /// Change one or both preferences
    Set {
        /// Show cry alerts at all
        #[arg(long)]
        notifications: Option<bool>,

        /// Vibrate on cry alerts
        #[arg(long)]
        vibration: Option<bool>,
    },
}
