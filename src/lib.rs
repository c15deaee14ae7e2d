//! Cry Monitor Library
//!
//! This library provides the background alert listener for a home
//! baby-monitoring appliance: UDP broadcast reception, alert decoding, tiered
//! notifications and the lifecycle that ties them together.

pub mod alert;
pub mod config;
pub mod daemon;
pub mod errors;
pub mod notify;
pub mod shared;

// Re-export commonly used types for convenience
pub use alert::{decode, Alert, AlertEvent, CryType, Tier};
pub use config::{Config, ConfigManager};
pub use daemon::{MonitorService, ServiceState, StartOutcome};
pub use errors::{AppError, AppResult};
