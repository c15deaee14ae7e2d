//! Centralized error handling module
//!
//! Structured, typed errors for the cry-monitor library. The CLI boundary
//! converts these into `anyhow::Error` for reporting.

pub mod context;
pub mod types;

pub use context::ErrorContextExt;
pub use types::{AppError, AppResult, DecodeError, NotifyChannel};

/// Convert from anyhow::Error to AppError for the CLI boundary
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Other {
            message: err.to_string(),
            source: None,
        }
    }
}
