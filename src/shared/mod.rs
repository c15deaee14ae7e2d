//! Shared configuration types
//!
//! Used by both the library pipeline and the CLI handlers.

pub mod config;

pub use config::{Config, NtfyConfig, SurfaceBackend, WakeHoldBackend};
