//! Background listener service
//!
//! This module provides:
//! - The UDP listener loop with its trusted-sender filter
//! - Alert dispatch and event fan-out
//! - The lifecycle manager with its observable state, wake lease and
//!   cross-process run marker

pub mod dispatcher;
pub mod listener;
pub mod marker;
pub mod publisher;
pub mod service;
pub mod state;
pub mod trust;
pub mod wake;

// Re-export commonly used types
pub use dispatcher::AlertDispatcher;
pub use listener::{DatagramHandler, DatagramOutcome, ListenerSettings, StatsSnapshot, UdpListener};
pub use marker::{MarkerRecord, MarkerStatus, RunMarker};
pub use publisher::EventPublisher;
pub use service::{MonitorService, StartOutcome};
pub use state::{ServiceState, StateEvent, StatusHandle};
pub use trust::{TrustPolicy, TrustedSender};
pub use wake::{
    create_wake_hold, NoWakeHold, RecordingWakeHold, SystemdInhibitHold, WakeHold, WakeLease,
};
