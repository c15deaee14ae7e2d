//! Observable service state
//!
//! The lifecycle manager is the only writer. Readers on any thread see the
//! current value through [`StatusHandle::get`] and can subscribe to every
//! transition.

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ServiceState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl ServiceState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ServiceState::Starting,
            2 => ServiceState::Running,
            3 => ServiceState::Stopping,
            _ => ServiceState::Stopped,
        }
    }
}

/// Published on every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateEvent {
    pub state: ServiceState,
    pub running: bool,
}

const STATE_CHANNEL_CAPACITY: usize = 16;

/// Cheaply cloneable view of the service state
#[derive(Debug, Clone)]
pub struct StatusHandle {
    state: Arc<AtomicU8>,
    events: broadcast::Sender<StateEvent>,
}

impl StatusHandle {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(AtomicU8::new(ServiceState::Stopped as u8)),
            events,
        }
    }

    pub fn get(&self) -> ServiceState {
        ServiceState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.get() == ServiceState::Running
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    /// Move to `to` and publish the transition. Called only by the
    /// lifecycle manager while it holds its lifecycle lock.
    pub(crate) fn set(&self, to: ServiceState) {
        let from = ServiceState::from_u8(self.state.swap(to as u8, Ordering::SeqCst));
        if from == to {
            return;
        }
        info!("Service state: {:?} -> {:?}", from, to);

        let event = StateEvent {
            state: to,
            running: to == ServiceState::Running,
        };
        if self.events.send(event).is_err() {
            debug!("No state subscribers attached");
        }
    }
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_stopped() {
        let status = StatusHandle::new();
        assert_eq!(status.get(), ServiceState::Stopped);
        assert!(!status.is_running());
    }

    #[test]
    fn test_transitions_are_published() {
        let status = StatusHandle::new();
        let mut events = status.subscribe();

        status.set(ServiceState::Starting);
        status.set(ServiceState::Running);
        status.set(ServiceState::Running);
        status.set(ServiceState::Stopping);
        status.set(ServiceState::Stopped);

        let seen: Vec<StateEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        let states: Vec<ServiceState> = seen.iter().map(|e| e.state).collect();
        assert_eq!(
            states,
            vec![
                ServiceState::Starting,
                ServiceState::Running,
                ServiceState::Stopping,
                ServiceState::Stopped
            ]
        );
        assert_eq!(seen.iter().filter(|e| e.running).count(), 1);
    }

    #[test]
    fn test_clones_share_state() {
        let status = StatusHandle::new();
        let observer = status.clone();
        status.set(ServiceState::Running);
        assert!(observer.is_running());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let status = StatusHandle::new();
        status.set(ServiceState::Starting);
        assert_eq!(status.get(), ServiceState::Starting);
    }
}
