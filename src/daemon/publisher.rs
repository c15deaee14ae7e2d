use tokio::sync::broadcast;
use tracing::trace;

use crate::alert::AlertEvent;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Fans dispatched alerts out to observers
///
/// Fire-and-forget: with no subscriber attached the event is dropped, and a
/// subscriber that falls more than the channel capacity behind loses the
/// oldest events rather than slowing the listener down.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<AlertEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: AlertEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                trace!("No alert subscribers attached, event dropped");
                0
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(percent: u8) -> AlertEvent {
        AlertEvent {
            cry_type: "hungry".to_string(),
            confidence_percent: percent,
            temperature: None,
            humidity: None,
            timestamp: String::new(),
        }
    }

    #[test]
    fn test_publish_without_subscribers_drops() {
        let publisher = EventPublisher::new();
        assert_eq!(publisher.publish(event(80)), 0);

        // not buffered for late subscribers
        let mut late = publisher.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn test_every_subscriber_receives_in_order() {
        let publisher = EventPublisher::new();
        let mut a = publisher.subscribe();
        let mut b = publisher.subscribe();

        assert_eq!(publisher.publish(event(10)), 2);
        assert_eq!(publisher.publish(event(20)), 2);

        assert_eq!(a.try_recv().unwrap().confidence_percent, 10);
        assert_eq!(a.try_recv().unwrap().confidence_percent, 20);
        assert_eq!(b.try_recv().unwrap().confidence_percent, 10);
    }
}
