use tracing::info;

use super::publisher::EventPublisher;
use crate::alert::{Alert, AlertEvent, Tier};
use crate::notify::Notifier;

/// Turns each parsed alert into exactly one notification attempt and one
/// published event.
///
/// Repeated broadcasts are not deduplicated; the sender may retransmit and
/// each copy produces its own alert.
pub struct AlertDispatcher {
    notifier: Notifier,
    publisher: EventPublisher,
    high_confidence_threshold: f64,
}

impl AlertDispatcher {
    pub fn new(
        notifier: Notifier,
        publisher: EventPublisher,
        high_confidence_threshold: f64,
    ) -> Self {
        Self {
            notifier,
            publisher,
            high_confidence_threshold,
        }
    }

    pub fn dispatch(&self, alert: Alert) -> Tier {
        let tier = Tier::classify(&alert, self.high_confidence_threshold);
        info!(
            cry_type = %alert.cry_type,
            confidence = alert.confidence_percent(),
            tier = ?tier,
            "Dispatching cry alert"
        );

        self.notifier.show(&alert, tier);
        self.publisher.publish(AlertEvent::from(&alert));
        tier
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}
