use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::models::notification::NotificationEvent;
use crate::observability::metrics::Metrics;

/// Producer half of the bounded notification queue. Submitting never waits:
/// when the workers fall behind and the buffer is full the event is dropped.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::Sender<NotificationEvent>,
    metrics: Metrics,
}

impl NotificationQueue {
    pub fn new(capacity: usize, metrics: Metrics) -> (Self, mpsc::Receiver<NotificationEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, metrics }, rx)
    }

    /// Returns whether the event was accepted for delivery.
    pub fn submit(&self, event: NotificationEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics.notifications_in_queue.inc();
                true
            }
            Err(TrySendError::Full(event)) => {
                warn!(
                    notification_id = %event.id,
                    recipient_id = %event.recipient_id,
                    "notification queue full; dropping notification"
                );
                self.metrics.notification_outcome("dropped");
                false
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    notification_id = %event.id,
                    recipient_id = %event.recipient_id,
                    "notification workers stopped; dropping notification"
                );
                self.metrics.notification_outcome("dropped");
                false
            }
        }
    }
}
