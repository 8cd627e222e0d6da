//! In-process notification queue.

use domain::{Notification, NotificationError, NotificationSink};
use tokio::sync::mpsc;

/// Sending half of the notification queue.
///
/// Enqueueing never blocks. It only fails once the worker has gone away.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
    /// Creates the queue and the receiver a [`crate::NotificationWorker`] drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl NotificationSink for NotificationQueue {
    fn enqueue(&self, notification: Notification) -> Result<(), NotificationError> {
        self.tx
            .send(notification)
            .map_err(|_| NotificationError::QueueClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{BookingReference, Channel};

    fn notification() -> Notification {
        Notification::payment_successful(
            "ada@example.com",
            BookingReference::new("BK7Q2M9XZA"),
            Channel::Email,
        )
    }

    #[tokio::test]
    async fn enqueued_messages_reach_the_receiver() {
        let (queue, mut rx) = NotificationQueue::channel();
        queue.enqueue(notification()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.recipient, "ada@example.com");
    }

    #[test]
    fn closed_queue_rejects() {
        let (queue, rx) = NotificationQueue::channel();
        drop(rx);

        assert!(queue.is_closed());
        assert!(matches!(
            queue.enqueue(notification()),
            Err(NotificationError::QueueClosed)
        ));
    }
}
