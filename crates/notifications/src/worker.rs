//! Background delivery worker.

use std::collections::HashMap;
use std::sync::Arc;

use domain::{Channel, Notification};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::sender::NotificationSender;

/// Drains the notification queue and routes messages by channel.
///
/// Runs until every [`crate::NotificationQueue`] handle has been dropped.
pub struct NotificationWorker {
    rx: mpsc::UnboundedReceiver<Notification>,
    senders: HashMap<Channel, Arc<dyn NotificationSender>>,
}

impl NotificationWorker {
    pub fn new(rx: mpsc::UnboundedReceiver<Notification>) -> Self {
        Self {
            rx,
            senders: HashMap::new(),
        }
    }

    /// Registers the transport for a channel, replacing any previous one.
    pub fn with_sender(mut self, channel: Channel, sender: Arc<dyn NotificationSender>) -> Self {
        self.senders.insert(channel, sender);
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        tracing::info!(channels = self.senders.len(), "notification worker started");
        while let Some(notification) = self.rx.recv().await {
            self.deliver(&notification).await;
        }
        tracing::info!("notification queue closed, worker stopping");
    }

    async fn deliver(&self, notification: &Notification) {
        let channel = notification.channel;
        let Some(sender) = self.senders.get(&channel) else {
            metrics::counter!("notifications_failed_total", "channel" => channel.as_str())
                .increment(1);
            tracing::error!(
                %channel,
                booking_reference = %notification.booking_reference,
                "no transport registered for channel"
            );
            return;
        };

        match sender.send(notification).await {
            Ok(()) => {
                metrics::counter!("notifications_delivered_total", "channel" => channel.as_str())
                    .increment(1);
            }
            Err(e) => {
                metrics::counter!("notifications_failed_total", "channel" => channel.as_str())
                    .increment(1);
                tracing::error!(
                    %channel,
                    transport = sender.name(),
                    booking_reference = %notification.booking_reference,
                    subject = %notification.subject,
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    }
}
