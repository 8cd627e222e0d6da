//! Notification transports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use domain::Notification;

use crate::error::DeliveryError;

/// Delivers one notification over a concrete transport.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        tracing::info!(
            channel = %notification.channel,
            recipient = %notification.recipient,
            booking_reference = %notification.booking_reference,
            subject = %notification.subject,
            body = %notification.body,
            "notification delivered"
        );
        Ok(())
    }
}

/// Records delivered notifications in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySender {
    delivered: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<AtomicBool>,
}

impl InMemorySender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following delivery fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl NotificationSender for InMemorySender {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeliveryError::Unavailable("in-memory sender disabled".to_string()));
        }
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}
