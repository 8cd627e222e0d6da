//! Outbound notifications emitted by the ledger.
//!
//! The ledger only hands messages to a [`NotificationSink`] after its own
//! state change has committed. Delivery happens elsewhere and can fail
//! without affecting the booking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reference::BookingReference;

/// Delivery channel for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    #[default]
    Email,
    Sms,
    Whatsapp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Sms => "SMS",
            Channel::Whatsapp => "WHATSAPP",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMAIL" => Ok(Channel::Email),
            "SMS" => Ok(Channel::Sms),
            "WHATSAPP" => Ok(Channel::Whatsapp),
            other => Err(format!("unknown notification channel: {other}")),
        }
    }
}

/// A message for a guest. Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub booking_reference: BookingReference,
    pub channel: Channel,
}

impl Notification {
    pub const BOOKING_CONFIRMATION: &'static str = "Booking Confirmation";
    pub const PAYMENT_SUCCESSFUL: &'static str = "Booking Payment Successful";
    pub const PAYMENT_FAILED: &'static str = "Booking Payment Failed";

    /// Confirmation sent when a booking is created, carrying the payment link.
    pub fn booking_confirmation(
        recipient: impl Into<String>,
        reference: BookingReference,
        payment_link: &str,
        channel: Channel,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: Self::BOOKING_CONFIRMATION.to_string(),
            body: format!(
                "Your booking has been created successfully. Please proceed with your payment \
                 using the payment link below\n{payment_link}"
            ),
            booking_reference: reference,
            channel,
        }
    }

    pub fn payment_successful(
        recipient: impl Into<String>,
        reference: BookingReference,
        channel: Channel,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: Self::PAYMENT_SUCCESSFUL.to_string(),
            body: format!(
                "Congratulations! Your payment for booking with reference {reference} was successful."
            ),
            booking_reference: reference,
            channel,
        }
    }

    pub fn payment_failed(
        recipient: impl Into<String>,
        reference: BookingReference,
        reason: &str,
        channel: Channel,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: Self::PAYMENT_FAILED.to_string(),
            body: format!(
                "Your payment for booking with reference {reference} failed with reason: {reason}"
            ),
            booking_reference: reference,
            channel,
        }
    }
}

/// The notification could not be handed over.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("notification queue is closed")]
    QueueClosed,

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Hands notifications to whatever delivers them. Must not block.
pub trait NotificationSink: Send + Sync {
    fn enqueue(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Records notifications in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationSink {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following enqueue fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notifications for one booking, oldest first.
    pub fn sent_for(&self, reference: &BookingReference) -> Vec<Notification> {
        self.sent()
            .into_iter()
            .filter(|n| &n.booking_reference == reference)
            .collect()
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn enqueue(&self, notification: Notification) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Rejected("sink unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
        Ok(())
    }
}
