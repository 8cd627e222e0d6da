//! Booking domain events.

use chrono::{DateTime, NaiveDate, Utc};
use common::{AggregateId, Money, RoomId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::reference::BookingReference;

use super::{BookingStatus, PaymentRecord, PaymentStatus};

/// Events that can occur on a booking aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    /// Booking was created in (BOOKED, PENDING).
    BookingCreated(BookingCreatedData),

    /// A payment outcome was applied. The record and the resulting payment
    /// status travel in one event so neither can exist without the other.
    PaymentReconciled(PaymentReconciledData),

    /// Booking status was changed by an administrator.
    BookingStatusChanged(StatusChangedData<BookingStatus>),

    /// Payment status was set by an administrator rather than a callback.
    PaymentStatusOverridden(StatusChangedData<PaymentStatus>),
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::BookingCreated(_) => "BookingCreated",
            BookingEvent::PaymentReconciled(_) => "PaymentReconciled",
            BookingEvent::BookingStatusChanged(_) => "BookingStatusChanged",
            BookingEvent::PaymentStatusOverridden(_) => "PaymentStatusOverridden",
        }
    }
}

/// Data for BookingCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreatedData {
    pub booking_id: AggregateId,
    pub reference: BookingReference,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,

    /// Nightly rate times nights, fixed at creation.
    pub total_price: Money,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReconciledData {
    pub record: PaymentRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangedData<T> {
    pub from: T,
    pub to: T,
    pub changed_at: DateTime<Utc>,
}
