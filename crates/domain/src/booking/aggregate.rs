//! Booking aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, Money, RoomId, UserId};
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::reference::BookingReference;
use crate::stay::StayDates;

use super::{
    BookingError, BookingEvent, BookingStatus, PaymentRecord, PaymentStatus,
    events::{BookingCreatedData, PaymentReconciledData, StatusChangedData},
};

/// Booking aggregate root.
///
/// The single source of truth for a booking's status and its payment ledger.
/// Dates, price and reference are fixed at creation; only the two status
/// fields change afterwards.
#[derive(Debug, Clone, Default)]
pub struct Booking {
    id: Option<AggregateId>,
    version: Version,
    reference: Option<BookingReference>,
    room_id: Option<RoomId>,
    user_id: Option<UserId>,
    stay: Option<StayDates>,
    total_price: Money,
    booking_status: BookingStatus,
    payment_status: PaymentStatus,
    created_at: Option<DateTime<Utc>>,
    payments: Vec<PaymentRecord>,
}

/// Everything a new booking starts with.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub booking_id: AggregateId,
    pub reference: BookingReference,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub stay: StayDates,
    pub total_price: Money,
}

impl Aggregate for Booking {
    type Event = BookingEvent;
    type Error = BookingError;

    fn aggregate_type() -> &'static str {
        "Booking"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            BookingEvent::BookingCreated(data) => self.apply_created(data),
            BookingEvent::PaymentReconciled(PaymentReconciledData { record }) => {
                self.payment_status = record.status;
                self.payments.push(record);
            }
            BookingEvent::BookingStatusChanged(data) => self.booking_status = data.to,
            BookingEvent::PaymentStatusOverridden(data) => self.payment_status = data.to,
        }
    }

    fn correlation_id(&self) -> Option<String> {
        self.reference.as_ref().map(|r| r.to_string())
    }
}

// Query methods
impl Booking {
    pub fn reference(&self) -> Option<&BookingReference> {
        self.reference.as_ref()
    }

    pub fn room_id(&self) -> Option<RoomId> {
        self.room_id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn stay(&self) -> Option<StayDates> {
        self.stay
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn booking_status(&self) -> BookingStatus {
        self.booking_status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Reconciled payments, oldest first.
    pub fn payments(&self) -> &[PaymentRecord] {
        &self.payments
    }

    /// Returns true while the booking should keep its room claim.
    pub fn holds_room(&self) -> bool {
        self.booking_status != BookingStatus::Cancelled
            && self.payment_status != PaymentStatus::Failed
    }
}

// Command methods (return events)
impl Booking {
    pub fn create(
        &self,
        new: NewBooking,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        if self.id.is_some() {
            return Err(BookingError::AlreadyCreated);
        }

        Ok(vec![BookingEvent::BookingCreated(BookingCreatedData {
            booking_id: new.booking_id,
            reference: new.reference,
            room_id: new.room_id,
            user_id: new.user_id,
            check_in: new.stay.check_in(),
            check_out: new.stay.check_out(),
            total_price: new.total_price,
            created_at: now,
        })])
    }

    /// Applies a reconciled payment.
    ///
    /// Fails with [`BookingError::AlreadyReconciled`] once the payment status
    /// is terminal, so at most one record ever resolves a booking.
    pub fn record_payment(&self, record: PaymentRecord) -> Result<Vec<BookingEvent>, BookingError> {
        self.ensure_created()?;

        if self.payment_status.is_terminal() {
            return Err(BookingError::AlreadyReconciled {
                status: self.payment_status,
            });
        }
        if !self.payment_status.can_transition_to(record.status) {
            return Err(BookingError::InvalidPaymentTransition {
                from: self.payment_status,
                to: record.status,
            });
        }

        Ok(vec![BookingEvent::PaymentReconciled(PaymentReconciledData {
            record,
        })])
    }

    /// Administrative update of the status fields.
    ///
    /// Absent fields are left alone and a field set to its current value is
    /// a no-op. Both changes are validated before either is emitted.
    pub fn update_status(
        &self,
        booking_status: Option<BookingStatus>,
        payment_status: Option<PaymentStatus>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BookingEvent>, BookingError> {
        self.ensure_created()?;

        let mut events = Vec::new();

        if let Some(to) = booking_status
            && to != self.booking_status
        {
            if !self.booking_status.can_transition_to(to) {
                return Err(BookingError::InvalidBookingTransition {
                    from: self.booking_status,
                    to,
                });
            }
            events.push(BookingEvent::BookingStatusChanged(StatusChangedData {
                from: self.booking_status,
                to,
                changed_at: now,
            }));
        }

        if let Some(to) = payment_status
            && to != self.payment_status
        {
            if !self.payment_status.can_transition_to(to) {
                return Err(BookingError::InvalidPaymentTransition {
                    from: self.payment_status,
                    to,
                });
            }
            events.push(BookingEvent::PaymentStatusOverridden(StatusChangedData {
                from: self.payment_status,
                to,
                changed_at: now,
            }));
        }

        Ok(events)
    }

    fn ensure_created(&self) -> Result<(), BookingError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(BookingError::NotCreated),
        }
    }
}

// Event application
impl Booking {
    fn apply_created(&mut self, data: BookingCreatedData) {
        self.id = Some(data.booking_id);
        self.reference = Some(data.reference);
        self.room_id = Some(data.room_id);
        self.user_id = Some(data.user_id);
        self.stay = StayDates::new(data.check_in, data.check_out).ok();
        self.total_price = data.total_price;
        self.booking_status = BookingStatus::Booked;
        self.payment_status = PaymentStatus::Pending;
        self.created_at = Some(data.created_at);
    }
}
