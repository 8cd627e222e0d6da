//! Booking service: the public API of the booking ledger.

use std::sync::Arc;

use chrono::NaiveDate;
use common::{AggregateId, Money, RoomId, UserId};
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::booking::{Booking, NewBooking, PaymentRecord, PaymentStatus};
use crate::clock::{Clock, SystemClock};
use crate::command::{CommandHandler, DEFAULT_MAX_ATTEMPTS};
use crate::commands::{ChangeRoomRate, CreateBooking, RegisterRoom, UpdateBooking};
use crate::directory::{Guest, UserDirectory};
use crate::error::DomainError;
use crate::notification::{Channel, Notification, NotificationSink};
use crate::pricing::stay_price;
use crate::reference::{
    BookingReference, RandomReferenceGenerator, ReferenceError, ReferenceGenerator,
    ReferenceRegistration,
};
use crate::room::{ReleaseReason, Room};
use crate::stay::StayDates;

/// Settings for [`BookingService`].
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Prefix of the payment link sent in the booking confirmation.
    pub payment_link_base_url: String,

    /// Channel used for guest notifications.
    pub notification_channel: Channel,

    /// Candidate references tried before giving up.
    pub reference_attempts: u32,

    /// Attempts for commands that lose a version race.
    pub command_retry_attempts: u32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            payment_link_base_url: "http://localhost:3000/payment/".to_string(),
            notification_channel: Channel::Email,
            reference_attempts: 5,
            command_retry_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Service for managing rooms and bookings.
///
/// Wraps one command handler per aggregate kind. Rooms, bookings and
/// reference registrations share the same event store.
pub struct BookingService<S: EventStore> {
    rooms: CommandHandler<S, Room>,
    bookings: CommandHandler<S, Booking>,
    references: CommandHandler<S, ReferenceRegistration>,
    clock: Arc<dyn Clock>,
    reference_generator: Arc<dyn ReferenceGenerator>,
    directory: Arc<dyn UserDirectory>,
    notifications: Arc<dyn NotificationSink>,
    config: BookingConfig,
}

impl<S: EventStore + Clone> BookingService<S> {
    /// Creates a booking service using the system clock and random references.
    pub fn new(
        store: S,
        directory: Arc<dyn UserDirectory>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            rooms: CommandHandler::new(store.clone()),
            bookings: CommandHandler::new(store.clone()),
            references: CommandHandler::new(store),
            clock: Arc::new(SystemClock),
            reference_generator: Arc::new(RandomReferenceGenerator::default()),
            directory,
            notifications,
            config: BookingConfig::default(),
        }
    }
}

impl<S: EventStore> BookingService<S> {
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_reference_generator(mut self, generator: Arc<dyn ReferenceGenerator>) -> Self {
        self.reference_generator = generator;
        self
    }

    pub fn with_config(mut self, config: BookingConfig) -> Self {
        self.rooms = self.rooms.with_max_attempts(config.command_retry_attempts);
        self.bookings = self.bookings.with_max_attempts(config.command_retry_attempts);
        self.config = config;
        self
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        self.bookings.store()
    }

    // -- Rooms --

    /// Adds a room to the inventory.
    #[tracing::instrument(skip(self, cmd), fields(room_id = %cmd.room_id))]
    pub async fn register_room(&self, cmd: RegisterRoom) -> Result<Room, DomainError> {
        let now = self.clock.now();
        let result = self
            .rooms
            .execute(cmd.room_id.aggregate_id(), |room| {
                room.register(cmd.room_id, cmd.details.clone(), cmd.nightly_rate, now)
            })
            .await?;

        tracing::info!(room_number = %result.aggregate.details().room_number, "room registered");
        Ok(result.aggregate)
    }

    /// Changes a room's nightly rate. Existing bookings keep their price.
    #[tracing::instrument(skip(self, cmd), fields(room_id = %cmd.room_id))]
    pub async fn change_room_rate(&self, cmd: ChangeRoomRate) -> Result<Room, DomainError> {
        self.require_room(cmd.room_id).await?;

        let now = self.clock.now();
        let result = self
            .rooms
            .execute_with_retry(cmd.room_id.aggregate_id(), |room| {
                room.change_rate(cmd.nightly_rate, now)
            })
            .await?;
        Ok(result.aggregate)
    }

    /// Loads a room by ID.
    ///
    /// Returns None if the room doesn't exist.
    pub async fn get_room(&self, room_id: RoomId) -> Result<Option<Room>, DomainError> {
        self.rooms.load_existing(room_id.aggregate_id()).await
    }

    /// Read-only availability check.
    ///
    /// The answer can be stale by the time a booking is attempted; the claim
    /// made by [`create_booking`](Self::create_booking) is what decides.
    #[tracing::instrument(skip(self))]
    pub async fn is_room_available(
        &self,
        room_id: RoomId,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, DomainError> {
        let stay = StayDates::new(check_in, check_out)?;
        let room = self.require_room(room_id).await?;
        Ok(room.is_available(&stay))
    }

    // -- Bookings --

    /// Books a room for a guest.
    ///
    /// Claims the room, issues a unique reference and records the booking in
    /// (BOOKED, PENDING). If anything fails after the claim, the claim is
    /// released before the error is returned. A confirmation with the payment
    /// link is queued once the booking is stored.
    #[tracing::instrument(
        skip(self, cmd),
        fields(booking_id = %cmd.booking_id, room_id = %cmd.room_id, user_id = %cmd.user_id)
    )]
    pub async fn create_booking(&self, cmd: CreateBooking) -> Result<Booking, DomainError> {
        let result = self.try_create_booking(cmd).await;

        match &result {
            Ok(booking) => {
                metrics::counter!("bookings_created_total").increment(1);
                tracing::info!(
                    booking_reference = %display_reference(booking),
                    total_price = %booking.total_price(),
                    "booking created"
                );
            }
            Err(e) => {
                metrics::counter!("bookings_rejected_total", "reason" => e.code()).increment(1);
                tracing::warn!(error = %e, "booking rejected");
            }
        }

        result
    }

    async fn try_create_booking(&self, cmd: CreateBooking) -> Result<Booking, DomainError> {
        let room = self.require_room(cmd.room_id).await?;
        let stay = StayDates::for_new_booking(cmd.check_in, cmd.check_out, self.clock.today())?;
        let guest = self
            .directory
            .find_guest(cmd.user_id)
            .await
            .ok_or_else(|| DomainError::not_found("User", cmd.user_id))?;

        if !room.is_available(&stay) {
            return Err(crate::room::RoomError::Unavailable {
                check_in: stay.check_in(),
                check_out: stay.check_out(),
                held_by: room
                    .claims()
                    .iter()
                    .find(|c| c.stay.overlaps(&stay))
                    .map(|c| c.booking_id)
                    .unwrap_or_default(),
            }
            .into());
        }

        let booking_id = cmd.booking_id;
        let now = self.clock.now();
        let claimed = self
            .rooms
            .execute_with_retry(cmd.room_id.aggregate_id(), |room| {
                room.claim(booking_id, stay, now)
            })
            .await?;

        let nightly_rate = claimed
            .aggregate
            .claim_for(booking_id)
            .map(|c| c.nightly_rate)
            .unwrap_or_else(|| claimed.aggregate.nightly_rate());

        match self
            .persist_claimed_booking(&cmd, stay, nightly_rate)
            .await
        {
            Ok(booking) => {
                self.send_confirmation(&booking, &guest);
                Ok(booking)
            }
            Err(e) => {
                self.release_claim(cmd.room_id, booking_id, ReleaseReason::CreationAborted)
                    .await;
                Err(e)
            }
        }
    }

    async fn persist_claimed_booking(
        &self,
        cmd: &CreateBooking,
        stay: StayDates,
        nightly_rate: Money,
    ) -> Result<Booking, DomainError> {
        let total_price = stay_price(nightly_rate, &stay)?;
        let reference = self.issue_reference(cmd.booking_id).await?;

        let new = NewBooking {
            booking_id: cmd.booking_id,
            reference,
            room_id: cmd.room_id,
            user_id: cmd.user_id,
            stay,
            total_price,
        };
        let now = self.clock.now();
        let result = self
            .bookings
            .execute(cmd.booking_id, |booking| booking.create(new, now))
            .await?;
        Ok(result.aggregate)
    }

    /// Registers a fresh reference for the booking, regenerating on collision.
    async fn issue_reference(&self, booking_id: AggregateId) -> Result<BookingReference, DomainError> {
        let attempts = self.config.reference_attempts.max(1);
        let now = self.clock.now();

        for attempt in 1..=attempts {
            let reference = self.reference_generator.generate();
            let issued = self
                .references
                .execute(reference.registration_id(), |registration| {
                    registration.issue(reference.clone(), booking_id, now)
                })
                .await;

            match issued {
                Ok(_) => return Ok(reference),
                Err(DomainError::Reference(ReferenceError::AlreadyIssued { .. })) => {
                    tracing::debug!(%reference, attempt, "booking reference collision");
                }
                Err(DomainError::EventStore(e)) if e.is_conflict() => {
                    tracing::debug!(%reference, attempt, "booking reference taken concurrently");
                }
                Err(e) => return Err(e),
            }
        }

        Err(DomainError::ReferenceGenerationExhausted { attempts })
    }

    /// Administrative update of a booking's status fields.
    ///
    /// Only the fields present in the command are applied, and both must be
    /// valid transitions. Cancelling the booking or failing its payment
    /// releases the room.
    #[tracing::instrument(skip(self, cmd), fields(booking_id = %cmd.booking_id))]
    pub async fn update_booking(&self, cmd: UpdateBooking) -> Result<Booking, DomainError> {
        self.require_booking(cmd.booking_id).await?;

        let now = self.clock.now();
        let result = self
            .bookings
            .execute_with_retry(cmd.booking_id, |booking| {
                booking.update_status(cmd.booking_status, cmd.payment_status, now)
            })
            .await?;

        let booking = result.aggregate;
        if !result.events.is_empty() {
            tracing::info!(
                booking_reference = %display_reference(&booking),
                booking_status = %booking.booking_status(),
                payment_status = %booking.payment_status(),
                "booking updated"
            );
            self.release_if_inactive(&booking).await;
        }

        Ok(booking)
    }

    /// Applies a reconciled payment to a booking.
    ///
    /// The record and the payment status change are one event. A failed
    /// payment releases the room.
    #[tracing::instrument(skip(self, record), fields(booking_reference = %record.booking_reference))]
    pub async fn record_payment(
        &self,
        booking_id: AggregateId,
        record: PaymentRecord,
    ) -> Result<Booking, DomainError> {
        let result = self
            .bookings
            .execute_with_retry(booking_id, |booking| booking.record_payment(record.clone()))
            .await?;

        let booking = result.aggregate;
        self.release_if_inactive(&booking).await;
        Ok(booking)
    }

    /// Loads a booking by ID.
    ///
    /// Returns None if the booking doesn't exist.
    pub async fn get_booking(&self, booking_id: AggregateId) -> Result<Option<Booking>, DomainError> {
        self.bookings.load_existing(booking_id).await
    }

    /// Resolves a booking through its reference registration.
    #[tracing::instrument(skip(self))]
    pub async fn find_booking_by_reference(
        &self,
        reference: &BookingReference,
    ) -> Result<Booking, DomainError> {
        let registration = self
            .references
            .load_existing(reference.registration_id())
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", reference))?;

        let booking_id = registration
            .booking_id()
            .ok_or_else(|| DomainError::not_found("Booking", reference))?;

        // A reference can be issued by a creation that later failed.
        self.require_booking(booking_id)
            .await
            .map_err(|_| DomainError::not_found("Booking", reference))
    }

    // -- Guests & notifications --

    pub async fn find_guest(&self, user_id: UserId) -> Option<Guest> {
        self.directory.find_guest(user_id).await
    }

    pub fn notification_channel(&self) -> Channel {
        self.config.notification_channel
    }

    /// Queues a notification. Failures are logged, never returned.
    pub fn notify(&self, notification: Notification) {
        let reference = notification.booking_reference.clone();
        let subject = notification.subject.clone();
        match self.notifications.enqueue(notification) {
            Ok(()) => tracing::debug!(booking_reference = %reference, %subject, "notification queued"),
            Err(e) => tracing::warn!(
                booking_reference = %reference,
                %subject,
                error = %e,
                "failed to queue notification"
            ),
        }
    }

    // -- Helpers --

    async fn require_room(&self, room_id: RoomId) -> Result<Room, DomainError> {
        self.get_room(room_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Room", room_id))
    }

    async fn require_booking(&self, booking_id: AggregateId) -> Result<Booking, DomainError> {
        self.get_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", booking_id))
    }

    fn send_confirmation(&self, booking: &Booking, guest: &Guest) {
        let Some(reference) = booking.reference().cloned() else {
            return;
        };
        let payment_link = format!(
            "{}{}/{}",
            self.config.payment_link_base_url,
            reference,
            booking.total_price()
        );
        tracing::info!(booking_reference = %reference, %payment_link, "payment link issued");

        self.notify(Notification::booking_confirmation(
            guest.email.clone(),
            reference,
            &payment_link,
            self.config.notification_channel,
        ));
    }

    async fn release_if_inactive(&self, booking: &Booking) {
        if booking.holds_room() {
            return;
        }
        let (Some(room_id), Some(booking_id)) = (booking.room_id(), booking.id()) else {
            return;
        };
        let reason = if booking.payment_status() == PaymentStatus::Failed {
            ReleaseReason::PaymentFailed
        } else {
            ReleaseReason::BookingCancelled
        };
        self.release_claim(room_id, booking_id, reason).await;
    }

    /// Gives a booking's nights back. A failure leaves the nights blocked and
    /// is logged; it never undoes the booking change that triggered it.
    async fn release_claim(&self, room_id: RoomId, booking_id: AggregateId, reason: ReleaseReason) {
        let now = self.clock.now();
        let released = self
            .rooms
            .execute_with_retry(room_id.aggregate_id(), |room| {
                room.release(booking_id, reason, now)
            })
            .await;

        match released {
            Ok(result) if !result.events.is_empty() => {
                tracing::info!(%room_id, %booking_id, %reason, "room claim released");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(
                %room_id,
                %booking_id,
                %reason,
                error = %e,
                "failed to release room claim"
            ),
        }
    }
}

fn display_reference(booking: &Booking) -> String {
    booking
        .reference()
        .map(|r| r.to_string())
        .unwrap_or_default()
}
