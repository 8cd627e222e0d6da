//! Bookings read model: every booking with its current statuses.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{AggregateId, Money, RoomId, UserId};
use domain::{BookingEvent, BookingReference, BookingStatus, PaymentStatus};
use event_store::StoredEvent;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One row of the booking list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub booking_id: AggregateId,
    pub booking_reference: BookingReference,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub total_price: Money,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    position: i64,
}

#[derive(Default)]
struct BookingsState {
    bookings: HashMap<AggregateId, BookingSummary>,
    by_reference: HashMap<BookingReference, AggregateId>,
    position: ProjectionPosition,
}

/// Every booking, newest first.
#[derive(Clone, Default)]
pub struct BookingsView {
    state: Arc<RwLock<BookingsState>>,
}

impl BookingsView {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bookings, most recently created first.
    pub async fn list(&self) -> Vec<BookingSummary> {
        let state = self.state.read().await;
        let mut bookings: Vec<_> = state.bookings.values().cloned().collect();
        bookings.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.position.cmp(&a.position))
        });
        bookings
    }

    pub async fn get(&self, booking_id: AggregateId) -> Option<BookingSummary> {
        self.state.read().await.bookings.get(&booking_id).cloned()
    }

    pub async fn get_by_reference(&self, reference: &BookingReference) -> Option<BookingSummary> {
        let state = self.state.read().await;
        let booking_id = state.by_reference.get(reference)?;
        state.bookings.get(booking_id).cloned()
    }

    /// Bookings of one room, most recently created first.
    pub async fn for_room(&self, room_id: RoomId) -> Vec<BookingSummary> {
        self.list()
            .await
            .into_iter()
            .filter(|b| b.room_id == room_id)
            .collect()
    }
}

impl ReadModel for BookingsView {
    fn name(&self) -> &'static str {
        "BookingsView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|state| state.bookings.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl Projection for BookingsView {
    fn name(&self) -> &'static str {
        "BookingsView"
    }

    async fn handle(&self, event: &StoredEvent) -> Result<()> {
        let mut state = self.state.write().await;
        state.position = ProjectionPosition::at(event.position);

        if event.stream_type != "Booking" {
            return Ok(());
        }

        let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;
        let booking_id = event.stream_id;

        match booking_event {
            BookingEvent::BookingCreated(data) => {
                state
                    .by_reference
                    .insert(data.reference.clone(), booking_id);
                state.bookings.insert(
                    booking_id,
                    BookingSummary {
                        booking_id,
                        booking_reference: data.reference,
                        room_id: data.room_id,
                        user_id: data.user_id,
                        check_in: data.check_in,
                        check_out: data.check_out,
                        total_price: data.total_price,
                        booking_status: BookingStatus::Booked,
                        payment_status: PaymentStatus::Pending,
                        created_at: data.created_at,
                        updated_at: data.created_at,
                        position: event.position,
                    },
                );
            }
            BookingEvent::PaymentReconciled(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.payment_status = data.record.status;
                    booking.updated_at = data.record.paid_at;
                }
            }
            BookingEvent::BookingStatusChanged(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.booking_status = data.to;
                    booking.updated_at = data.changed_at;
                }
            }
            BookingEvent::PaymentStatusOverridden(data) => {
                if let Some(booking) = state.bookings.get_mut(&booking_id) {
                    booking.payment_status = data.to;
                    booking.updated_at = data.changed_at;
                }
            }
        }

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = BookingsState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use domain::booking::{BookingCreatedData, StatusChangedData};
    use domain::DomainEvent;
    use event_store::Version;

    fn stored(booking_id: AggregateId, version: i64, position: i64, event: BookingEvent) -> StoredEvent {
        let mut stored = StoredEvent::new(
            booking_id,
            "Booking",
            Version::new(version),
            event.event_type(),
            serde_json::to_value(&event).unwrap(),
        );
        stored.position = position;
        stored
    }

    fn created(booking_id: AggregateId, reference: &str, created_at: DateTime<Utc>) -> BookingEvent {
        BookingEvent::BookingCreated(BookingCreatedData {
            booking_id,
            reference: BookingReference::new(reference),
            room_id: RoomId::new(),
            user_id: UserId::new(),
            check_in: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            check_out: NaiveDate::from_ymd_opt(2024, 6, 4).unwrap(),
            total_price: Money::from_major(300),
            created_at,
        })
    }

    #[tokio::test]
    async fn created_booking_is_listed_and_addressable() {
        let view = BookingsView::new();
        let id = AggregateId::new();
        view.handle(&stored(id, 1, 1, created(id, "AAAAAAAAAA", Utc::now())))
            .await
            .unwrap();

        let summary = view
            .get_by_reference(&BookingReference::new("AAAAAAAAAA"))
            .await
            .unwrap();
        assert_eq!(summary.booking_id, id);
        assert_eq!(summary.booking_status, BookingStatus::Booked);
        assert_eq!(summary.payment_status, PaymentStatus::Pending);
        assert_eq!(view.count(), 1);
        assert_eq!(view.position().await, ProjectionPosition::at(1));
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let view = BookingsView::new();
        let now = Utc::now();
        let older = AggregateId::new();
        let newer = AggregateId::new();
        view.handle(&stored(older, 1, 1, created(older, "AAAAAAAAAA", now - Duration::hours(1))))
            .await
            .unwrap();
        view.handle(&stored(newer, 1, 2, created(newer, "BBBBBBBBBB", now)))
            .await
            .unwrap();

        let ids: Vec<_> = view.list().await.into_iter().map(|b| b.booking_id).collect();
        assert_eq!(ids, vec![newer, older]);
    }

    #[tokio::test]
    async fn status_changes_are_applied() {
        let view = BookingsView::new();
        let id = AggregateId::new();
        view.handle(&stored(id, 1, 1, created(id, "AAAAAAAAAA", Utc::now())))
            .await
            .unwrap();
        view.handle(&stored(
            id,
            2,
            2,
            BookingEvent::BookingStatusChanged(StatusChangedData {
                from: BookingStatus::Booked,
                to: BookingStatus::Cancelled,
                changed_at: Utc::now(),
            }),
        ))
        .await
        .unwrap();

        assert_eq!(
            view.get(id).await.unwrap().booking_status,
            BookingStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn other_streams_only_move_the_position() {
        let view = BookingsView::new();
        let mut room_event = StoredEvent::new(
            AggregateId::new(),
            "Room",
            Version::first(),
            "RoomRegistered",
            serde_json::json!({}),
        );
        room_event.position = 7;

        view.handle(&room_event).await.unwrap();

        assert!(view.list().await.is_empty());
        assert_eq!(view.position().await, ProjectionPosition::at(7));
    }
}
