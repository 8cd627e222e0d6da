//! Room domain events.

use chrono::{DateTime, NaiveDate, Utc};
use common::{AggregateId, Money, RoomId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;
use crate::stay::StayDates;

use super::RoomDetails;

/// Events that can occur on a room's calendar stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RoomEvent {
    /// Room was added to the inventory.
    RoomRegistered(RoomRegisteredData),

    /// Nightly rate changed for future bookings.
    RoomRateChanged(RoomRateChangedData),

    /// A booking took the room for a range of nights.
    StayClaimed(StayClaimedData),

    /// A booking gave its nights back.
    StayReleased(StayReleasedData),
}

impl DomainEvent for RoomEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::RoomRegistered(_) => "RoomRegistered",
            RoomEvent::RoomRateChanged(_) => "RoomRateChanged",
            RoomEvent::StayClaimed(_) => "StayClaimed",
            RoomEvent::StayReleased(_) => "StayReleased",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRegisteredData {
    pub room_id: RoomId,
    pub details: RoomDetails,
    pub nightly_rate: Money,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRateChangedData {
    pub previous_rate: Money,
    pub nightly_rate: Money,
    pub changed_at: DateTime<Utc>,
}

/// Data for StayClaimed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayClaimedData {
    /// Booking that holds the claim.
    pub booking_id: AggregateId,

    pub check_in: NaiveDate,

    /// First night not included in the stay.
    pub check_out: NaiveDate,

    /// Rate captured at claim time; later rate changes do not affect it.
    pub nightly_rate: Money,

    pub claimed_at: DateTime<Utc>,
}

/// Why a claim was given back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseReason {
    /// The booking was cancelled.
    BookingCancelled,
    /// The booking's payment failed.
    PaymentFailed,
    /// Booking creation failed after the room was claimed.
    CreationAborted,
}

impl std::fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReleaseReason::BookingCancelled => "booking cancelled",
            ReleaseReason::PaymentFailed => "payment failed",
            ReleaseReason::CreationAborted => "creation aborted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayReleasedData {
    pub booking_id: AggregateId,
    pub reason: ReleaseReason,
    pub released_at: DateTime<Utc>,
}

impl RoomEvent {
    pub fn stay_claimed(
        booking_id: AggregateId,
        stay: &StayDates,
        nightly_rate: Money,
        claimed_at: DateTime<Utc>,
    ) -> Self {
        RoomEvent::StayClaimed(StayClaimedData {
            booking_id,
            check_in: stay.check_in(),
            check_out: stay.check_out(),
            nightly_rate,
            claimed_at,
        })
    }

    pub fn stay_released(
        booking_id: AggregateId,
        reason: ReleaseReason,
        released_at: DateTime<Utc>,
    ) -> Self {
        RoomEvent::StayReleased(StayReleasedData {
            booking_id,
            reason,
            released_at,
        })
    }
}
