//! Room aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, Money, RoomId};
use event_store::Version;

use crate::aggregate::Aggregate;
use crate::stay::StayDates;

use super::{
    ReleaseReason, RoomDetails, RoomError, RoomEvent,
    events::{RoomRateChangedData, RoomRegisteredData, StayClaimedData},
};

/// A night range held by a booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StayClaim {
    pub booking_id: AggregateId,
    pub stay: StayDates,
    pub nightly_rate: Money,
}

/// Room aggregate root.
///
/// Availability is never stored as a flag: it is derived from the set of
/// active claims on the room's stream. Claiming is a command on this
/// aggregate, so the overlap check and the claim commit together under the
/// stream's version.
#[derive(Debug, Clone, Default)]
pub struct Room {
    id: Option<RoomId>,
    version: Version,
    details: RoomDetails,
    nightly_rate: Money,
    claims: Vec<StayClaim>,
}

impl Aggregate for Room {
    type Event = RoomEvent;
    type Error = RoomError;

    fn aggregate_type() -> &'static str {
        "Room"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.map(|id| id.aggregate_id())
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            RoomEvent::RoomRegistered(data) => self.apply_registered(data),
            RoomEvent::RoomRateChanged(data) => self.apply_rate_changed(data),
            RoomEvent::StayClaimed(data) => self.apply_stay_claimed(data),
            RoomEvent::StayReleased(data) => {
                self.claims.retain(|c| c.booking_id != data.booking_id);
            }
        }
    }
}

// Query methods
impl Room {
    pub fn room_id(&self) -> Option<RoomId> {
        self.id
    }

    pub fn details(&self) -> &RoomDetails {
        &self.details
    }

    /// Rate applied to bookings claimed from now on.
    pub fn nightly_rate(&self) -> Money {
        self.nightly_rate
    }

    /// Active claims on the room.
    pub fn claims(&self) -> &[StayClaim] {
        &self.claims
    }

    /// Returns the claim held by a booking, if any.
    pub fn claim_for(&self, booking_id: AggregateId) -> Option<&StayClaim> {
        self.claims.iter().find(|c| c.booking_id == booking_id)
    }

    /// Returns true if no active claim overlaps the stay.
    pub fn is_available(&self, stay: &StayDates) -> bool {
        !self.claims.iter().any(|c| c.stay.overlaps(stay))
    }
}

// Command methods (return events)
impl Room {
    /// Registers the room with its metadata and nightly rate.
    pub fn register(
        &self,
        room_id: RoomId,
        details: RoomDetails,
        nightly_rate: Money,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        if self.id.is_some() {
            return Err(RoomError::AlreadyRegistered);
        }
        if !nightly_rate.is_positive() {
            return Err(RoomError::InvalidRate {
                rate: nightly_rate.to_string(),
            });
        }

        Ok(vec![RoomEvent::RoomRegistered(RoomRegisteredData {
            room_id,
            details,
            nightly_rate,
            registered_at: now,
        })])
    }

    /// Changes the nightly rate. Existing claims keep the rate they captured.
    pub fn change_rate(
        &self,
        nightly_rate: Money,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_registered()?;
        if !nightly_rate.is_positive() {
            return Err(RoomError::InvalidRate {
                rate: nightly_rate.to_string(),
            });
        }
        if nightly_rate == self.nightly_rate {
            return Ok(vec![]);
        }

        Ok(vec![RoomEvent::RoomRateChanged(RoomRateChangedData {
            previous_rate: self.nightly_rate,
            nightly_rate,
            changed_at: now,
        })])
    }

    /// Claims the room for a booking.
    ///
    /// Fails with [`RoomError::Unavailable`] if any active claim overlaps.
    /// Claiming again for a booking that already holds the same nights is a
    /// no-op.
    pub fn claim(
        &self,
        booking_id: AggregateId,
        stay: StayDates,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_registered()?;

        if let Some(existing) = self.claim_for(booking_id)
            && existing.stay == stay
        {
            return Ok(vec![]);
        }

        if let Some(conflict) = self.claims.iter().find(|c| c.stay.overlaps(&stay)) {
            return Err(RoomError::Unavailable {
                check_in: stay.check_in(),
                check_out: stay.check_out(),
                held_by: conflict.booking_id,
            });
        }

        Ok(vec![RoomEvent::stay_claimed(
            booking_id,
            &stay,
            self.nightly_rate,
            now,
        )])
    }

    /// Releases a booking's claim. Releasing a claim that is not held is a no-op.
    pub fn release(
        &self,
        booking_id: AggregateId,
        reason: ReleaseReason,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_registered()?;

        if self.claim_for(booking_id).is_none() {
            return Ok(vec![]);
        }

        Ok(vec![RoomEvent::stay_released(booking_id, reason, now)])
    }

    fn ensure_registered(&self) -> Result<(), RoomError> {
        match self.id {
            Some(_) => Ok(()),
            None => Err(RoomError::NotRegistered),
        }
    }
}

// Event application
impl Room {
    fn apply_registered(&mut self, data: RoomRegisteredData) {
        self.id = Some(data.room_id);
        self.details = data.details;
        self.nightly_rate = data.nightly_rate;
    }

    fn apply_rate_changed(&mut self, data: RoomRateChangedData) {
        self.nightly_rate = data.nightly_rate;
    }

    fn apply_stay_claimed(&mut self, data: StayClaimedData) {
        // Events are facts; a stored claim always has valid dates.
        let Ok(stay) = StayDates::new(data.check_in, data.check_out) else {
            return;
        };
        self.claims.retain(|c| c.booking_id != data.booking_id);
        self.claims.push(StayClaim {
            booking_id: data.booking_id,
            stay,
            nightly_rate: data.nightly_rate,
        });
    }
}
