use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, DomainEvent};

use super::{BookingReference, ReferenceError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ReferenceEvent {
    ReferenceIssued(ReferenceIssuedData),
}

impl DomainEvent for ReferenceEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReferenceEvent::ReferenceIssued(_) => "ReferenceIssued",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceIssuedData {
    pub reference: BookingReference,
    pub booking_id: AggregateId,
    pub issued_at: DateTime<Utc>,
}

/// Maps a booking reference to the booking that owns it.
///
/// Lives in the stream returned by [`BookingReference::registration_id`].
#[derive(Debug, Clone, Default)]
pub struct ReferenceRegistration {
    id: Option<AggregateId>,
    version: Version,
    reference: Option<BookingReference>,
    booking_id: Option<AggregateId>,
}

impl Aggregate for ReferenceRegistration {
    type Event = ReferenceEvent;
    type Error = ReferenceError;

    fn aggregate_type() -> &'static str {
        "BookingReference"
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
            ReferenceEvent::ReferenceIssued(data) => {
                self.id = Some(data.reference.registration_id());
                self.reference = Some(data.reference);
                self.booking_id = Some(data.booking_id);
            }
        }
    }

    fn correlation_id(&self) -> Option<String> {
        self.reference.as_ref().map(|r| r.to_string())
    }
}

impl ReferenceRegistration {
    pub fn booking_id(&self) -> Option<AggregateId> {
        self.booking_id
    }

    /// Issues the reference to a booking.
    pub fn issue(
        &self,
        reference: BookingReference,
        booking_id: AggregateId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReferenceEvent>, ReferenceError> {
        if self.id.is_some() {
            return Err(ReferenceError::AlreadyIssued { reference });
        }

        Ok(vec![ReferenceEvent::ReferenceIssued(ReferenceIssuedData {
            reference,
            booking_id,
            issued_at: now,
        })])
    }
}
