use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AggregateId;

/// Unique identifier for a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event within its stream, used for optimistic concurrency control.
///
/// A stream that does not exist yet is at version 0; its first event is
/// version 1 and every later event increments by one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Version of a stream with no events.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Version of a stream's first event.
    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// An event as persisted in the store.
///
/// The payload is the JSON form of a domain event; the remaining fields are
/// what the store needs to order, guard and route it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: EventId,

    /// Stream (aggregate instance) the event belongs to.
    pub stream_id: AggregateId,

    /// Kind of stream, e.g. "Room" or "Booking".
    pub stream_type: String,

    /// Name of the domain event, e.g. "StayClaimed".
    pub event_type: String,

    /// Version of the stream after this event.
    pub version: Version,

    /// Store-wide ordering assigned on append. Zero until the event is stored.
    pub position: i64,

    pub recorded_at: DateTime<Utc>,

    /// Booking reference the event relates to, when there is one.
    ///
    /// Lets operators follow a payment callback through every stream it touched.
    pub correlation_id: Option<String>,

    pub payload: serde_json::Value,
}

impl StoredEvent {
    /// Creates an event ready to be appended.
    pub fn new(
        stream_id: AggregateId,
        stream_type: impl Into<String>,
        version: Version,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            stream_id,
            stream_type: stream_type.into(),
            event_type: event_type.into(),
            version,
            position: 0,
            recorded_at: Utc::now(),
            correlation_id: None,
            payload,
        }
    }

    /// Tags the event with the booking reference it concerns.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Overrides the recording time (used when replaying or in tests).
    pub fn recorded_at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }
}
