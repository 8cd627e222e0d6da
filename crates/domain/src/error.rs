//! Domain error types.

use event_store::EventStoreError;
use thiserror::Error;

use crate::booking::BookingError;
use crate::reference::ReferenceError;
use crate::room::RoomError;
use crate::stay::InvalidDateRange;

/// Errors that can occur during booking ledger operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A room, booking or guest does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The stay dates are invalid.
    #[error(transparent)]
    InvalidDateRange(#[from] InvalidDateRange),

    /// The stay price does not fit in the money type.
    #[error("Price overflow: {nightly_rate} x {nights} nights")]
    PriceOverflow { nightly_rate: String, nights: u32 },

    /// An error occurred in the room aggregate.
    #[error("Room error: {0}")]
    Room(#[from] RoomError),

    /// An error occurred in the booking aggregate.
    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    /// An error occurred while registering a booking reference.
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    /// Every generated reference collided with an existing one.
    #[error("Could not generate a unique booking reference after {attempts} attempts")]
    ReferenceGenerationExhausted { attempts: u32 },

    /// A command kept losing optimistic-concurrency races.
    #[error("Gave up on {aggregate_type} {aggregate_id} after {attempts} conflicting attempts")]
    ConcurrencyRetriesExhausted {
        aggregate_type: &'static str,
        aggregate_id: String,
        attempts: u32,
    },
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the error means the requested room/date range is taken.
    pub fn is_room_unavailable(&self) -> bool {
        matches!(self, DomainError::Room(RoomError::Unavailable { .. }))
    }

    /// Returns true if the error reports a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::NotFound { .. }
                | DomainError::Room(RoomError::NotRegistered)
                | DomainError::Booking(BookingError::NotCreated)
        )
    }

    /// Stable error code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            e if e.is_not_found() => "NOT_FOUND",
            DomainError::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            DomainError::Room(RoomError::Unavailable { .. }) => "ROOM_UNAVAILABLE",
            DomainError::Room(RoomError::InvalidRate { .. }) => "INVALID_AMOUNT",
            DomainError::PriceOverflow { .. } => "INVALID_AMOUNT",
            DomainError::Booking(BookingError::AlreadyReconciled { .. }) => "ALREADY_RECONCILED",
            DomainError::Booking(e) if e.is_invalid_transition() => "INVALID_STATE_TRANSITION",
            DomainError::ReferenceGenerationExhausted { .. } => "REFERENCE_GENERATION_EXHAUSTED",
            DomainError::Room(RoomError::AlreadyRegistered)
            | DomainError::Booking(BookingError::AlreadyCreated)
            | DomainError::Reference(_)
            | DomainError::ConcurrencyRetriesExhausted { .. } => "CONFLICT",
            _ => "INTERNAL_ERROR",
        }
    }
}
