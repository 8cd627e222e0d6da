//! Room aggregate: inventory metadata plus the calendar of claimed nights.

mod aggregate;
mod events;

pub use aggregate::{Room, StayClaim};
pub use events::{
    ReleaseReason, RoomEvent, RoomRateChangedData, RoomRegisteredData, StayClaimedData,
    StayReleasedData,
};

use chrono::NaiveDate;
use common::AggregateId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Static metadata describing a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetails {
    pub room_number: String,
    pub room_type: String,
    pub capacity: u32,
    #[serde(default)]
    pub description: String,
}

impl RoomDetails {
    pub fn new(room_number: impl Into<String>, room_type: impl Into<String>, capacity: u32) -> Self {
        Self {
            room_number: room_number.into(),
            room_type: room_type.into(),
            capacity,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Errors that can occur during room operations.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room already registered")]
    AlreadyRegistered,

    #[error("Room is not registered")]
    NotRegistered,

    #[error("Invalid nightly rate: {rate} (must be greater than 0)")]
    InvalidRate { rate: String },

    /// Another booking holds an overlapping range.
    #[error("Room is not available from {check_in} to {check_out}")]
    Unavailable {
        check_in: NaiveDate,
        check_out: NaiveDate,
        held_by: AggregateId,
    },
}
