//! Route handlers, one module per resource.

pub mod bookings;
pub mod guests;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod rooms;

use chrono::NaiveDate;
use common::{AggregateId, RoomId, UserId};

use crate::error::ApiError;

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(value).map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}

pub(crate) fn parse_aggregate_id(field: &str, value: &str) -> Result<AggregateId, ApiError> {
    parse_uuid(field, value).map(AggregateId::from_uuid)
}

pub(crate) fn parse_room_id(value: &str) -> Result<RoomId, ApiError> {
    parse_uuid("room_id", value).map(RoomId::from_uuid)
}

pub(crate) fn parse_user_id(value: &str) -> Result<UserId, ApiError> {
    parse_uuid("user_id", value).map(UserId::from_uuid)
}

/// Parses an ISO `YYYY-MM-DD` date.
pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}
