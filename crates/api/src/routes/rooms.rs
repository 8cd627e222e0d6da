//! Room inventory and availability endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::Money;
use domain::{ChangeRoomRate, RegisterRoom, Room, RoomDetails};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use super::{parse_date, parse_room_id};
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRoomRequest {
    pub room_number: String,
    pub room_type: String,
    pub capacity: u32,
    #[serde(default)]
    pub description: String,
    pub nightly_rate: Money,
}

#[derive(Deserialize)]
pub struct ChangeRateRequest {
    pub nightly_rate: Money,
}

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub check_in: String,
    pub check_out: String,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub room_number: String,
    pub room_type: String,
    pub capacity: u32,
    pub description: String,
    pub nightly_rate: Money,
}

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        let details = room.details();
        Self {
            id: room.room_id().map(|id| id.to_string()).unwrap_or_default(),
            room_number: details.room_number.clone(),
            room_type: details.room_type.clone(),
            capacity: details.capacity,
            description: details.description.clone(),
            nightly_rate: room.nightly_rate(),
        }
    }
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub room_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub available: bool,
}

// -- Handlers --

/// POST /rooms
#[tracing::instrument(skip(state, req), fields(room_number = %req.room_number))]
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterRoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ApiError> {
    if req.room_number.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "room_number must not be empty".to_string(),
        ));
    }
    if req.capacity == 0 {
        return Err(ApiError::BadRequest("capacity must be at least 1".to_string()));
    }

    let details = RoomDetails::new(req.room_number.trim(), req.room_type.trim(), req.capacity)
        .with_description(req.description);
    let room = state
        .bookings
        .register_room(RegisterRoom::new(details, req.nightly_rate))
        .await?;

    Ok((StatusCode::CREATED, Json(RoomResponse::from(&room))))
}

/// PUT /rooms/{id}/rate
#[tracing::instrument(skip(state, req))]
pub async fn change_rate<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ChangeRateRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room_id = parse_room_id(&id)?;
    let room = state
        .bookings
        .change_room_rate(ChangeRoomRate {
            room_id,
            nightly_rate: req.nightly_rate,
        })
        .await?;

    Ok(Json(RoomResponse::from(&room)))
}

/// GET /rooms/{id}/availability?check_in=YYYY-MM-DD&check_out=YYYY-MM-DD
#[tracing::instrument(skip(state, query))]
pub async fn availability<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let room_id = parse_room_id(&id)?;
    let check_in = parse_date("check_in", &query.check_in)?;
    let check_out = parse_date("check_out", &query.check_out)?;

    let available = state
        .bookings
        .is_room_available(room_id, check_in, check_out)
        .await?;

    Ok(Json(AvailabilityResponse {
        room_id: room_id.to_string(),
        check_in,
        check_out,
        available,
    }))
}
