//! Booking endpoints.
//!
//! Reads by reference go through the reference registration and always see
//! the latest write. Listings and payment history come from the read models
//! after a catch-up run.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, Utc};
use common::Money;
use domain::{
    Aggregate, Booking, BookingReference, BookingStatus, CreateBooking, PaymentRecord,
    PaymentStatus, UpdateBooking,
};
use event_store::EventStore;
use projections::BookingSummary;
use serde::{Deserialize, Serialize};

use super::{parse_aggregate_id, parse_date, parse_room_id, parse_user_id};
use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub room_id: String,
    pub check_in: String,
    pub check_out: String,
}

/// Absent fields are left unchanged.
#[derive(Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(default)]
    pub booking_status: Option<BookingStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub booking_reference: String,
    pub user_id: String,
    pub room_id: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub nights: u32,
    pub total_price: Money,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub payments: Vec<PaymentRecord>,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        let stay = booking.stay();
        Self {
            id: booking.id().map(|id| id.to_string()).unwrap_or_default(),
            booking_reference: booking
                .reference()
                .map(|r| r.to_string())
                .unwrap_or_default(),
            user_id: booking.user_id().map(|id| id.to_string()).unwrap_or_default(),
            room_id: booking.room_id().map(|id| id.to_string()).unwrap_or_default(),
            check_in: stay.map(|s| s.check_in()),
            check_out: stay.map(|s| s.check_out()),
            nights: stay.map(|s| s.nights()).unwrap_or_default(),
            total_price: booking.total_price(),
            booking_status: booking.booking_status(),
            payment_status: booking.payment_status(),
            created_at: booking.created_at(),
            payments: booking.payments().to_vec(),
        }
    }
}

// -- Handlers --

/// POST /bookings
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let cmd = CreateBooking::new(
        parse_user_id(&req.user_id)?,
        parse_room_id(&req.room_id)?,
        parse_date("check_in", &req.check_in)?,
        parse_date("check_out", &req.check_out)?,
    );
    let booking = state.bookings.create_booking(cmd).await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(&booking))))
}

/// GET /bookings
#[tracing::instrument(skip(state))]
pub async fn list<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<BookingSummary>>, ApiError> {
    state.processor.run_catch_up().await?;
    Ok(Json(state.bookings_view.list().await))
}

/// GET /bookings/{reference}
#[tracing::instrument(skip(state))]
pub async fn get<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(reference): Path<String>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = state
        .bookings
        .find_booking_by_reference(&BookingReference::new(reference))
        .await?;

    Ok(Json(BookingResponse::from(&booking)))
}

/// PATCH /bookings/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = parse_aggregate_id("booking id", &id)?;
    if req.booking_status.is_none() && req.payment_status.is_none() {
        return Err(ApiError::BadRequest(
            "Provide booking_status or payment_status".to_string(),
        ));
    }

    let booking = state
        .bookings
        .update_booking(UpdateBooking {
            booking_id,
            booking_status: req.booking_status,
            payment_status: req.payment_status,
        })
        .await?;

    Ok(Json(BookingResponse::from(&booking)))
}

/// GET /bookings/{reference}/payments
#[tracing::instrument(skip(state))]
pub async fn payments<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(reference): Path<String>,
) -> Result<Json<Vec<PaymentRecord>>, ApiError> {
    let reference = BookingReference::new(reference);
    state.processor.run_catch_up().await?;

    if state
        .bookings_view
        .get_by_reference(&reference)
        .await
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Booking not found: {reference}")));
    }

    Ok(Json(state.payment_ledger.payments_for(&reference).await))
}
