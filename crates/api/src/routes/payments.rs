//! Payment intent and gateway callback endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::Money;
use domain::BookingReference;
use event_store::EventStore;
use payments::{PaymentCallback, PaymentIntent};
use serde::Deserialize;

use super::bookings::BookingResponse;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateIntentRequest {
    pub booking_reference: BookingReference,
    pub amount: Money,
}

/// POST /payments/intents
#[tracing::instrument(skip(state, req), fields(booking_reference = %req.booking_reference))]
pub async fn create_intent<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<PaymentIntent>), ApiError> {
    let intent = state
        .payments
        .create_intent(&req.booking_reference, req.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(intent)))
}

/// POST /payments/callbacks
///
/// A repeated callback for an already reconciled booking is answered with
/// 409 and changes nothing.
#[tracing::instrument(
    skip(state, callback),
    fields(booking_reference = %callback.booking_reference, success = callback.success)
)]
pub async fn callback<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(callback): Json<PaymentCallback>,
) -> Result<Json<BookingResponse>, ApiError> {
    if callback.transaction_id.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "transaction_id must not be empty".to_string(),
        ));
    }

    let booking = state.payments.reconcile(callback).await?;
    Ok(Json(BookingResponse::from(&booking)))
}
