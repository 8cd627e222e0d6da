//! Guest registration.
//!
//! The directory is in-memory; authentication stays outside this service.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::Guest;
use event_store::EventStore;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterGuestRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// POST /guests
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn register<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterGuestRequest>,
) -> Result<(StatusCode, Json<Guest>), ApiError> {
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest(format!("Invalid email: {email}")));
    }

    if state.directory.find_by_email(email).await.is_some() {
        return Err(ApiError::Conflict(format!(
            "A guest with email {email} already exists"
        )));
    }

    let phone_number = req
        .phone_number
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let guest = state.directory.register(name, email, phone_number).await;
    tracing::info!(user_id = %guest.id, "guest registered");

    Ok((StatusCode::CREATED, Json(guest)))
}
