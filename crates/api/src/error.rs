//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use payments::PaymentError;
use projections::ProjectionError;

/// Error returned by handlers.
///
/// Rendered as `{"error": message, "code": CODE}` with a status derived
/// from the code.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed input the domain never saw.
    BadRequest(String),
    /// A read model has no entry for the requested key.
    NotFound(String),
    /// The request clashes with existing data outside the ledger.
    Conflict(String),
    Domain(DomainError),
    Payment(PaymentError),
    Projection(ProjectionError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Domain(e) => e.code(),
            ApiError::Payment(e) => e.code(),
            ApiError::Projection(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                msg.clone()
            }
            ApiError::Domain(e) => e.to_string(),
            ApiError::Payment(e) => e.to_string(),
            ApiError::Projection(e) => e.to_string(),
        }
    }
}

/// HTTP status for an error code.
pub fn status_for(code: &str) -> StatusCode {
    match code {
        "NOT_FOUND" => StatusCode::NOT_FOUND,
        "BAD_REQUEST" | "INVALID_DATE_RANGE" | "INVALID_AMOUNT" => StatusCode::BAD_REQUEST,
        "ROOM_UNAVAILABLE"
        | "ALREADY_PAID"
        | "ALREADY_RECONCILED"
        | "INVALID_STATE_TRANSITION"
        | "CONFLICT" => StatusCode::CONFLICT,
        "PAYMENT_GATEWAY_ERROR" => StatusCode::BAD_GATEWAY,
        "REFERENCE_GENERATION_EXHAUSTED" => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = status_for(code);
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(%code, error = %message, "request failed");
        } else {
            tracing::debug!(%code, error = %message, "request rejected");
        }

        let body = serde_json::json!({ "error": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}
