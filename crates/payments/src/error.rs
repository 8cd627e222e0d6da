//! Payment error types.

use domain::{BookingReference, DomainError, PaymentStatus};
use thiserror::Error;

/// Failures talking to a payment provider.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("payment gateway did not answer within {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("payment gateway unreachable: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("payment gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("payment gateway returned an unexpected response: {0}")]
    MalformedResponse(String),
}

/// Errors returned by intent creation and reconciliation.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Booking not found: {reference}")]
    NotFound { reference: BookingReference },

    /// Duplicate-charge guard.
    #[error("Booking {reference} has already been paid")]
    AlreadyPaid { reference: BookingReference },

    #[error("Payment for booking {reference} already reconciled with status {status}")]
    AlreadyReconciled {
        reference: BookingReference,
        status: PaymentStatus,
    },

    #[error("Invalid payment amount: {amount}")]
    InvalidAmount { amount: String },

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl PaymentError {
    /// Stable error code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::NotFound { .. } => "NOT_FOUND",
            PaymentError::AlreadyPaid { .. } => "ALREADY_PAID",
            PaymentError::AlreadyReconciled { .. } => "ALREADY_RECONCILED",
            PaymentError::InvalidAmount { .. } => "INVALID_AMOUNT",
            PaymentError::Gateway(_) => "PAYMENT_GATEWAY_ERROR",
            PaymentError::Domain(e) => e.code(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
