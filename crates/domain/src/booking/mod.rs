//! Booking aggregate and related types.

mod aggregate;
mod events;
mod state;
mod value_objects;

pub use aggregate::{Booking, NewBooking};
pub use events::{BookingCreatedData, BookingEvent, PaymentReconciledData, StatusChangedData};
pub use state::{BookingStatus, PaymentStatus};
pub use value_objects::{GatewayKind, PaymentOutcome, PaymentRecord};

use thiserror::Error;

/// Errors that can occur during booking operations.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Booking already created")]
    AlreadyCreated,

    #[error("Booking does not exist")]
    NotCreated,

    /// The payment has already been resolved.
    #[error("Payment already reconciled with status {status}")]
    AlreadyReconciled { status: PaymentStatus },

    #[error("Invalid state transition: booking status cannot move from {from} to {to}")]
    InvalidBookingTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Invalid state transition: payment status cannot move from {from} to {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}

impl BookingError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(
            self,
            BookingError::InvalidBookingTransition { .. }
                | BookingError::InvalidPaymentTransition { .. }
        )
    }
}
