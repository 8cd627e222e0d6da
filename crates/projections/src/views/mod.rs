//! Read model views.

pub mod bookings;
pub mod payment_ledger;

pub use bookings::{BookingSummary, BookingsView};
pub use payment_ledger::PaymentLedgerView;
