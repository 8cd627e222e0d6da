//! Read models over the booking ledger.
//!
//! - [`Projection`] trait for folding stored events into a view
//! - [`ProjectionProcessor`] feeding events to projections by store position
//! - [`BookingsView`]: every booking, newest first, addressable by reference
//! - [`PaymentLedgerView`]: the append-only payment records of each booking

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{BookingSummary, BookingsView, PaymentLedgerView};
