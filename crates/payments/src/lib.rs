//! Payments for the booking ledger.
//!
//! - [`PaymentGateway`] abstracts the provider that creates payment intents,
//!   with an in-memory fake and a Stripe adapter
//! - [`PaymentService`] guards intent creation against duplicate charges and
//!   applies gateway callbacks to bookings exactly once

pub mod error;
pub mod gateway;
pub mod locks;
pub mod service;

pub use error::{GatewayError, PaymentError};
pub use gateway::{
    InMemoryPaymentGateway, IntentRequest, PaymentGateway, PaymentIntent, StripePaymentGateway,
};
pub use locks::ReferenceLocks;
pub use service::{PaymentCallback, PaymentConfig, PaymentService};
