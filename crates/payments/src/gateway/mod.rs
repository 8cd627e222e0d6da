//! Payment provider capability.

mod memory;
mod stripe;

pub use memory::InMemoryPaymentGateway;
pub use stripe::StripePaymentGateway;

use async_trait::async_trait;
use common::Money;
use domain::{BookingReference, GatewayKind};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// What the provider is asked to charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentRequest {
    pub booking_reference: BookingReference,
    pub amount: Money,
    /// ISO currency code, lower-case ("usd").
    pub currency: String,
}

/// A provider-side payment intent. The client secret goes to the payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub intent_id: String,
    pub client_secret: String,
}

/// Creates payment intents with a provider. Holds no local booking state.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Provider recorded on reconciled payments.
    fn kind(&self) -> GatewayKind;

    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError>;
}
