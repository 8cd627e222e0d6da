use async_trait::async_trait;
use domain::GatewayKind;
use serde::Deserialize;

use super::{IntentRequest, PaymentGateway, PaymentIntent};
use crate::error::GatewayError;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe PaymentIntents adapter.
#[derive(Debug, Clone)]
pub struct StripePaymentGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    client_secret: Option<String>,
}

impl StripePaymentGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            secret_key: secret_key.into(),
        }
    }

    /// Points the adapter at another API host (a proxy or a local mock).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Stripe
    }

    #[tracing::instrument(skip(self, request), fields(booking_reference = %request.booking_reference))]
    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let form = [
            ("amount", request.amount.minor_units().to_string()),
            ("currency", request.currency.clone()),
            (
                "metadata[bookingReference]",
                request.booking_reference.to_string(),
            ),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "stripe rejected payment intent");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        let intent: StripeIntent = serde_json::from_str(&body)
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            GatewayError::MalformedResponse("payment intent has no client_secret".to_string())
        })?;

        Ok(PaymentIntent {
            intent_id: intent.id,
            client_secret,
        })
    }
}
