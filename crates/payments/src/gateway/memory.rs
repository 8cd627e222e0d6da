use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use domain::GatewayKind;

use super::{IntentRequest, PaymentGateway, PaymentIntent};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    requests: Vec<IntentRequest>,
    next_id: u32,
    fail: bool,
    delay: Option<Duration>,
}

/// Deterministic gateway for tests and local runs.
///
/// Intent ids are sequential (`pi_0001`, `pi_0002`, ...).
#[derive(Debug, Clone)]
pub struct InMemoryPaymentGateway {
    kind: GatewayKind,
    state: Arc<Mutex<InMemoryGatewayState>>,
}

impl Default for InMemoryPaymentGateway {
    fn default() -> Self {
        Self {
            kind: GatewayKind::Stripe,
            state: Arc::default(),
        }
    }
}

impl InMemoryPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: GatewayKind) -> Self {
        self.kind = kind;
        self
    }

    /// Makes every following call fail with a transport error.
    pub fn set_fail(&self, fail: bool) {
        self.lock().fail = fail;
    }

    /// Delays every following call.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Requests that produced an intent, oldest first.
    pub fn requests(&self) -> Vec<IntentRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryGatewayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    fn kind(&self) -> GatewayKind {
        self.kind
    }

    async fn create_intent(&self, request: IntentRequest) -> Result<PaymentIntent, GatewayError> {
        let delay = self.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.fail {
            return Err(GatewayError::Transport(
                "simulated gateway outage".to_string(),
            ));
        }

        state.next_id += 1;
        let intent_id = format!("pi_{:04}", state.next_id);
        let client_secret = format!("{intent_id}_secret_{}", request.booking_reference);
        state.requests.push(request);

        Ok(PaymentIntent {
            intent_id,
            client_secret,
        })
    }
}
