//! Payment intent creation and callback reconciliation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::Money;
use domain::{
    Aggregate, Booking, BookingError, BookingReference, BookingService, DomainError, Notification,
    PaymentOutcome, PaymentRecord, PaymentStatus,
};
use event_store::EventStore;
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, PaymentError, Result};
use crate::gateway::{IntentRequest, PaymentGateway, PaymentIntent};
use crate::locks::ReferenceLocks;

/// Payment settings.
#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Currency intents are created in.
    pub currency: String,

    /// Upper bound on a single gateway call.
    pub gateway_timeout: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            gateway_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome reported by the gateway for one booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub booking_reference: BookingReference,
    pub transaction_id: String,
    pub amount: Money,
    pub success: bool,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Creates payment intents and applies gateway callbacks to bookings.
pub struct PaymentService<S: EventStore> {
    bookings: Arc<BookingService<S>>,
    gateway: Arc<dyn PaymentGateway>,
    locks: ReferenceLocks,
    config: PaymentConfig,
}

impl<S: EventStore> PaymentService<S> {
    pub fn new(bookings: Arc<BookingService<S>>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            bookings,
            gateway,
            locks: ReferenceLocks::new(),
            config: PaymentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PaymentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PaymentConfig {
        &self.config
    }

    /// Asks the gateway for a payment intent for an unpaid booking.
    ///
    /// Fails with `AlreadyPaid` once the booking's payment has completed,
    /// whatever the amount, and with `AlreadyReconciled` if it failed.
    /// The booking itself is never modified.
    #[tracing::instrument(skip(self), fields(booking_reference = %reference, %amount))]
    pub async fn create_intent(
        &self,
        reference: &BookingReference,
        amount: Money,
    ) -> Result<PaymentIntent> {
        let _guard = self.locks.acquire(reference).await;

        let result = self.try_create_intent(reference, amount).await;
        let outcome = match &result {
            Ok(_) => "created",
            Err(PaymentError::Gateway(_)) => "gateway_error",
            Err(_) => "rejected",
        };
        metrics::counter!("payment_intents_total", "outcome" => outcome).increment(1);
        result
    }

    async fn try_create_intent(
        &self,
        reference: &BookingReference,
        amount: Money,
    ) -> Result<PaymentIntent> {
        let booking = self.resolve(reference).await?;
        match booking.payment_status() {
            PaymentStatus::Pending => {}
            PaymentStatus::Completed => {
                return Err(PaymentError::AlreadyPaid {
                    reference: reference.clone(),
                });
            }
            status @ PaymentStatus::Failed => {
                return Err(PaymentError::AlreadyReconciled {
                    reference: reference.clone(),
                    status,
                });
            }
        }
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount {
                amount: amount.to_string(),
            });
        }

        let request = IntentRequest {
            booking_reference: reference.clone(),
            amount,
            currency: self.config.currency.clone(),
        };

        let started = Instant::now();
        let call = tokio::time::timeout(
            self.config.gateway_timeout,
            self.gateway.create_intent(request),
        )
        .await;
        metrics::histogram!("payment_gateway_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let intent = match call {
            Ok(result) => result?,
            Err(_) => {
                return Err(GatewayError::Timeout {
                    after_ms: self.config.gateway_timeout.as_millis() as u64,
                }
                .into());
            }
        };

        tracing::info!(intent_id = %intent.intent_id, "payment intent created");
        Ok(intent)
    }

    /// Applies a gateway callback to its booking exactly once.
    ///
    /// The payment record and the new payment status are written together.
    /// A booking whose payment is already COMPLETED or FAILED is rejected
    /// with `AlreadyReconciled`. The guest is notified after the write.
    #[tracing::instrument(
        skip(self, callback),
        fields(
            booking_reference = %callback.booking_reference,
            transaction_id = %callback.transaction_id,
            success = callback.success,
        )
    )]
    pub async fn reconcile(&self, callback: PaymentCallback) -> Result<Booking> {
        let reference = callback.booking_reference.clone();
        let _guard = self.locks.acquire(&reference).await;

        let result = self.try_reconcile(callback).await;
        let outcome = match &result {
            Ok(booking) if booking.payment_status() == PaymentStatus::Completed => "completed",
            Ok(_) => "failed",
            Err(PaymentError::AlreadyReconciled { .. }) => "duplicate",
            Err(_) => "error",
        };
        metrics::counter!("payments_reconciled_total", "outcome" => outcome).increment(1);
        result
    }

    async fn try_reconcile(&self, callback: PaymentCallback) -> Result<Booking> {
        let reference = callback.booking_reference;
        let booking = self.resolve(&reference).await?;

        let status = booking.payment_status();
        if status.is_terminal() {
            return Err(PaymentError::AlreadyReconciled { reference, status });
        }

        let (Some(booking_id), Some(user_id)) = (booking.id(), booking.user_id()) else {
            return Err(PaymentError::NotFound { reference });
        };

        // A decline may report zero; nothing may report a negative amount.
        if callback.amount.is_negative() || (callback.success && callback.amount.is_zero()) {
            return Err(PaymentError::InvalidAmount {
                amount: callback.amount.to_string(),
            });
        }

        if callback.amount != booking.total_price() {
            tracing::warn!(
                expected = %booking.total_price(),
                reported = %callback.amount,
                "reconciled amount differs from booking total"
            );
        }

        let failure_reason = callback.failure_reason;
        let record = PaymentRecord::from_outcome(
            self.gateway.kind(),
            PaymentOutcome {
                transaction_id: Some(callback.transaction_id),
                amount: callback.amount,
                success: callback.success,
                failure_reason: failure_reason.clone(),
            },
            reference.clone(),
            user_id,
            self.bookings.clock().now(),
        );

        let booking = match self.bookings.record_payment(booking_id, record).await {
            Ok(booking) => booking,
            Err(DomainError::Booking(BookingError::AlreadyReconciled { status })) => {
                return Err(PaymentError::AlreadyReconciled { reference, status });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(payment_status = %booking.payment_status(), "payment reconciled");

        let Some(guest) = self.bookings.find_guest(user_id).await else {
            tracing::warn!(%user_id, "guest not found, skipping payment notification");
            return Ok(booking);
        };

        let channel = self.bookings.notification_channel();
        let notification = if callback.success {
            Notification::payment_successful(guest.email, reference, channel)
        } else {
            let reason = failure_reason.as_deref().unwrap_or("unknown");
            Notification::payment_failed(guest.email, reference, reason, channel)
        };
        self.bookings.notify(notification);

        Ok(booking)
    }

    /// Payment records of a booking, oldest first.
    pub async fn list_payments(&self, reference: &BookingReference) -> Result<Vec<PaymentRecord>> {
        let booking = self.resolve(reference).await?;
        Ok(booking.payments().to_vec())
    }

    async fn resolve(&self, reference: &BookingReference) -> Result<Booking> {
        self.bookings
            .find_booking_by_reference(reference)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    PaymentError::NotFound {
                        reference: reference.clone(),
                    }
                } else {
                    e.into()
                }
            })
    }
}
