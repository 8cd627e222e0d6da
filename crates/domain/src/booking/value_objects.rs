//! Value objects recorded on a booking.

use chrono::{DateTime, Utc};
use common::{Money, UserId};
use serde::{Deserialize, Serialize};

use crate::reference::BookingReference;

use super::PaymentStatus;

/// Payment provider that processed a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayKind {
    Stripe,
    Paypal,
}

impl GatewayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayKind::Stripe => "STRIPE",
            GatewayKind::Paypal => "PAYPAL",
        }
    }
}

impl std::fmt::Display for GatewayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reconciled payment attempt. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub gateway: GatewayKind,

    /// Amount the gateway reported, which may differ from the booking total.
    pub amount: Money,

    /// Gateway transaction id. May be absent when the payment failed.
    pub transaction_id: Option<String>,

    /// Either `Completed` or `Failed`.
    pub status: PaymentStatus,

    /// Set only for failed payments.
    pub failure_reason: Option<String>,

    pub paid_at: DateTime<Utc>,
    pub booking_reference: BookingReference,

    /// Guest who owns the booking.
    pub user_id: UserId,
}

/// Reported outcome of a payment, as received from the gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub transaction_id: Option<String>,
    pub amount: Money,
    pub success: bool,
    pub failure_reason: Option<String>,
}

impl PaymentRecord {
    /// Builds the record for an outcome reported against a booking.
    ///
    /// The failure reason is dropped for successful payments.
    pub fn from_outcome(
        gateway: GatewayKind,
        outcome: PaymentOutcome,
        booking_reference: BookingReference,
        user_id: UserId,
        paid_at: DateTime<Utc>,
    ) -> Self {
        let status = PaymentStatus::from_outcome(outcome.success);
        Self {
            gateway,
            amount: outcome.amount,
            transaction_id: outcome.transaction_id,
            status,
            failure_reason: if outcome.success {
                None
            } else {
                outcome.failure_reason
            },
            paid_at,
            booking_reference,
            user_id,
        }
    }
}
