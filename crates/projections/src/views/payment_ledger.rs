//! Payment ledger: the payment records of each booking, in the order received.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{BookingEvent, BookingReference, PaymentRecord};
use event_store::StoredEvent;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

#[derive(Default)]
struct LedgerState {
    records: HashMap<BookingReference, Vec<PaymentRecord>>,
    position: ProjectionPosition,
}

/// Append-only payment records per booking reference.
#[derive(Clone, Default)]
pub struct PaymentLedgerView {
    state: Arc<RwLock<LedgerState>>,
}

impl PaymentLedgerView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of one booking, oldest first. Empty if none were received.
    pub async fn payments_for(&self, reference: &BookingReference) -> Vec<PaymentRecord> {
        self.state
            .read()
            .await
            .records
            .get(reference)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of records across all bookings.
    pub async fn total_records(&self) -> usize {
        self.state.read().await.records.values().map(Vec::len).sum()
    }
}

impl ReadModel for PaymentLedgerView {
    fn name(&self) -> &'static str {
        "PaymentLedgerView"
    }

    fn count(&self) -> usize {
        self.state.try_read().map(|s| s.records.len()).unwrap_or(0)
    }
}

#[async_trait]
impl Projection for PaymentLedgerView {
    fn name(&self) -> &'static str {
        "PaymentLedgerView"
    }

    async fn handle(&self, event: &StoredEvent) -> Result<()> {
        let mut state = self.state.write().await;
        state.position = ProjectionPosition::at(event.position);

        if event.event_type != "PaymentReconciled" {
            return Ok(());
        }

        if let BookingEvent::PaymentReconciled(data) =
            serde_json::from_value::<BookingEvent>(event.payload.clone())?
        {
            state
                .records
                .entry(data.record.booking_reference.clone())
                .or_default()
                .push(data.record);
        }
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        *self.state.write().await = LedgerState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{AggregateId, Money, UserId};
    use domain::booking::PaymentReconciledData;
    use domain::{GatewayKind, PaymentOutcome};
    use event_store::Version;

    fn reconciled(reference: &str, success: bool, position: i64) -> StoredEvent {
        let record = PaymentRecord::from_outcome(
            GatewayKind::Stripe,
            PaymentOutcome {
                transaction_id: Some(format!("tx-{position}")),
                amount: Money::from_major(300),
                success,
                failure_reason: (!success).then(|| "card_declined".to_string()),
            },
            BookingReference::new(reference),
            UserId::new(),
            Utc::now(),
        );
        let event = BookingEvent::PaymentReconciled(PaymentReconciledData { record });
        let mut stored = StoredEvent::new(
            AggregateId::new(),
            "Booking",
            Version::new(2),
            "PaymentReconciled",
            serde_json::to_value(&event).unwrap(),
        );
        stored.position = position;
        stored
    }

    #[tokio::test]
    async fn records_are_grouped_by_reference() {
        let view = PaymentLedgerView::new();
        view.handle(&reconciled("AAAAAAAAAA", false, 1)).await.unwrap();
        view.handle(&reconciled("BBBBBBBBBB", true, 2)).await.unwrap();

        let a = view.payments_for(&BookingReference::new("AAAAAAAAAA")).await;
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].failure_reason.as_deref(), Some("card_declined"));
        assert_eq!(view.total_records().await, 2);
        assert_eq!(view.count(), 2);
    }

    #[tokio::test]
    async fn unknown_reference_has_no_records() {
        let view = PaymentLedgerView::new();
        assert!(
            view.payments_for(&BookingReference::new("ZZZZZZZZZZ"))
                .await
                .is_empty()
        );
    }

    #[tokio::test]
    async fn reset_clears_records() {
        let view = PaymentLedgerView::new();
        view.handle(&reconciled("AAAAAAAAAA", true, 1)).await.unwrap();
        view.reset().await.unwrap();

        assert_eq!(view.total_records().await, 0);
        assert_eq!(view.position().await, ProjectionPosition::zero());
    }
}
