//! Integration tests for payment intents and reconciliation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Form, Json, Router};
use chrono::NaiveDate;
use common::Money;
use domain::{
    BookingReference, BookingService, CreateBooking, FixedClock, GatewayKind,
    InMemoryNotificationSink, InMemoryUserDirectory, Notification, PaymentStatus, RegisterRoom,
    RoomDetails,
};
use event_store::InMemoryEventStore;
use payments::{
    GatewayError, InMemoryPaymentGateway, PaymentCallback, PaymentConfig, PaymentError,
    PaymentService, StripePaymentGateway,
};

struct Fixture {
    payments: Arc<PaymentService<InMemoryEventStore>>,
    bookings: Arc<BookingService<InMemoryEventStore>>,
    gateway: InMemoryPaymentGateway,
    sink: InMemoryNotificationSink,
    store: InMemoryEventStore,
    reference: BookingReference,
    room_id: common::RoomId,
}

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, d).unwrap()
}

/// A PENDING booking for 2024-06-01 to 2024-06-04 at 100.00 a night.
async fn fixture_with(gateway: InMemoryPaymentGateway, config: PaymentConfig) -> Fixture {
    let store = InMemoryEventStore::new();
    let directory = InMemoryUserDirectory::new();
    let guest = directory.register("Ada", "ada@example.com", None).await;
    let sink = InMemoryNotificationSink::new();

    let bookings = Arc::new(
        BookingService::new(store.clone(), Arc::new(directory), Arc::new(sink.clone()))
            .with_clock(Arc::new(FixedClock::at_date(date(5, 1)))),
    );

    let room_id = bookings
        .register_room(RegisterRoom::new(
            RoomDetails::new("101", "DELUXE", 2),
            Money::from_major(100),
        ))
        .await
        .unwrap()
        .room_id()
        .unwrap();

    let booking = bookings
        .create_booking(CreateBooking::new(guest.id, room_id, date(6, 1), date(6, 4)))
        .await
        .unwrap();

    let payments = Arc::new(
        PaymentService::new(bookings.clone(), Arc::new(gateway.clone())).with_config(config),
    );

    Fixture {
        payments,
        bookings,
        gateway,
        sink,
        store,
        reference: booking.reference().unwrap().clone(),
        room_id,
    }
}

async fn fixture() -> Fixture {
    fixture_with(InMemoryPaymentGateway::new(), PaymentConfig::default()).await
}

fn callback(reference: &BookingReference, tx: &str, success: bool) -> PaymentCallback {
    PaymentCallback {
        booking_reference: reference.clone(),
        transaction_id: tx.to_string(),
        amount: Money::from_major(300),
        success,
        failure_reason: (!success).then(|| "card_declined".to_string()),
    }
}

fn payment_notifications(f: &Fixture) -> Vec<Notification> {
    f.sink
        .sent_for(&f.reference)
        .into_iter()
        .filter(|n| n.subject != Notification::BOOKING_CONFIRMATION)
        .collect()
}

mod reconciliation {
    use super::*;

    #[tokio::test]
    async fn successful_payment_completes_once() {
        let f = fixture().await;

        let booking = f
            .payments
            .reconcile(callback(&f.reference, "t1", true))
            .await
            .unwrap();

        assert_eq!(booking.payment_status(), PaymentStatus::Completed);
        assert_eq!(booking.payments().len(), 1);
        let record = &booking.payments()[0];
        assert_eq!(record.status, PaymentStatus::Completed);
        assert_eq!(record.transaction_id.as_deref(), Some("t1"));
        assert_eq!(record.amount.to_string(), "300.00");
        assert_eq!(record.gateway, GatewayKind::Stripe);

        let sent = payment_notifications(&f);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, Notification::PAYMENT_SUCCESSFUL);
        assert!(sent[0].body.contains(f.reference.as_str()));

        let second = f
            .payments
            .reconcile(callback(&f.reference, "t2", true))
            .await
            .unwrap_err();
        assert!(matches!(second, PaymentError::AlreadyReconciled { .. }));
        assert_eq!(second.code(), "ALREADY_RECONCILED");

        let payments = f.payments.list_payments(&f.reference).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payment_notifications(&f).len(), 1);
        assert_eq!(f.store.count_of_type("PaymentReconciled").await, 1);
    }

    #[tokio::test]
    async fn declined_payment_fails_and_frees_the_room() {
        let f = fixture().await;

        let booking = f
            .payments
            .reconcile(callback(&f.reference, "t1", false))
            .await
            .unwrap();

        assert_eq!(booking.payment_status(), PaymentStatus::Failed);
        let record = &booking.payments()[0];
        assert_eq!(record.status, PaymentStatus::Failed);
        assert_eq!(record.failure_reason.as_deref(), Some("card_declined"));

        let sent = payment_notifications(&f);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, Notification::PAYMENT_FAILED);
        assert!(sent[0].body.contains("card_declined"));

        assert!(
            f.bookings
                .is_room_available(f.room_id, date(6, 1), date(6, 4))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn failed_booking_cannot_get_a_new_intent() {
        let f = fixture().await;
        f.payments
            .reconcile(callback(&f.reference, "t1", false))
            .await
            .unwrap();

        let err = f
            .payments
            .create_intent(&f.reference, Money::from_major(300))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::AlreadyReconciled {
                status: PaymentStatus::Failed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn mismatched_amount_is_still_applied() {
        let f = fixture().await;
        let mut cb = callback(&f.reference, "t1", true);
        cb.amount = Money::from_major(250);

        let booking = f.payments.reconcile(cb).await.unwrap();

        assert_eq!(booking.payment_status(), PaymentStatus::Completed);
        assert_eq!(booking.payments()[0].amount.to_string(), "250.00");
    }

    #[tokio::test]
    async fn negative_success_amount_is_rejected() {
        let f = fixture().await;
        let mut cb = callback(&f.reference, "t1", true);
        cb.amount = Money::from_major(-300);

        let err = f.payments.reconcile(cb).await.unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount { .. }));
        assert_eq!(err.code(), "INVALID_AMOUNT");

        let booking = f
            .bookings
            .find_booking_by_reference(&f.reference)
            .await
            .unwrap();
        assert_eq!(booking.payment_status(), PaymentStatus::Pending);
        assert!(booking.payments().is_empty());
    }

    #[tokio::test]
    async fn zero_success_amount_is_rejected_but_zero_decline_applies() {
        let f = fixture().await;
        let mut cb = callback(&f.reference, "t1", true);
        cb.amount = Money::zero();
        let err = f.payments.reconcile(cb).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");

        let mut declined = callback(&f.reference, "t2", false);
        declined.amount = Money::zero();
        let booking = f.payments.reconcile(declined).await.unwrap();
        assert_eq!(booking.payment_status(), PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn numeric_amount_in_callback_json_is_accepted() {
        let f = fixture().await;
        let body = format!(
            r#"{{"booking_reference":"{}","transaction_id":"t1","amount":300.00,"success":true}}"#,
            f.reference
        );
        let cb: PaymentCallback = serde_json::from_str(&body).unwrap();
        assert_eq!(cb.amount, Money::from_major(300));

        let booking = f.payments.reconcile(cb).await.unwrap();
        assert_eq!(booking.payment_status(), PaymentStatus::Completed);
        assert_eq!(booking.payments()[0].amount.to_string(), "300.00");
    }

    #[tokio::test]
    async fn paypal_gateway_is_recorded() {
        let f = fixture_with(
            InMemoryPaymentGateway::new().with_kind(GatewayKind::Paypal),
            PaymentConfig::default(),
        )
        .await;

        let booking = f
            .payments
            .reconcile(callback(&f.reference, "t1", true))
            .await
            .unwrap();
        assert_eq!(booking.payments()[0].gateway, GatewayKind::Paypal);
    }

    #[tokio::test]
    async fn unknown_reference_is_not_found() {
        let f = fixture().await;
        let err = f
            .payments
            .reconcile(callback(&BookingReference::new("ZZZZZZZZZZ"), "t1", true))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callbacks_reconcile_once() {
        let f = fixture().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let payments = f.payments.clone();
            let cb = callback(&f.reference, &format!("t{i}"), i % 2 == 0);
            handles.push(tokio::spawn(async move { payments.reconcile(cb).await }));
        }

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => applied += 1,
                Err(PaymentError::AlreadyReconciled { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(applied, 1);
        assert_eq!(f.store.count_of_type("PaymentReconciled").await, 1);
        assert_eq!(payment_notifications(&f).len(), 1);
    }
}

mod intents {
    use super::*;

    #[tokio::test]
    async fn pending_booking_gets_an_intent() {
        let f = fixture().await;

        let intent = f
            .payments
            .create_intent(&f.reference, Money::from_major(300))
            .await
            .unwrap();

        assert_eq!(intent.intent_id, "pi_0001");
        let requests = f.gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].currency, "usd");
        assert_eq!(requests[0].amount.minor_units(), 30_000);

        let booking = f
            .bookings
            .find_booking_by_reference(&f.reference)
            .await
            .unwrap();
        assert_eq!(booking.payment_status(), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn paid_booking_is_rejected_for_any_amount() {
        let f = fixture().await;
        f.payments
            .reconcile(callback(&f.reference, "t1", true))
            .await
            .unwrap();

        for amount in [Money::from_major(300), Money::from_major(1), Money::zero()] {
            let err = f
                .payments
                .create_intent(&f.reference, amount)
                .await
                .unwrap_err();
            assert!(matches!(err, PaymentError::AlreadyPaid { .. }));
            assert_eq!(err.code(), "ALREADY_PAID");
        }
        assert!(f.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn gateway_outage_leaves_booking_unchanged() {
        let f = fixture().await;
        f.gateway.set_fail(true);
        let events = f.store.event_count().await;

        let err = f
            .payments
            .create_intent(&f.reference, Money::from_major(300))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Gateway(GatewayError::Transport(_))));
        assert_eq!(f.store.event_count().await, events);
    }

    #[tokio::test]
    async fn slow_gateway_times_out() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_delay(Some(Duration::from_millis(500)));
        let f = fixture_with(
            gateway,
            PaymentConfig {
                gateway_timeout: Duration::from_millis(20),
                ..PaymentConfig::default()
            },
        )
        .await;

        let err = f
            .payments
            .create_intent(&f.reference, Money::from_major(300))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaymentError::Gateway(GatewayError::Timeout { after_ms: 20 })
        ));
        assert_eq!(err.code(), "PAYMENT_GATEWAY_ERROR");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_intents_after_completion_are_refused() {
        let f = fixture().await;
        f.payments
            .reconcile(callback(&f.reference, "t1", true))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let payments = f.payments.clone();
            let reference = f.reference.clone();
            handles.push(tokio::spawn(async move {
                payments
                    .create_intent(&reference, Money::from_major(300))
                    .await
            }));
        }
        for handle in handles {
            assert!(matches!(
                handle.await.unwrap(),
                Err(PaymentError::AlreadyPaid { .. })
            ));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_intent_never_succeeds_after_completion() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_delay(Some(Duration::from_millis(5)));
        let f = fixture_with(gateway, PaymentConfig::default()).await;

        let intent = {
            let payments = f.payments.clone();
            let reference = f.reference.clone();
            tokio::spawn(async move {
                payments
                    .create_intent(&reference, Money::from_major(300))
                    .await
            })
        };
        let reconcile = {
            let payments = f.payments.clone();
            let cb = callback(&f.reference, "t1", true);
            tokio::spawn(async move { payments.reconcile(cb).await })
        };

        let intent = intent.await.unwrap();
        reconcile.await.unwrap().unwrap();

        // Either the intent was issued before the payment landed, or it was
        // refused because the payment had already completed.
        match intent {
            Ok(_) => assert_eq!(f.gateway.requests().len(), 1),
            Err(e) => {
                assert!(matches!(e, PaymentError::AlreadyPaid { .. }));
                assert!(f.gateway.requests().is_empty());
            }
        }
    }
}

mod stripe {
    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<std::sync::Mutex<Vec<(Option<String>, HashMap<String, String>)>>>);

    async fn create_intent(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Form(form): Form<HashMap<String, String>>,
    ) -> (StatusCode, Json<serde_json::Value>) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        captured.0.lock().unwrap().push((auth, form));
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": "pi_3Mock",
                "object": "payment_intent",
                "client_secret": "pi_3Mock_secret_abc",
            })),
        )
    }

    async fn declined() -> (StatusCode, Json<serde_json::Value>) {
        (
            StatusCode::PAYMENT_REQUIRED,
            Json(serde_json::json!({"error": {"code": "card_declined"}})),
        )
    }

    async fn garbage() -> &'static str {
        "not json"
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn posts_form_encoded_intent() {
        let captured = Captured::default();
        let base = serve(
            Router::new()
                .route("/v1/payment_intents", post(create_intent))
                .with_state(captured.clone()),
        )
        .await;

        let store = InMemoryEventStore::new();
        let directory = InMemoryUserDirectory::new();
        let guest = directory.register("Ada", "ada@example.com", None).await;
        let bookings = Arc::new(
            BookingService::new(
                store,
                Arc::new(directory),
                Arc::new(InMemoryNotificationSink::new()),
            )
            .with_clock(Arc::new(FixedClock::at_date(date(5, 1)))),
        );
        let room_id = bookings
            .register_room(RegisterRoom::new(
                RoomDetails::new("101", "DELUXE", 2),
                Money::from_major(100),
            ))
            .await
            .unwrap()
            .room_id()
            .unwrap();
        let booking = bookings
            .create_booking(CreateBooking::new(guest.id, room_id, date(6, 1), date(6, 4)))
            .await
            .unwrap();
        let reference = booking.reference().unwrap().clone();

        let gateway = StripePaymentGateway::new("sk_test_123").with_api_base(&base);
        let payments = PaymentService::new(bookings, Arc::new(gateway));

        let intent = payments
            .create_intent(&reference, "300.00".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(intent.intent_id, "pi_3Mock");
        assert_eq!(intent.client_secret, "pi_3Mock_secret_abc");

        let calls = captured.0.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        let (auth, form) = &calls[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk_test_123"));
        assert_eq!(form.get("amount").map(String::as_str), Some("30000"));
        assert_eq!(form.get("currency").map(String::as_str), Some("usd"));
        assert_eq!(
            form.get("metadata[bookingReference]").map(String::as_str),
            Some(reference.as_str())
        );
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let base = serve(Router::new().route("/v1/payment_intents", post(declined))).await;
        let gateway = StripePaymentGateway::new("sk_test_123").with_api_base(base);

        let result = payments::PaymentGateway::create_intent(
            &gateway,
            payments::IntentRequest {
                booking_reference: "BK7Q2M9XZA".into(),
                amount: Money::from_major(10),
                currency: "usd".to_string(),
            },
        )
        .await;

        match result {
            Err(GatewayError::Rejected { status, message }) => {
                assert_eq!(status, 402);
                assert!(message.contains("card_declined"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparsable_body_is_malformed() {
        let base = serve(Router::new().route("/v1/payment_intents", post(garbage))).await;
        let gateway = StripePaymentGateway::new("sk_test_123").with_api_base(base);

        let result = payments::PaymentGateway::create_intent(
            &gateway,
            payments::IntentRequest {
                booking_reference: "BK7Q2M9XZA".into(),
                amount: Money::from_major(10),
                currency: "usd".to_string(),
            },
        )
        .await;

        assert!(matches!(result, Err(GatewayError::MalformedResponse(_))));
    }
}
