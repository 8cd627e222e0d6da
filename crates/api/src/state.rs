//! Shared application state.

use std::sync::Arc;

use domain::{
    BookingService, Clock, InMemoryNotificationSink, InMemoryUserDirectory, NotificationSink,
    RandomReferenceGenerator, SystemClock,
};
use event_store::EventStore;
use payments::{InMemoryPaymentGateway, PaymentGateway, PaymentService, StripePaymentGateway};
use projections::{BookingsView, PaymentLedgerView, ProjectionProcessor};

use crate::config::Config;

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppState<S: EventStore> {
    pub bookings: Arc<BookingService<S>>,
    pub payments: PaymentService<S>,
    pub directory: InMemoryUserDirectory,
    pub processor: ProjectionProcessor<S>,
    pub bookings_view: BookingsView,
    pub payment_ledger: PaymentLedgerView,
}

/// Outside collaborators the ledger is wired to.
pub struct Ports {
    pub directory: InMemoryUserDirectory,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifications: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
}

impl Ports {
    /// In-memory collaborators throughout, on the system clock.
    pub fn in_memory() -> Self {
        Self {
            directory: InMemoryUserDirectory::new(),
            gateway: Arc::new(InMemoryPaymentGateway::new()),
            notifications: Arc::new(InMemoryNotificationSink::new()),
            clock: Arc::new(SystemClock),
        }
    }
}

/// Stripe when a secret key is configured, the in-memory gateway otherwise.
pub fn gateway_from_config(config: &Config) -> Arc<dyn PaymentGateway> {
    match &config.stripe_secret_key {
        Some(key) => {
            tracing::info!(api_base = %config.stripe_api_base, "using Stripe payment gateway");
            Arc::new(StripePaymentGateway::new(key.clone()).with_api_base(&config.stripe_api_base))
        }
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, using in-memory payment gateway");
            Arc::new(InMemoryPaymentGateway::new())
        }
    }
}

/// Builds the services and read models over one event store.
pub fn create_state<S: EventStore + Clone + 'static>(
    store: S,
    config: &Config,
    ports: Ports,
) -> Arc<AppState<S>> {
    let bookings = Arc::new(
        BookingService::new(
            store.clone(),
            Arc::new(ports.directory.clone()),
            ports.notifications,
        )
        .with_clock(ports.clock)
        .with_reference_generator(Arc::new(RandomReferenceGenerator::new(
            config.reference_length,
        )))
        .with_config(config.booking_config()),
    );

    let payments =
        PaymentService::new(bookings.clone(), ports.gateway).with_config(config.payment_config());

    let bookings_view = BookingsView::new();
    let payment_ledger = PaymentLedgerView::new();
    let mut processor = ProjectionProcessor::new(store);
    processor.register(Arc::new(bookings_view.clone()));
    processor.register(Arc::new(payment_ledger.clone()));

    Arc::new(AppState {
        bookings,
        payments,
        directory: ports.directory,
        processor,
        bookings_view,
        payment_ledger,
    })
}
