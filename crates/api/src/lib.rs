//! HTTP API for the hotel booking ledger.
//!
//! Exposes rooms, bookings, payment intents and payment callbacks over JSON,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use event_store::EventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::ApiError;
pub use state::{AppState, Ports, create_state, gateway_from_config};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EventStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    // GET resolves the segment as a booking reference, PATCH as a booking id.
    Router::new()
        .route("/health", get(routes::health::check))
        .route("/guests", post(routes::guests::register::<S>))
        .route("/rooms", post(routes::rooms::register::<S>))
        .route("/rooms/{id}/rate", put(routes::rooms::change_rate::<S>))
        .route(
            "/rooms/{id}/availability",
            get(routes::rooms::availability::<S>),
        )
        .route(
            "/bookings",
            post(routes::bookings::create::<S>).get(routes::bookings::list::<S>),
        )
        .route(
            "/bookings/{key}",
            get(routes::bookings::get::<S>).patch(routes::bookings::update::<S>),
        )
        .route(
            "/bookings/{key}/payments",
            get(routes::bookings::payments::<S>),
        )
        .route("/payments/intents", post(routes::payments::create_intent::<S>))
        .route("/payments/callbacks", post(routes::payments::callback::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
