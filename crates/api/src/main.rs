//! API server entry point.

use std::sync::Arc;
use std::time::Duration;

use api::{Config, Ports, create_app, create_state, gateway_from_config};
use domain::{Channel, InMemoryUserDirectory, SystemClock};
use event_store::{EventStore, InMemoryEventStore, PostgresEventStore};
use metrics_exporter_prometheus::PrometheusHandle;
use notifications::{LogSender, NotificationQueue, NotificationWorker};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    api::telemetry::init_tracing(&config);
    let metrics_handle = api::telemetry::init_metrics()?;

    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresEventStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL event store");
            serve(store, &config, metrics_handle).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, events are kept in memory");
            serve(InMemoryEventStore::new(), &config, metrics_handle).await
        }
    }
}

async fn serve<S: EventStore + Clone + 'static>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    let (queue, rx) = NotificationQueue::channel();
    let worker = [Channel::Email, Channel::Sms, Channel::Whatsapp]
        .into_iter()
        .fold(NotificationWorker::new(rx), |worker, channel| {
            worker.with_sender(channel, Arc::new(LogSender))
        })
        .spawn();

    let ports = Ports {
        directory: InMemoryUserDirectory::new(),
        gateway: gateway_from_config(config),
        notifications: Arc::new(queue),
        clock: Arc::new(SystemClock),
    };
    let state = create_state(store, config, ports);

    // Replay anything already in the store before taking traffic.
    let replayed = state.processor.run_catch_up().await?;
    tracing::info!(replayed, "projections caught up");

    let app = create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The queue closed with the app; let the worker drain what is left.
    if tokio::time::timeout(Duration::from_secs(5), worker).await.is_err() {
        tracing::warn!("notification worker did not drain in time");
    }
    tracing::info!("server shut down gracefully");
    Ok(())
}
