//! PostgreSQL integration tests
//!
//! These tests start a shared PostgreSQL container and need Docker, so they
//! are ignored by default. Run with:
//!
//! ```bash
//! cargo test -p event-store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use event_store::{
    AggregateId, EventStore, EventStoreError, EventStoreExt, ExpectedVersion, PostgresEventStore,
    StoredEvent, Version,
};
use futures_util::StreamExt;
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_ledger_events.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Fresh store with its own pool and an empty ledger.
async fn get_test_store() -> PostgresEventStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE ledger_events RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresEventStore::new(pool)
}

fn room_event(stream_id: AggregateId, version: i64, event_type: &str) -> StoredEvent {
    StoredEvent::new(
        stream_id,
        "Room",
        Version::new(version),
        event_type,
        serde_json::json!({"test": true}),
    )
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn append_and_read_stream() {
    let store = get_test_store().await;
    let stream_id = AggregateId::new();

    let version = store
        .append(
            stream_id,
            ExpectedVersion::NoStream,
            vec![room_event(stream_id, 1, "RoomRegistered").with_correlation_id("BK7Q2M9XZA")],
        )
        .await
        .unwrap();
    assert_eq!(version, Version::first());

    let events = store.read_stream(stream_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "RoomRegistered");
    assert_eq!(events[0].correlation_id.as_deref(), Some("BK7Q2M9XZA"));
    assert!(events[0].position > 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn stale_expected_version_is_rejected() {
    let store = get_test_store().await;
    let stream_id = AggregateId::new();

    store
        .append(
            stream_id,
            ExpectedVersion::NoStream,
            vec![room_event(stream_id, 1, "RoomRegistered")],
        )
        .await
        .unwrap();
    store
        .append(
            stream_id,
            ExpectedVersion::Exact(Version::first()),
            vec![room_event(stream_id, 2, "StayClaimed")],
        )
        .await
        .unwrap();

    let result = store
        .append(
            stream_id,
            ExpectedVersion::Exact(Version::first()),
            vec![room_event(stream_id, 2, "StayClaimed")],
        )
        .await;

    assert!(matches!(
        result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    ));
    assert_eq!(store.read_stream(stream_id).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn racing_writers_commit_exactly_once() {
    let store = get_test_store().await;
    let stream_id = AggregateId::new();

    store
        .append(
            stream_id,
            ExpectedVersion::NoStream,
            vec![room_event(stream_id, 1, "RoomRegistered")],
        )
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .append(
                    stream_id,
                    ExpectedVersion::Exact(Version::first()),
                    vec![room_event(stream_id, 2, "StayClaimed")],
                )
                .await
        }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert!(e.is_conflict(), "unexpected error: {e}"),
        }
    }

    assert_eq!(committed, 1);
    assert_eq!(
        store.stream_version(stream_id).await.unwrap(),
        Some(Version::new(2))
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn read_all_after_orders_by_position() {
    let store = get_test_store().await;
    let room = AggregateId::new();
    let booking = AggregateId::new();

    store
        .append(
            room,
            ExpectedVersion::NoStream,
            vec![room_event(room, 1, "RoomRegistered")],
        )
        .await
        .unwrap();
    store
        .append(
            booking,
            ExpectedVersion::NoStream,
            vec![room_event(booking, 1, "BookingCreated")],
        )
        .await
        .unwrap();

    let all: Vec<_> = store.read_all().await.unwrap().collect().await;
    assert_eq!(all.len(), 2);
    let first_position = all[0].as_ref().unwrap().position;

    let tail: Vec<_> = store
        .read_all_after(first_position)
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].as_ref().unwrap().event_type, "BookingCreated");
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn stream_exists_extension() {
    let store = get_test_store().await;
    let stream_id = AggregateId::from_name("BK7Q2M9XZA");

    assert!(!store.stream_exists(stream_id).await.unwrap());
    store
        .append(
            stream_id,
            ExpectedVersion::NoStream,
            vec![room_event(stream_id, 1, "ReferenceIssued")],
        )
        .await
        .unwrap();
    assert!(store.stream_exists(stream_id).await.unwrap());
}
