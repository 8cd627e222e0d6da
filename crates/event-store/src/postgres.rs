use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventId, EventStoreError, Result, StoredEvent, Version,
    store::{EventStore, EventStream, ExpectedVersion, validate_append},
};

const SELECT_COLUMNS: &str = "SELECT position, event_id, stream_id, stream_type, event_type, \
     version, recorded_at, correlation_id, payload FROM ledger_events";

/// PostgreSQL-backed event store.
///
/// Stream versions are guarded twice: the transaction checks `MAX(version)`
/// against the caller's expectation, and the `unique_stream_version`
/// constraint rejects whichever of two racing transactions commits second.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_event(row: PgRow) -> Result<StoredEvent> {
        Ok(StoredEvent {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            stream_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("stream_id")?),
            stream_type: row.try_get("stream_type")?,
            event_type: row.try_get("event_type")?,
            version: Version::new(row.try_get("version")?),
            position: row.try_get("position")?,
            recorded_at: row.try_get("recorded_at")?,
            correlation_id: row.try_get("correlation_id")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        stream_id: AggregateId,
        expected: ExpectedVersion,
        events: Vec<StoredEvent>,
    ) -> Result<Version> {
        validate_append(stream_id, &events)?;

        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM ledger_events WHERE stream_id = $1")
                .bind(stream_id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        let actual = Version::new(current.unwrap_or(0));

        if !expected.matches(actual) || events[0].version != actual.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            });
        }

        let mut last_version = actual;
        for event in &events {
            sqlx::query(
                r#"
                INSERT INTO ledger_events
                    (event_id, stream_id, stream_type, event_type, version, recorded_at, correlation_id, payload)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(event.stream_id.as_uuid())
            .bind(&event.stream_type)
            .bind(&event.event_type)
            .bind(event.version.as_i64())
            .bind(event.recorded_at)
            .bind(event.correlation_id.as_deref())
            .bind(&event.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_stream_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        stream_id,
                        expected,
                        actual: event.version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            last_version = event.version;
        }

        tx.commit().await.map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_stream_version")
            {
                return EventStoreError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual,
                };
            }
            EventStoreError::Database(e)
        })?;

        metrics::counter!("event_store_events_appended_total", "backend" => "postgres")
            .increment(events.len() as u64);
        Ok(last_version)
    }

    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE stream_id = $1 ORDER BY version ASC"
        ))
        .bind(stream_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_version(&self, stream_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM ledger_events WHERE stream_id = $1")
                .bind(stream_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn read_all_after(&self, after: i64) -> Result<EventStream> {
        // Collected up front so the stream does not borrow the pool.
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE position > $1 ORDER BY position ASC"
        ))
        .bind(after)
        .fetch_all(&self.pool)
        .await?;

        let events: Vec<Result<StoredEvent>> = rows.into_iter().map(Self::row_to_event).collect();
        Ok(Box::pin(futures_util::stream::iter(events)))
    }
}
