use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventStoreError, Result, StoredEvent, Version,
    store::{EventStore, EventStream, ExpectedVersion, validate_append},
};

#[derive(Default)]
struct Inner {
    streams: HashMap<AggregateId, Vec<StoredEvent>>,
    log: Vec<StoredEvent>,
}

impl Inner {
    fn version_of(&self, stream_id: AggregateId) -> Version {
        self.streams
            .get(&stream_id)
            .and_then(|events| events.last())
            .map(|e| e.version)
            .unwrap_or(Version::initial())
    }
}

/// In-memory event store.
///
/// The default store for tests and for running the service without a
/// database. Appends take a single write lock, so the version check and the
/// insert are one serializable step, the same guarantee the Postgres store
/// gets from its unique `(stream_id, version)` constraint.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }

    /// Returns the number of events of the given type.
    pub async fn count_of_type(&self, event_type: &str) -> usize {
        self.inner
            .read()
            .await
            .log
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        stream_id: AggregateId,
        expected: ExpectedVersion,
        mut events: Vec<StoredEvent>,
    ) -> Result<Version> {
        validate_append(stream_id, &events)?;

        let mut inner = self.inner.write().await;
        let actual = inner.version_of(stream_id);

        if !expected.matches(actual) {
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            });
        }

        // With `Any` the batch may still have been built from a stale read.
        if events[0].version != actual.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                stream_id,
                expected,
                actual,
            });
        }

        let mut position = inner.log.len() as i64;
        for event in &mut events {
            position += 1;
            event.position = position;
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(Version::initial());

        metrics::counter!("event_store_events_appended_total", "backend" => "memory")
            .increment(events.len() as u64);
        inner.log.extend(events.iter().cloned());
        inner.streams.entry(stream_id).or_default().extend(events);

        Ok(last_version)
    }

    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>> {
        let inner = self.inner.read().await;
        Ok(inner.streams.get(&stream_id).cloned().unwrap_or_default())
    }

    async fn stream_version(&self, stream_id: AggregateId) -> Result<Option<Version>> {
        let inner = self.inner.read().await;
        let version = inner.version_of(stream_id);
        Ok((version != Version::initial()).then_some(version))
    }

    async fn read_all_after(&self, after: i64) -> Result<EventStream> {
        use futures_util::stream;

        let inner = self.inner.read().await;
        let start = usize::try_from(after.max(0)).unwrap_or(usize::MAX);
        let events: Vec<StoredEvent> = inner.log.iter().skip(start).cloned().collect();

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventStoreExt;

    fn test_event(stream_id: AggregateId, version: i64, event_type: &str) -> StoredEvent {
        StoredEvent::new(
            stream_id,
            "Room",
            Version::new(version),
            event_type,
            serde_json::json!({"test": true}),
        )
    }

    #[tokio::test]
    async fn append_to_new_stream() {
        let store = InMemoryEventStore::new();
        let stream_id = AggregateId::new();

        let version = store
            .append(
                stream_id,
                ExpectedVersion::NoStream,
                vec![test_event(stream_id, 1, "RoomRegistered")],
            )
            .await
            .unwrap();

        assert_eq!(version, Version::first());
        let events = store.read_stream(stream_id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].position, 1);
    }

    #[tokio::test]
    async fn append_batch_returns_last_version() {
        let store = InMemoryEventStore::new();
        let stream_id = AggregateId::new();

        let events = vec![
            test_event(stream_id, 1, "RoomRegistered"),
            test_event(stream_id, 2, "StayClaimed"),
            test_event(stream_id, 3, "StayClaimed"),
        ];
        let version = store
            .append(stream_id, ExpectedVersion::NoStream, events)
            .await
            .unwrap();

        assert_eq!(version, Version::new(3));
        assert_eq!(store.event_count().await, 3);
        assert_eq!(store.count_of_type("StayClaimed").await, 2);
    }

    #[tokio::test]
    async fn stale_writer_gets_conflict() {
        let store = InMemoryEventStore::new();
        let stream_id = AggregateId::new();

        store
            .append(
                stream_id,
                ExpectedVersion::NoStream,
                vec![test_event(stream_id, 1, "RoomRegistered")],
            )
            .await
            .unwrap();

        // Two writers both read version 1.
        store
            .append(
                stream_id,
                ExpectedVersion::Exact(Version::first()),
                vec![test_event(stream_id, 2, "StayClaimed")],
            )
            .await
            .unwrap();

        let result = store
            .append(
                stream_id,
                ExpectedVersion::Exact(Version::first()),
                vec![test_event(stream_id, 2, "StayClaimed")],
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { actual, .. }) if actual == Version::new(2)
        ));
        assert_eq!(store.event_count().await, 2);
    }

    #[tokio::test]
    async fn no_stream_expectation_acts_as_uniqueness_check() {
        let store = InMemoryEventStore::new();
        let stream_id = AggregateId::from_name("BK7Q2M9XZA");

        store
            .append(
                stream_id,
                ExpectedVersion::NoStream,
                vec![test_event(stream_id, 1, "ReferenceIssued")],
            )
            .await
            .unwrap();

        let again = store
            .append(
                stream_id,
                ExpectedVersion::NoStream,
                vec![test_event(stream_id, 1, "ReferenceIssued")],
            )
            .await;

        assert!(again.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn any_expectation_still_rejects_stale_versions() {
        let store = InMemoryEventStore::new();
        let stream_id = AggregateId::new();

        store
            .append(
                stream_id,
                ExpectedVersion::Any,
                vec![test_event(stream_id, 1, "RoomRegistered")],
            )
            .await
            .unwrap();

        let result = store
            .append(
                stream_id,
                ExpectedVersion::Any,
                vec![test_event(stream_id, 1, "RoomRegistered")],
            )
            .await;

        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn stream_version_tracks_appends() {
        let store = InMemoryEventStore::new();
        let stream_id = AggregateId::new();

        assert!(store.stream_version(stream_id).await.unwrap().is_none());
        assert!(!store.stream_exists(stream_id).await.unwrap());

        store
            .append(
                stream_id,
                ExpectedVersion::NoStream,
                vec![
                    test_event(stream_id, 1, "RoomRegistered"),
                    test_event(stream_id, 2, "StayClaimed"),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            store.stream_version(stream_id).await.unwrap(),
            Some(Version::new(2))
        );
        assert!(store.stream_exists(stream_id).await.unwrap());
    }

    #[tokio::test]
    async fn read_all_after_skips_seen_positions() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();
        let room = AggregateId::new();
        let booking = AggregateId::new();

        store
            .append(
                room,
                ExpectedVersion::NoStream,
                vec![test_event(room, 1, "RoomRegistered")],
            )
            .await
            .unwrap();
        store
            .append(
                booking,
                ExpectedVersion::NoStream,
                vec![test_event(booking, 1, "BookingCreated")],
            )
            .await
            .unwrap();

        let all: Vec<_> = store.read_all().await.unwrap().collect().await;
        assert_eq!(all.len(), 2);

        let tail: Vec<_> = store.read_all_after(1).await.unwrap().collect().await;
        assert_eq!(tail.len(), 1);
        let event = tail.into_iter().next().unwrap().unwrap();
        assert_eq!(event.event_type, "BookingCreated");
        assert_eq!(event.position, 2);
    }
}
