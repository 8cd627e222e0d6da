//! Projection processor for feeding events to projections.

use std::sync::Arc;

use event_store::{EventStore, StoredEvent};
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::Result;
use crate::projection::Projection;

/// Feeds events from an event store to projections in position order.
///
/// - Catch-up: applies every event each projection has not seen yet
/// - Single event delivery: hands one event to every projection
/// - Rebuild: resets every projection and replays from the start
///
/// Catch-ups are serialized so concurrent readers refreshing the same views
/// never apply an event twice.
pub struct ProjectionProcessor<S: EventStore> {
    store: S,
    projections: Vec<Arc<dyn Projection>>,
    catch_up: Mutex<()>,
}

impl<S: EventStore> ProjectionProcessor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            projections: Vec::new(),
            catch_up: Mutex::new(()),
        }
    }

    pub fn register(&mut self, projection: Arc<dyn Projection>) {
        self.projections.push(projection);
    }

    pub fn projection_count(&self) -> usize {
        self.projections.len()
    }

    /// Brings every projection up to the head of the store.
    ///
    /// Returns the number of events read.
    #[tracing::instrument(skip(self))]
    pub async fn run_catch_up(&self) -> Result<u64> {
        let _guard = self.catch_up.lock().await;

        let mut from = i64::MAX;
        for projection in &self.projections {
            from = from.min(projection.position().await.value());
        }
        if self.projections.is_empty() {
            return Ok(0);
        }

        let mut stream = self.store.read_all_after(from).await?;
        let mut read: u64 = 0;

        while let Some(result) = stream.next().await {
            let event = result?;
            read += 1;

            for projection in &self.projections {
                if projection.position().await.is_behind(event.position) {
                    projection.handle(&event).await?;
                    metrics::counter!("projections_events_processed", "projection" => projection.name())
                        .increment(1);
                }
            }
        }

        if read > 0 {
            tracing::debug!(from, events = read, "catch-up complete");
        }
        Ok(read)
    }

    /// Delivers a single event to every projection that has not seen it.
    #[tracing::instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn process_event(&self, event: &StoredEvent) -> Result<()> {
        for projection in &self.projections {
            if projection.position().await.is_behind(event.position) {
                projection.handle(event).await?;
            }
        }
        Ok(())
    }

    /// Resets every projection and replays the whole store.
    #[tracing::instrument(skip(self))]
    pub async fn rebuild_all(&self) -> Result<u64> {
        for projection in &self.projections {
            projection.reset().await?;
        }
        self.run_catch_up().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectionPosition;
    use async_trait::async_trait;
    use common::AggregateId;
    use event_store::{ExpectedVersion, InMemoryEventStore, Version};
    use tokio::sync::RwLock;

    /// Counts events and records positions.
    #[derive(Default)]
    struct CountingProjection {
        count: RwLock<u64>,
        position: RwLock<ProjectionPosition>,
    }

    #[async_trait]
    impl Projection for CountingProjection {
        fn name(&self) -> &'static str {
            "CountingProjection"
        }

        async fn handle(&self, event: &StoredEvent) -> Result<()> {
            *self.count.write().await += 1;
            *self.position.write().await = ProjectionPosition::at(event.position);
            Ok(())
        }

        async fn position(&self) -> ProjectionPosition {
            *self.position.read().await
        }

        async fn reset(&self) -> Result<()> {
            *self.count.write().await = 0;
            *self.position.write().await = ProjectionPosition::zero();
            Ok(())
        }
    }

    async fn store_with(events: i64) -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        let stream_id = AggregateId::new();
        let batch = (1..=events)
            .map(|v| {
                StoredEvent::new(
                    stream_id,
                    "Room",
                    Version::new(v),
                    "TestEvent",
                    serde_json::json!({"n": v}),
                )
            })
            .collect();
        store
            .append(stream_id, ExpectedVersion::NoStream, batch)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn catch_up_processes_all_events() {
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store_with(3).await);
        processor.register(projection.clone());

        assert_eq!(processor.run_catch_up().await.unwrap(), 3);
        assert_eq!(*projection.count.read().await, 3);
        assert_eq!(projection.position().await, ProjectionPosition::at(3));
    }

    #[tokio::test]
    async fn catch_up_skips_already_processed() {
        let store = store_with(3).await;
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(projection.clone());

        processor.run_catch_up().await.unwrap();
        assert_eq!(processor.run_catch_up().await.unwrap(), 0);
        assert_eq!(*projection.count.read().await, 3);

        let stream_id = AggregateId::new();
        store
            .append(
                stream_id,
                ExpectedVersion::NoStream,
                vec![StoredEvent::new(
                    stream_id,
                    "Room",
                    Version::first(),
                    "TestEvent",
                    serde_json::json!({}),
                )],
            )
            .await
            .unwrap();

        assert_eq!(processor.run_catch_up().await.unwrap(), 1);
        assert_eq!(*projection.count.read().await, 4);
    }

    #[tokio::test]
    async fn late_projection_catches_up_alone() {
        let early = Arc::new(CountingProjection::default());
        let late = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store_with(2).await);
        processor.register(early.clone());
        processor.run_catch_up().await.unwrap();

        processor.register(late.clone());
        processor.run_catch_up().await.unwrap();

        assert_eq!(*early.count.read().await, 2);
        assert_eq!(*late.count.read().await, 2);
    }

    #[tokio::test]
    async fn rebuild_resets_and_replays() {
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store_with(2).await);
        processor.register(projection.clone());

        processor.run_catch_up().await.unwrap();
        processor.rebuild_all().await.unwrap();

        assert_eq!(*projection.count.read().await, 2);
        assert_eq!(projection.position().await, ProjectionPosition::at(2));
    }

    #[tokio::test]
    async fn process_event_ignores_seen_positions() {
        let store = store_with(1).await;
        let projection = Arc::new(CountingProjection::default());
        let mut processor = ProjectionProcessor::new(store.clone());
        processor.register(projection.clone());
        processor.run_catch_up().await.unwrap();

        let mut all = store.read_all_after(0).await.unwrap();
        let seen = all.next().await.unwrap().unwrap();
        processor.process_event(&seen).await.unwrap();

        assert_eq!(*projection.count.read().await, 1);
    }
}
