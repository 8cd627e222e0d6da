use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventStoreError, Result, StoredEvent, Version};

/// What the writer believes the stream's version to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// No check. Only safe for streams with a single writer.
    Any,
    /// The stream must not exist yet.
    NoStream,
    /// The stream must be at exactly this version.
    Exact(Version),
}

impl ExpectedVersion {
    /// Expectation matching a stream that was read at `version`.
    pub fn from_read(version: Version) -> Self {
        if version == Version::initial() {
            ExpectedVersion::NoStream
        } else {
            ExpectedVersion::Exact(version)
        }
    }

    /// Returns true if a stream currently at `actual` satisfies the expectation.
    pub fn matches(&self, actual: Version) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => actual == Version::initial(),
            ExpectedVersion::Exact(expected) => *expected == actual,
        }
    }
}

impl std::fmt::Display for ExpectedVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedVersion::Any => write!(f, "any version"),
            ExpectedVersion::NoStream => write!(f, "no stream"),
            ExpectedVersion::Exact(v) => write!(f, "version {v}"),
        }
    }
}

/// A stream of stored events in store order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StoredEvent>> + Send>>;

/// Core trait for event store implementations.
///
/// Appends to one stream are atomic and serialized by the version check:
/// of two writers that read the same version, exactly one commits.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends events to a stream.
    ///
    /// Fails with `ConcurrencyConflict` if the stream's current version does
    /// not satisfy `expected`. Returns the stream's version after the append.
    async fn append(
        &self,
        stream_id: AggregateId,
        expected: ExpectedVersion,
        events: Vec<StoredEvent>,
    ) -> Result<Version>;

    /// Reads every event of a stream in version order.
    async fn read_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>>;

    /// Returns the current version of a stream, or None if it has no events.
    async fn stream_version(&self, stream_id: AggregateId) -> Result<Option<Version>>;

    /// Streams all events with a position greater than `after`, in position order.
    async fn read_all_after(&self, after: i64) -> Result<EventStream>;
}

/// Convenience methods available on every store.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Returns true if the stream has at least one event.
    async fn stream_exists(&self, stream_id: AggregateId) -> Result<bool> {
        Ok(self.stream_version(stream_id).await?.is_some())
    }

    /// Streams every event in the store.
    async fn read_all(&self) -> Result<EventStream> {
        self.read_all_after(0).await
    }
}

impl<T: EventStore + ?Sized> EventStoreExt for T {}

/// Checks that a batch targets `stream_id` with consecutive versions.
pub fn validate_append(stream_id: AggregateId, events: &[StoredEvent]) -> Result<()> {
    let Some(first) = events.first() else {
        return Err(EventStoreError::InvalidAppend(
            "cannot append an empty batch".to_string(),
        ));
    };

    let mut expected_version = first.version;
    for (i, event) in events.iter().enumerate() {
        if event.stream_id != stream_id {
            return Err(EventStoreError::InvalidAppend(format!(
                "event {} belongs to stream {}, not {stream_id}",
                event.event_id, event.stream_id
            )));
        }
        if i > 0 {
            expected_version = expected_version.next();
            if event.version != expected_version {
                return Err(EventStoreError::InvalidAppend(format!(
                    "versions must be consecutive: expected {expected_version}, got {}",
                    event.version
                )));
            }
        }
    }

    Ok(())
}
