use thiserror::Error;

use crate::{AggregateId, ExpectedVersion, Version};

/// Errors that can occur when reading from or appending to the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Another writer appended to the stream after it was read.
    ///
    /// Callers that can re-evaluate their decision (room claims, payment
    /// reconciliation) reload the stream and try again.
    #[error(
        "Concurrency conflict on stream {stream_id}: expected {expected}, found version {actual}"
    )]
    ConcurrencyConflict {
        stream_id: AggregateId,
        expected: ExpectedVersion,
        actual: Version,
    },

    /// The batch handed to `append` is malformed.
    #[error("Invalid append: {0}")]
    InvalidAppend(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns true if the error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EventStoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
