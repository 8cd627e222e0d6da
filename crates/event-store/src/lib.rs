//! Append-only event store.
//!
//! Every stream is guarded by optimistic concurrency: an append names the
//! version it was computed against and is rejected with
//! [`EventStoreError::ConcurrencyConflict`] if another writer got there first.
//! The booking ledger builds its room claims, reference uniqueness and
//! payment reconciliation on top of that single guarantee.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventId, StoredEvent, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{EventStore, EventStoreExt, EventStream, ExpectedVersion};
