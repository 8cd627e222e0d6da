//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{EventStore, ExpectedVersion, StoredEvent, Version};

use crate::aggregate::{Aggregate, DomainEvent};
use crate::error::DomainError;

/// Attempts made by [`CommandHandler::execute_with_retry`] unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 16;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

/// Trait for commands that target a single aggregate.
///
/// Commands express an intention and may be rejected by the aggregate's
/// current state.
pub trait Command: Send + Sync {
    /// The type of aggregate this command targets.
    type Aggregate: Aggregate;

    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> AggregateId;
}

/// Loads aggregates from the event store and persists the events their
/// commands produce.
///
/// Every append is conditional on the version the aggregate was loaded at,
/// so a command decided against stale state is rejected by the store rather
/// than committed.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    max_attempts: u32,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            _phantom: PhantomData,
        }
    }

    /// Sets how many times a conflicting command is re-executed.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate by replaying its stream.
    ///
    /// If the stream doesn't exist, returns a default instance.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<A, DomainError> {
        let events = self.store.read_stream(aggregate_id).await?;

        let mut aggregate = A::default();
        for stored in events {
            let event: A::Event = serde_json::from_value(stored.payload)?;
            aggregate.apply(event);
            aggregate.set_version(stored.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it doesn't exist.
    pub async fn load_existing(&self, aggregate_id: AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        Ok(aggregate.id().is_some().then_some(aggregate))
    }

    /// Executes a command once and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either the events to append, or an error. A concurrent writer surfaces
    /// as [`DomainError::EventStore`] with a concurrency conflict.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        for event in &events {
            aggregate.apply(event.clone());
        }

        let stored = build_stored_events(
            aggregate_id,
            current_version,
            aggregate.correlation_id(),
            A::aggregate_type(),
            &events,
        )?;

        let new_version = self
            .store
            .append(
                aggregate_id,
                ExpectedVersion::from_read(current_version),
                stored,
            )
            .await?;
        aggregate.set_version(new_version);

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Executes a command, reloading and re-deciding it whenever another
    /// writer commits to the same stream first.
    ///
    /// Because the command is re-run against fresh state, a retried command
    /// sees whatever the competing writer did (a retried room claim, for
    /// example, re-checks availability). Gives up with
    /// [`DomainError::ConcurrencyRetriesExhausted`] after the configured
    /// number of attempts.
    pub async fn execute_with_retry<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        for attempt in 1..=self.max_attempts {
            match self.execute(aggregate_id, &command_fn).await {
                Err(DomainError::EventStore(e)) if e.is_conflict() => {
                    metrics::counter!(
                        "command_conflict_retries_total",
                        "aggregate" => A::aggregate_type()
                    )
                    .increment(1);
                    tracing::debug!(
                        %aggregate_id,
                        aggregate = A::aggregate_type(),
                        attempt,
                        "version conflict, retrying command"
                    );
                    tokio::task::yield_now().await;
                }
                result => return result,
            }
        }

        Err(DomainError::ConcurrencyRetriesExhausted {
            aggregate_type: A::aggregate_type(),
            aggregate_id: aggregate_id.to_string(),
            attempts: self.max_attempts,
        })
    }
}

/// Wraps domain events for the store, numbering them after `current_version`.
fn build_stored_events<E: DomainEvent>(
    aggregate_id: AggregateId,
    current_version: Version,
    correlation_id: Option<String>,
    aggregate_type: &'static str,
    events: &[E],
) -> Result<Vec<StoredEvent>, DomainError> {
    let mut stored = Vec::with_capacity(events.len());
    let mut version = current_version;

    for event in events {
        version = version.next();
        let mut envelope = StoredEvent::new(
            aggregate_id,
            aggregate_type,
            version,
            event.event_type(),
            serde_json::to_value(event)?,
        );
        if let Some(correlation_id) = &correlation_id {
            envelope = envelope.with_correlation_id(correlation_id.clone());
        }
        stored.push(envelope);
    }

    Ok(stored)
}
