//! Core aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events are facts that have already happened. They are immutable
/// and named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name stored alongside the payload.
    fn event_type(&self) -> &'static str;
}

/// Trait for event-sourced aggregates.
///
/// An aggregate is rebuilt by replaying its stream, decides new events from
/// commands against that state, and applies events without side effects.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors its commands can return.
    type Error: std::error::Error + Send + Sync;

    /// Returns the stream type name, e.g. "Room".
    fn aggregate_type() -> &'static str;

    /// Returns the aggregate's identifier, or None before its first event.
    fn id(&self) -> Option<AggregateId>;

    /// Returns the version of the last applied event (0 for a new aggregate).
    fn version(&self) -> Version;

    /// Sets the aggregate version. Called by the command handler while loading.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate.
    ///
    /// Must be pure and infallible: given the same state and event it always
    /// produces the same new state.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Booking reference the aggregate's events should be correlated with.
    fn correlation_id(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum LedgerEvent {
        Opened { id: AggregateId },
        NightsHeld { nights: u32 },
    }

    impl DomainEvent for LedgerEvent {
        fn event_type(&self) -> &'static str {
            match self {
                LedgerEvent::Opened { .. } => "LedgerOpened",
                LedgerEvent::NightsHeld { .. } => "NightsHeld",
            }
        }
    }

    #[derive(Debug, Default)]
    struct NightLedger {
        id: Option<AggregateId>,
        nights: u32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("ledger closed")]
    struct LedgerClosed;

    impl Aggregate for NightLedger {
        type Event = LedgerEvent;
        type Error = LedgerClosed;

        fn aggregate_type() -> &'static str {
            "NightLedger"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: Self::Event) {
            match event {
                LedgerEvent::Opened { id } => self.id = Some(id),
                LedgerEvent::NightsHeld { nights } => self.nights += nights,
            }
        }
    }

    #[test]
    fn replay_folds_events_in_order() {
        let id = AggregateId::new();
        let mut ledger = NightLedger::default();
        ledger.apply_events(vec![
            LedgerEvent::Opened { id },
            LedgerEvent::NightsHeld { nights: 3 },
            LedgerEvent::NightsHeld { nights: 4 },
        ]);

        assert_eq!(ledger.id(), Some(id));
        assert_eq!(ledger.nights, 7);
        assert!(ledger.correlation_id().is_none());
        assert_eq!(
            LedgerEvent::NightsHeld { nights: 1 }.event_type(),
            "NightsHeld"
        );
    }
}
