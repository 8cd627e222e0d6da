//! Core projection trait and position tracking.

use async_trait::async_trait;
use event_store::StoredEvent;

use crate::Result;

/// Store position of the last event a projection has applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition(i64);

impl ProjectionPosition {
    /// Nothing applied yet.
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn at(position: i64) -> Self {
        Self(position)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// True if the event at `position` has not been applied.
    pub fn is_behind(&self, position: i64) -> bool {
        self.0 < position
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.0)
    }
}

/// Folds stored events into a read model.
///
/// `handle` is called once per event, in store position order, and must
/// record the event's position so catch-up can resume after it.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &StoredEvent) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    /// Clears the view back to position zero.
    async fn reset(&self) -> Result<()>;
}
