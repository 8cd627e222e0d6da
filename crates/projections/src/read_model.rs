//! Read model trait for query-side views.

/// A view answering queries from projected state.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries currently in the view.
    fn count(&self) -> usize;
}
