//! Per-booking-reference async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use domain::BookingReference;
use tokio::sync::OwnedMutexGuard;

/// Serializes payment work on the same booking reference.
///
/// Intent creation and reconciliation take the same lock, so an intent cannot
/// be issued while a callback for that booking is being applied. Entries no
/// one holds or waits on are dropped on the next acquire.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLocks {
    locks: Arc<Mutex<HashMap<BookingReference, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ReferenceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, reference: &BookingReference) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(reference.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of references currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_reference_is_exclusive() {
        let locks = ReferenceLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let reference = BookingReference::new("BK7Q2M9XZA");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let reference = reference.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&reference).await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn different_references_do_not_block() {
        let locks = ReferenceLocks::new();
        let _a = locks.acquire(&BookingReference::new("AAAAAAAAAA")).await;
        let _b = locks.acquire(&BookingReference::new("BBBBBBBBBB")).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = ReferenceLocks::new();
        drop(locks.acquire(&BookingReference::new("AAAAAAAAAA")).await);
        let _b = locks.acquire(&BookingReference::new("BBBBBBBBBB")).await;
        assert_eq!(locks.len(), 1);
    }
}
