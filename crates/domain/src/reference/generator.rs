use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use rand::Rng;
use rand::distributions::Alphanumeric;

use super::BookingReference;

pub const DEFAULT_REFERENCE_LENGTH: usize = 10;

/// Produces candidate booking references. Uniqueness is enforced when the
/// reference is registered, not here.
pub trait ReferenceGenerator: Send + Sync {
    fn generate(&self) -> BookingReference;
}

/// Random upper-case alphanumeric references.
#[derive(Debug, Clone)]
pub struct RandomReferenceGenerator {
    length: usize,
}

impl RandomReferenceGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }
}

impl Default for RandomReferenceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_LENGTH)
    }
}

impl ReferenceGenerator for RandomReferenceGenerator {
    fn generate(&self) -> BookingReference {
        let value: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        BookingReference::new(value)
    }
}

/// Hands out a fixed list of references, then keeps repeating the last one.
///
/// Used to force reference collisions in tests.
#[derive(Debug)]
pub struct SequenceReferenceGenerator {
    queue: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl SequenceReferenceGenerator {
    pub fn new<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue: VecDeque<String> = references.into_iter().map(Into::into).collect();
        let last = queue.back().cloned().unwrap_or_else(|| "REF0000000".to_string());
        Self {
            queue: Mutex::new(queue),
            last: Mutex::new(last),
        }
    }
}

impl ReferenceGenerator for SequenceReferenceGenerator {
    fn generate(&self) -> BookingReference {
        let next = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(value) => {
                *self.last.lock().unwrap_or_else(PoisonError::into_inner) = value.clone();
                BookingReference::new(value)
            }
            None => BookingReference::new(
                self.last
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone(),
            ),
        }
    }
}
