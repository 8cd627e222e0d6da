//! Booking references: generation and uniqueness.

mod generator;
mod registration;

pub use generator::{
    DEFAULT_REFERENCE_LENGTH, RandomReferenceGenerator, ReferenceGenerator,
    SequenceReferenceGenerator,
};
pub use registration::{ReferenceEvent, ReferenceIssuedData, ReferenceRegistration};

use common::AggregateId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Human-shareable booking identifier, e.g. `BK7Q2M9XZA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingReference(String);

impl BookingReference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Stream that registers this reference. Two bookings can never share a
    /// reference because only one of them can create this stream.
    pub fn registration_id(&self) -> AggregateId {
        AggregateId::from_name(&self.0)
    }
}

impl std::fmt::Display for BookingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookingReference {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for BookingReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur while registering a reference.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Booking reference {reference} is already issued")]
    AlreadyIssued { reference: BookingReference },
}
