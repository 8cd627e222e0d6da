//! Shared identifiers and value types used across the booking ledger crates.

mod ids;
mod money;

pub use ids::{AggregateId, RoomId, UserId};
pub use money::{Money, ParseMoneyError};
