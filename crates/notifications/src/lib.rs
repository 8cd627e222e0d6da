//! Notification dispatch.
//!
//! The ledger enqueues [`domain::Notification`]s on a [`NotificationQueue`];
//! a [`NotificationWorker`] drains the queue and routes each message to the
//! [`NotificationSender`] registered for its channel. Delivery failures are
//! logged and counted, never reported back to the ledger.

pub mod error;
pub mod queue;
pub mod sender;
pub mod worker;

pub use error::DeliveryError;
pub use queue::NotificationQueue;
pub use sender::{InMemorySender, LogSender, NotificationSender};
pub use worker::NotificationWorker;
