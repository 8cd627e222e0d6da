use thiserror::Error;

/// A transport could not deliver a notification.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("recipient {recipient} rejected: {reason}")]
    Rejected { recipient: String, reason: String },
}
