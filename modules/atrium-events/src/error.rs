use thiserror::Error;

use crate::types::EventStatus;

/// Failures interpreting an event envelope.
#[derive(Debug, Error)]
pub enum EventError {
    /// The key is not registered in the catalog.
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    /// The payload does not match the shape its type requires.
    #[error("malformed payload for {event_type}: {source}")]
    MalformedPayload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A status change the event state machine does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("event already resolved as {current}, cannot move to {attempted}")]
    AlreadyResolved {
        current: EventStatus,
        attempted: EventStatus,
    },

    #[error("{attempted} is not a resolution status")]
    NotAResolution { attempted: EventStatus },
}
