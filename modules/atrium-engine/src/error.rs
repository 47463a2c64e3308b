use atrium_common::{ActorId, EntityId, EventId, Scope};
use atrium_events::{EventError, EventStatus, EventType, TransitionError};
use thiserror::Error;

/// Failures at the store-of-record boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    /// The expected-prior-status guard failed: someone else got there first.
    #[error("event {event_id} is {actual}, expected {expected} to move it to {attempted}")]
    StatusMismatch {
        event_id: EventId,
        expected: EventStatus,
        actual: EventStatus,
        attempted: EventStatus,
    },

    /// An approved event could not be folded into its snapshot. Nothing was written.
    #[error("event {event_id} cannot be applied: {source}")]
    Fold {
        event_id: EventId,
        #[source]
        source: EventError,
    },

    #[error("event {event_id}: {source}")]
    Transition {
        event_id: EventId,
        #[source]
        source: TransitionError,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Why a mutation was refused.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error("unknown event type: {0}")]
    UnknownEventType(String),

    #[error("malformed payload for {event_type}: {reason}")]
    MalformedPayload { event_type: String, reason: String },

    #[error("actor {actor_id} may not emit {event_type} at {scope}")]
    UnauthorizedEmission {
        actor_id: ActorId,
        event_type: EventType,
        scope: Scope,
    },

    #[error("actor {actor_id} may not resolve event {event_id}")]
    UnauthorizedApproval { actor_id: ActorId, event_id: EventId },

    #[error("event {event_id} is already {current}, cannot move to {attempted}")]
    ConflictingApprovalTransition {
        event_id: EventId,
        current: EventStatus,
        attempted: EventStatus,
    },

    /// Approval is required but no policy, and no org admin, could resolve it.
    #[error("no approver available for {event_type} at {scope}")]
    NoApprovers { event_type: EventType, scope: Scope },

    #[error("entity not found: {0}")]
    EntityNotFound(EntityId),

    #[error("event not found: {0}")]
    EventNotFound(EventId),

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl From<EventError> for MutationError {
    fn from(e: EventError) -> Self {
        match e {
            EventError::UnknownEventType(key) => MutationError::UnknownEventType(key),
            EventError::MalformedPayload { event_type, source } => MutationError::MalformedPayload {
                event_type,
                reason: source.to_string(),
            },
        }
    }
}

impl From<StoreError> for MutationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::EventNotFound(id) => MutationError::EventNotFound(id),
            StoreError::EntityNotFound(id) => MutationError::EntityNotFound(id),
            StoreError::StatusMismatch {
                event_id,
                actual,
                attempted,
                ..
            } => MutationError::ConflictingApprovalTransition {
                event_id,
                current: actual,
                attempted,
            },
            StoreError::Fold { source, .. } => MutationError::from(source),
            StoreError::Transition {
                event_id,
                source: TransitionError::AlreadyResolved { current, attempted },
            } => MutationError::ConflictingApprovalTransition {
                event_id,
                current,
                attempted,
            },
            StoreError::Transition { event_id, source } => {
                MutationError::Source(anyhow::anyhow!("event {event_id}: {source}"))
            }
            StoreError::Backend(e) => MutationError::Source(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn status_mismatch_keeps_the_attempted_status() {
        let event_id = Uuid::new_v4();
        let err = MutationError::from(StoreError::StatusMismatch {
            event_id,
            expected: EventStatus::Pending,
            actual: EventStatus::Approved,
            attempted: EventStatus::Rejected,
        });
        assert!(matches!(
            err,
            MutationError::ConflictingApprovalTransition {
                event_id: id,
                current: EventStatus::Approved,
                attempted: EventStatus::Rejected,
            } if id == event_id
        ));
    }
}
