//! The event envelope and its status machine.

use std::fmt;

use atrium_common::{ActorId, EntityId, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::EventType;
use crate::error::{EventError, TransitionError};
use crate::payloads::ProjectEvent;

/// Lifecycle of an event: `pending → approved | rejected`. Both outcomes are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventStatus::Pending)
    }

    /// Validate a move to `next`. Only pending events can be resolved.
    pub fn transition(self, next: EventStatus) -> Result<EventStatus, TransitionError> {
        if next == EventStatus::Pending {
            return Err(TransitionError::NotAResolution { attempted: next });
        }
        if self.is_terminal() {
            return Err(TransitionError::AlreadyResolved {
                current: self,
                attempted: next,
            });
        }
        Ok(next)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// An approver's verdict on a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> EventStatus {
        match self {
            Decision::Approve => EventStatus::Approved,
            Decision::Reject => EventStatus::Rejected,
        }
    }
}

/// Denormalized presentation data captured when the event was issued,
/// so renderers never need a lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
}

/// A recorded change to a project.
///
/// `event_type` stays a raw string so events of types this build does not
/// know about can still be carried, projected (as no-ops) and rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub actor_id: ActorId,
    pub entity_id: EntityId,
    pub created_at: DateTime<Utc>,
    pub status: EventStatus,
    #[serde(default)]
    pub display: DisplayHints,
}

impl Event {
    pub fn kind(&self) -> Result<EventType, EventError> {
        EventType::from_key(&self.event_type)
    }

    pub fn decode(&self) -> Result<ProjectEvent, EventError> {
        ProjectEvent::decode(self.kind()?, &self.payload)
    }

    pub fn is_pending(&self) -> bool {
        self.status == EventStatus::Pending
    }
}

/// An event to be appended. The caller builds this; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub entity_id: EntityId,
    pub event_type: EventType,
    pub payload: serde_json::Value,
    pub actor_id: ActorId,
    pub status: EventStatus,
    pub display: DisplayHints,
}

impl NewEvent {
    pub fn new(entity_id: EntityId, actor_id: ActorId, event: &ProjectEvent) -> Self {
        Self {
            entity_id,
            event_type: event.event_type(),
            payload: event.to_payload(),
            actor_id,
            status: EventStatus::Pending,
            display: DisplayHints::default(),
        }
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_display(mut self, display: DisplayHints) -> Self {
        self.display = display;
        self
    }

    /// Materialize with a store-assigned id and timestamp.
    pub fn into_event(self, id: EventId, created_at: DateTime<Utc>) -> Event {
        Event {
            id,
            event_type: self.event_type.key().to_string(),
            payload: self.payload,
            actor_id: self.actor_id,
            entity_id: self.entity_id,
            created_at,
            status: self.status,
            display: self.display,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_resolves_to_either_outcome() {
        assert_eq!(
            EventStatus::Pending.transition(EventStatus::Approved),
            Ok(EventStatus::Approved)
        );
        assert_eq!(
            EventStatus::Pending.transition(EventStatus::Rejected),
            Ok(EventStatus::Rejected)
        );
    }

    #[test]
    fn resolved_events_are_terminal() {
        for current in [EventStatus::Approved, EventStatus::Rejected] {
            for attempted in [EventStatus::Approved, EventStatus::Rejected] {
                assert_eq!(
                    current.transition(attempted),
                    Err(TransitionError::AlreadyResolved { current, attempted })
                );
            }
        }
    }

    #[test]
    fn pending_is_not_a_resolution() {
        assert!(matches!(
            EventStatus::Pending.transition(EventStatus::Pending),
            Err(TransitionError::NotAResolution { .. })
        ));
    }

    #[test]
    fn unknown_type_is_reported_by_kind() {
        let event = Event {
            id: uuid::Uuid::new_v4(),
            event_type: "project:budget_changed".into(),
            payload: serde_json::json!({ "amount": 10 }),
            actor_id: uuid::Uuid::new_v4(),
            entity_id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            status: EventStatus::Pending,
            display: DisplayHints::default(),
        };
        assert!(matches!(event.kind(), Err(EventError::UnknownEventType(_))));
        assert!(event.decode().is_err());
    }
}
