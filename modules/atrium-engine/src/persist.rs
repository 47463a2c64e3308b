//! EventLog and AuthorizationSource implementations.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use atrium_access::{OrgHierarchy, Policy, RoleBinding, Workspace};
use atrium_common::{ActorId, EntityId, EventId, Scope};
use atrium_events::{Event, EventStatus, NewEvent};
use atrium_projector::{EntitySnapshot, Projector};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::traits::{AuthorizationSource, EventLog};

// ---------------------------------------------------------------------------
// MemoryEventLog
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LogState {
    events: Vec<Event>,
    snapshots: HashMap<EntityId, EntitySnapshot>,
}

/// In-memory store of record. Appends and transitions run under one lock,
/// so the expected-status check and the write cannot interleave.
#[derive(Default)]
pub struct MemoryEventLog {
    state: Mutex<LogState>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: EntitySnapshot) -> Self {
        self.state.get_mut().snapshots.insert(snapshot.id, snapshot);
        self
    }

    pub async fn insert_snapshot(&self, snapshot: EntitySnapshot) {
        self.state.lock().await.snapshots.insert(snapshot.id, snapshot);
    }

    /// Every stored event in append order (for test assertions).
    pub async fn events(&self) -> Vec<Event> {
        self.state.lock().await.events.clone()
    }
}

impl LogState {
    fn snapshot(&self, entity_id: EntityId) -> Result<&EntitySnapshot, StoreError> {
        self.snapshots
            .get(&entity_id)
            .ok_or(StoreError::EntityNotFound(entity_id))
    }

    /// The snapshot with an approved event folded in. Nothing is written, so a
    /// payload that cannot be applied leaves both the event and the snapshot untouched.
    fn folded(&self, event: &Event) -> Result<EntitySnapshot, StoreError> {
        let snapshot = self.snapshot(event.entity_id)?;
        let (next, result) = Projector::default()
            .confirm(snapshot, event)
            .map_err(|source| {
                warn!(event_id = %event.id, error = %source, "Approved event cannot be folded");
                StoreError::Fold { event_id: event.id, source }
            })?;
        debug!(event_id = %event.id, ?result, "Confirmed event into snapshot");
        Ok(next)
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn get_snapshot(&self, entity_id: EntityId) -> Result<Option<EntitySnapshot>, StoreError> {
        Ok(self.state.lock().await.snapshots.get(&entity_id).cloned())
    }

    async fn list_pending_events(&self, entity_id: EntityId) -> Result<Vec<Event>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.entity_id == entity_id && e.is_pending())
            .cloned()
            .collect())
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn append_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let mut state = self.state.lock().await;
        state.snapshot(event.entity_id)?;

        let stored = event.into_event(Uuid::new_v4(), Utc::now());
        if stored.status == EventStatus::Approved {
            let next = state.folded(&stored)?;
            state.snapshots.insert(stored.entity_id, next);
        }
        state.events.push(stored.clone());
        Ok(stored)
    }

    async fn transition(
        &self,
        event_id: EventId,
        expected: EventStatus,
        next: EventStatus,
    ) -> Result<Event, StoreError> {
        let mut state = self.state.lock().await;
        let index = state
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or(StoreError::EventNotFound(event_id))?;

        let actual = state.events[index].status;
        if actual != expected {
            return Err(StoreError::StatusMismatch {
                event_id,
                expected,
                actual,
                attempted: next,
            });
        }
        let status = actual
            .transition(next)
            .map_err(|source| StoreError::Transition { event_id, source })?;

        let mut updated = state.events[index].clone();
        updated.status = status;
        if status == EventStatus::Approved {
            let snapshot = state.folded(&updated)?;
            state.snapshots.insert(updated.entity_id, snapshot);
        }
        state.events[index] = updated.clone();
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// Workspace adapter
// ---------------------------------------------------------------------------

#[async_trait]
impl AuthorizationSource for Workspace {
    async fn list_role_bindings(&self, actor_id: ActorId) -> Result<Vec<RoleBinding>> {
        Ok(self
            .bindings
            .iter()
            .filter(|b| b.actor_id == actor_id)
            .cloned()
            .collect())
    }

    async fn list_policies(&self, scope: Scope, inherited: bool) -> Result<Vec<Policy>> {
        Ok(self.policies_for(scope, inherited))
    }

    async fn hierarchy(&self) -> Result<OrgHierarchy> {
        Ok(self.hierarchy.clone())
    }
}
