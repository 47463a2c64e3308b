//! Collaborator traits for the mutation service.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use atrium_access::{OrgHierarchy, Policy, RoleBinding};
use atrium_common::{ActorId, EntityId, EventId, Scope};
use atrium_events::{Event, EventStatus, NewEvent};
use atrium_projector::EntitySnapshot;

use crate::error::StoreError;

/// The store of record for events and confirmed snapshots.
///
/// Implemented by `MemoryEventLog` (tests, CLI). Also implemented for `Arc<L>`
/// so a log can be shared between the service and test assertions.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Last confirmed state of an entity.
    async fn get_snapshot(&self, entity_id: EntityId) -> Result<Option<EntitySnapshot>, StoreError>;

    /// Pending events for an entity, oldest first.
    async fn list_pending_events(&self, entity_id: EntityId) -> Result<Vec<Event>, StoreError>;

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError>;

    /// Append atomically. The store assigns id and timestamp. An event appended
    /// as `Approved` is folded into the snapshot in the same step.
    async fn append_event(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Move an event from `expected` to `next`, failing with
    /// `StoreError::StatusMismatch` if the stored status is not `expected`.
    /// Approval folds the event into the snapshot in the same step.
    async fn transition(
        &self,
        event_id: EventId,
        expected: EventStatus,
        next: EventStatus,
    ) -> Result<Event, StoreError>;
}

/// Live role bindings, policies and the organisation tree.
#[async_trait]
pub trait AuthorizationSource: Send + Sync {
    async fn list_role_bindings(&self, actor_id: ActorId) -> Result<Vec<RoleBinding>>;

    /// Policies defined at `scope`, and at every enclosing scope when `inherited`.
    async fn list_policies(&self, scope: Scope, inherited: bool) -> Result<Vec<Policy>>;

    async fn hierarchy(&self) -> Result<OrgHierarchy>;
}

#[async_trait]
impl<L: EventLog> EventLog for Arc<L> {
    async fn get_snapshot(&self, entity_id: EntityId) -> Result<Option<EntitySnapshot>, StoreError> {
        (**self).get_snapshot(entity_id).await
    }

    async fn list_pending_events(&self, entity_id: EntityId) -> Result<Vec<Event>, StoreError> {
        (**self).list_pending_events(entity_id).await
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        (**self).get_event(event_id).await
    }

    async fn append_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        (**self).append_event(event).await
    }

    async fn transition(
        &self,
        event_id: EventId,
        expected: EventStatus,
        next: EventStatus,
    ) -> Result<Event, StoreError> {
        (**self).transition(event_id, expected, next).await
    }
}

#[async_trait]
impl<A: AuthorizationSource> AuthorizationSource for Arc<A> {
    async fn list_role_bindings(&self, actor_id: ActorId) -> Result<Vec<RoleBinding>> {
        (**self).list_role_bindings(actor_id).await
    }

    async fn list_policies(&self, scope: Scope, inherited: bool) -> Result<Vec<Policy>> {
        (**self).list_policies(scope, inherited).await
    }

    async fn hierarchy(&self) -> Result<OrgHierarchy> {
        (**self).hierarchy().await
    }
}
