//! Mutation orchestration: authorize, route, append; resolve; read.

use std::sync::Arc;

use atrium_access::{
    allowed_event_types, evaluate, fallback_approvers, Evaluation, EvaluationOptions, RecipientDirectory,
    Subject,
};
use atrium_common::{ActorId, EntityId, EventId, Scope};
use atrium_events::{catalog, Decision, DisplayHints, Event, EventCatalog, EventStatus, NewEvent, ProjectEvent};
use atrium_projector::{EntitySnapshot, Projector};
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use crate::error::MutationError;
use crate::traits::{AuthorizationSource, EventLog};

/// A client's request to change an entity.
#[derive(Debug, Clone, TypedBuilder)]
pub struct MutationIntent {
    pub entity_id: EntityId,
    pub actor_id: ActorId,
    /// Catalog key, e.g. `project:title_changed`.
    #[builder(setter(into))]
    pub event_type: String,
    pub payload: serde_json::Value,
    #[builder(default)]
    pub display: DisplayHints,
}

impl MutationIntent {
    pub fn from_event(entity_id: EntityId, actor_id: ActorId, event: &ProjectEvent) -> Self {
        Self {
            entity_id,
            actor_id,
            event_type: event.event_type().key().to_string(),
            payload: event.to_payload(),
            display: DisplayHints::default(),
        }
    }
}

/// What `issue` stored and why.
#[derive(Debug, Clone)]
pub struct IssuedMutation {
    pub event: Event,
    pub evaluation: Evaluation,
}

impl IssuedMutation {
    pub fn is_pending(&self) -> bool {
        self.event.is_pending()
    }
}

/// Accepts mutation intents and turns them into stored events.
///
/// Permission is checked before anything is written. Routing decides whether
/// the event lands pending (awaiting approval) or approved (folded at once).
pub struct MutationService<L, A, D>
where
    L: EventLog,
    A: AuthorizationSource,
    D: RecipientDirectory,
{
    catalog: Arc<EventCatalog>,
    log: L,
    auth: A,
    directory: D,
    options: EvaluationOptions,
}

impl<L, A, D> MutationService<L, A, D>
where
    L: EventLog,
    A: AuthorizationSource,
    D: RecipientDirectory,
{
    pub fn new(log: L, auth: A, directory: D) -> Self {
        Self {
            catalog: Arc::new(catalog().clone()),
            log,
            auth,
            directory,
            options: EvaluationOptions::default(),
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<EventCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Validate, authorize and route a mutation, then append it.
    ///
    /// An unauthorized actor gets `UnauthorizedEmission` and nothing is stored.
    pub async fn issue(&self, intent: MutationIntent) -> Result<IssuedMutation, MutationError> {
        let event_type = self.catalog.resolve(&intent.event_type).inspect_err(|_| {
            warn!(event_type = intent.event_type.as_str(), "Rejected mutation: unknown event type");
        })?;
        let decoded = ProjectEvent::decode(event_type, &intent.payload).inspect_err(|e| {
            warn!(event_type = event_type.key(), error = %e, "Rejected mutation: malformed payload");
        })?;

        if self.log.get_snapshot(intent.entity_id).await?.is_none() {
            return Err(MutationError::EntityNotFound(intent.entity_id));
        }

        let scope = Scope::Project(intent.entity_id);
        let hierarchy = self.auth.hierarchy().await?;
        let bindings = self.auth.list_role_bindings(intent.actor_id).await?;
        let allowed = allowed_event_types(&bindings, intent.actor_id, scope, &hierarchy);
        if !allowed.contains(&event_type) {
            warn!(
                actor_id = %intent.actor_id,
                event_type = event_type.key(),
                %scope,
                "Rejected mutation: event type not permitted"
            );
            return Err(MutationError::UnauthorizedEmission {
                actor_id: intent.actor_id,
                event_type,
                scope,
            });
        }

        let policies = self.auth.list_policies(scope, true).await?;
        let subject = Subject::new(event_type, intent.actor_id, scope);
        let evaluation = evaluate(&subject, &policies, &hierarchy, &self.directory, self.options);
        if evaluation.requires_approval && evaluation.approvers.is_empty() {
            warn!(
                actor_id = %intent.actor_id,
                event_type = event_type.key(),
                %scope,
                "Rejected mutation: approval required but nobody can approve"
            );
            return Err(MutationError::NoApprovers { event_type, scope });
        }

        let status = if evaluation.requires_approval {
            EventStatus::Pending
        } else {
            EventStatus::Approved
        };
        let new_event = NewEvent::new(intent.entity_id, intent.actor_id, &decoded)
            .with_status(status)
            .with_display(intent.display);
        let event = self.log.append_event(new_event).await?;

        info!(
            event_id = %event.id,
            event_type = event.event_type,
            %status,
            notify = evaluation.notify.len(),
            "Mutation issued"
        );
        Ok(IssuedMutation { event, evaluation })
    }

    /// Approve or reject a pending event.
    ///
    /// Only approvers named by a currently matching approval policy may
    /// resolve. If none are named any more (policy disabled, recipients gone),
    /// the org admins of the nearest organisation may. Of two racing
    /// resolutions exactly one succeeds; the other gets
    /// `ConflictingApprovalTransition`.
    pub async fn resolve(
        &self,
        event_id: EventId,
        approver: ActorId,
        decision: Decision,
    ) -> Result<Event, MutationError> {
        let attempted = decision.target_status();
        let event = self
            .log
            .get_event(event_id)
            .await?
            .ok_or(MutationError::EventNotFound(event_id))?;
        if event.status != EventStatus::Pending {
            return Err(MutationError::ConflictingApprovalTransition {
                event_id,
                current: event.status,
                attempted,
            });
        }

        let subject = Subject::from_event(&event)?;
        let hierarchy = self.auth.hierarchy().await?;
        let policies = self.auth.list_policies(subject.scope, true).await?;
        let evaluation = evaluate(&subject, &policies, &hierarchy, &self.directory, self.options);
        let approvers = if evaluation.approvers.is_empty() {
            fallback_approvers(subject.scope, &self.directory)
        } else {
            evaluation.approvers
        };
        if !approvers.contains(&approver) {
            warn!(%event_id, approver_id = %approver, "Rejected resolution: not an approver");
            return Err(MutationError::UnauthorizedApproval {
                actor_id: approver,
                event_id,
            });
        }

        let resolved = self
            .log
            .transition(event_id, EventStatus::Pending, attempted)
            .await?;

        info!(%event_id, approver_id = %approver, status = %resolved.status, "Event resolved");
        Ok(resolved)
    }

    /// The entity as `viewer` sees it: confirmed state plus the viewer's own
    /// pending changes.
    pub async fn read_view(
        &self,
        entity_id: EntityId,
        viewer: ActorId,
    ) -> Result<EntitySnapshot, MutationError> {
        let snapshot = self
            .log
            .get_snapshot(entity_id)
            .await?
            .ok_or(MutationError::EntityNotFound(entity_id))?;
        let pending = self.log.list_pending_events(entity_id).await?;
        Ok(Projector::new(&self.catalog).view_for(&snapshot, &pending, viewer))
    }
}
