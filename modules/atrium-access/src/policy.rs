//! Policy routing: does an event need approval, and who hears about it?

use std::collections::BTreeSet;

use atrium_common::{ActorId, PolicyId, RoleId, Scope};
use atrium_events::{Event, EventError, EventType};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directory::{DirectoryError, DynamicGroup, RecipientDirectory};
use crate::hierarchy::OrgHierarchy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Notify,
    RequestApproval,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipients {
    #[serde(default)]
    pub dynamic_groups: Vec<DynamicGroup>,
    #[serde(default)]
    pub user_ids: Vec<ActorId>,
    #[serde(default)]
    pub project_role_ids: Vec<RoleId>,
    #[serde(default)]
    pub org_role_ids: Vec<RoleId>,
}

/// A rule mapping event types to an action and a recipient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub name: String,
    /// Where the policy is defined. It covers this scope and everything beneath it.
    pub scope: Scope,
    pub event_types: BTreeSet<EventType>,
    pub action: PolicyAction,
    #[serde(default)]
    pub recipients: Recipients,
    pub enabled: bool,
}

impl Policy {
    /// Enabled, defined at `scope` or above it, and lists `event_type`.
    pub fn matches(&self, event_type: EventType, scope: Scope, hierarchy: &OrgHierarchy) -> bool {
        self.enabled
            && self.event_types.contains(&event_type)
            && hierarchy.contains(self.scope, scope)
    }
}

/// The event being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub event_type: EventType,
    pub actor_id: ActorId,
    pub scope: Scope,
}

impl Subject {
    pub fn new(event_type: EventType, actor_id: ActorId, scope: Scope) -> Self {
        Self { event_type, actor_id, scope }
    }

    /// Route a stored event. Project events are scoped to their project.
    pub fn from_event(event: &Event) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.kind()?,
            actor_id: event.actor_id,
            scope: Scope::Project(event.entity_id),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Keep the emitting actor in its own notification set.
    pub notify_actor: bool,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self { notify_actor: true }
    }
}

/// Routing decision for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub apply_immediately: bool,
    pub requires_approval: bool,
    /// Everyone to notify, across every matching policy.
    pub notify: BTreeSet<ActorId>,
    /// Recipients of approval-requiring policies. Only they may resolve the event.
    /// Falls back to the org admins of the nearest organisation when no
    /// approval policy yields anyone.
    pub approvers: BTreeSet<ActorId>,
    pub matched_policies: Vec<PolicyId>,
    /// Policies with at least one recipient source that could not be resolved.
    /// The sources that did resolve still count. Routing is unaffected.
    pub notification_failures: Vec<PolicyId>,
}

/// Classify `subject` against `policies`.
///
/// The approval decision depends only on which policies match. Recipient
/// resolution is best-effort per source: a failing group or role query drops
/// that source only, and the policy is recorded in `notification_failures`.
pub fn evaluate(
    subject: &Subject,
    policies: &[Policy],
    hierarchy: &OrgHierarchy,
    directory: &dyn RecipientDirectory,
    options: EvaluationOptions,
) -> Evaluation {
    let mut evaluation = Evaluation::default();

    for policy in policies
        .iter()
        .filter(|p| p.matches(subject.event_type, subject.scope, hierarchy))
    {
        evaluation.matched_policies.push(policy.id);
        let approval = policy.action == PolicyAction::RequestApproval;
        evaluation.requires_approval |= approval;

        let (recipients, failures) = resolve_recipients(&policy.recipients, subject.scope, directory);
        for e in &failures {
            warn!(
                policy = policy.name.as_str(),
                policy_id = %policy.id,
                error = %e,
                "Recipient source failed, skipping it for this policy"
            );
        }
        if !failures.is_empty() {
            evaluation.notification_failures.push(policy.id);
        }
        debug!(
            policy = policy.name.as_str(),
            recipients = recipients.len(),
            "Policy matched"
        );
        if approval {
            evaluation.approvers.extend(recipients.iter().copied());
        }
        evaluation.notify.extend(recipients);
    }

    if evaluation.requires_approval && evaluation.approvers.is_empty() {
        evaluation.approvers = fallback_approvers(subject.scope, directory);
        evaluation.notify.extend(evaluation.approvers.iter().copied());
    }

    if !options.notify_actor {
        evaluation.notify.remove(&subject.actor_id);
    }
    evaluation.apply_immediately = !evaluation.requires_approval;
    evaluation
}

/// Who may resolve a pending event when no approval policy names anyone:
/// the org admins of the nearest organisation. Empty if that lookup fails.
pub fn fallback_approvers(scope: Scope, directory: &dyn RecipientDirectory) -> BTreeSet<ActorId> {
    match directory.resolve_dynamic_group(DynamicGroup::OrgAdmins, scope) {
        Ok(admins) => {
            debug!(%scope, approvers = admins.len(), "Using org admins as fallback approvers");
            admins
        }
        Err(e) => {
            warn!(%scope, error = %e, "Fallback approver lookup failed");
            BTreeSet::new()
        }
    }
}

fn resolve_recipients(
    recipients: &Recipients,
    scope: Scope,
    directory: &dyn RecipientDirectory,
) -> (BTreeSet<ActorId>, Vec<DirectoryError>) {
    let mut resolved: BTreeSet<ActorId> = recipients.user_ids.iter().copied().collect();
    let mut failures = Vec::new();

    let lookups = recipients
        .dynamic_groups
        .iter()
        .map(|group| directory.resolve_dynamic_group(*group, scope))
        .chain(
            recipients
                .project_role_ids
                .iter()
                .map(|role_id| directory.project_role_holders(*role_id, scope)),
        )
        .chain(
            recipients
                .org_role_ids
                .iter()
                .map(|role_id| directory.org_role_holders(*role_id, scope)),
        );
    for lookup in lookups {
        match lookup {
            Ok(actors) => resolved.extend(actors),
            Err(e) => failures.push(e),
        }
    }
    (resolved, failures)
}
