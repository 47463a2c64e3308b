//! Roles, role bindings, and emission authorization.

use std::collections::BTreeSet;

use atrium_common::{ActorId, RoleId, Scope};
use atrium_events::EventType;
use serde::{Deserialize, Serialize};

use crate::hierarchy::OrgHierarchy;

/// A named bundle of event types an actor may emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub key: String,
    pub display_name: String,
    pub allowed_event_types: BTreeSet<EventType>,
}

impl Role {
    pub fn new(id: RoleId, key: impl Into<String>, allowed: impl IntoIterator<Item = EventType>) -> Self {
        let key = key.into();
        Self {
            id,
            display_name: key.clone(),
            key,
            allowed_event_types: allowed.into_iter().collect(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn allows(&self, event_type: EventType) -> bool {
        self.allowed_event_types.contains(&event_type)
    }
}

/// An actor holding a role at a scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub actor_id: ActorId,
    pub role: Role,
    pub scope: Scope,
}

impl RoleBinding {
    pub fn new(actor_id: ActorId, role: Role, scope: Scope) -> Self {
        Self { actor_id, role, scope }
    }

    /// Does this binding reach `target`?
    pub fn applies_to(&self, target: Scope, hierarchy: &OrgHierarchy) -> bool {
        hierarchy.contains(self.scope, target)
    }
}

/// Event types `actor` may emit at `target`: the union of `allowed_event_types`
/// over every binding of that actor whose scope contains `target`.
pub fn allowed_event_types(
    bindings: &[RoleBinding],
    actor: ActorId,
    target: Scope,
    hierarchy: &OrgHierarchy,
) -> BTreeSet<EventType> {
    bindings
        .iter()
        .filter(|b| b.actor_id == actor && b.applies_to(target, hierarchy))
        .flat_map(|b| b.role.allowed_event_types.iter().copied())
        .collect()
}

/// Remove `actor`'s binding of `role_id` at exactly `at`.
///
/// Bindings inherited from an enclosing organisation are untouched; removing
/// them requires acting at the scope they were granted.
pub fn revoke_binding(
    bindings: &mut Vec<RoleBinding>,
    actor: ActorId,
    role_id: RoleId,
    at: Scope,
) -> usize {
    let before = bindings.len();
    bindings.retain(|b| !(b.actor_id == actor && b.role.id == role_id && b.scope == at));
    before - bindings.len()
}
