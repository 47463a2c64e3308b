//! Recipient resolution: who is in a dynamic group or holds a role right now.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use atrium_common::{ActorId, EntityId, RoleId, Scope};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hierarchy::OrgHierarchy;
use crate::role::RoleBinding;

/// A recipient set computed at evaluation time from live membership data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicGroup {
    /// Everyone holding any role directly on the project.
    ProjectMembers,
    /// The project's owner.
    ProjectOwner,
    /// Admins of the organisation that owns the project, including inherited admins.
    OrgAdmins,
}

impl DynamicGroup {
    pub fn name(&self) -> &'static str {
        match self {
            DynamicGroup::ProjectMembers => "project_members",
            DynamicGroup::ProjectOwner => "project_owner",
            DynamicGroup::OrgAdmins => "org_admins",
        }
    }
}

impl fmt::Display for DynamicGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DynamicGroup {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "project_members" => Ok(DynamicGroup::ProjectMembers),
            "project_owner" => Ok(DynamicGroup::ProjectOwner),
            "org_admins" => Ok(DynamicGroup::OrgAdmins),
            other => Err(DirectoryError::UnknownGroup(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("unknown dynamic group: {0}")]
    UnknownGroup(String),

    #[error("{group} cannot be resolved at {scope}")]
    Unresolvable { group: DynamicGroup, scope: Scope },

    #[error("membership source unavailable: {0}")]
    Unavailable(String),
}

/// Live membership queries used by policy routing.
///
/// Every call is a fresh read. Two evaluations of the same event may see
/// different answers if membership changed in between.
pub trait RecipientDirectory: Send + Sync {
    fn resolve_dynamic_group(
        &self,
        group: DynamicGroup,
        scope: Scope,
    ) -> Result<BTreeSet<ActorId>, DirectoryError>;

    /// Actors holding `role_id` on the project at `scope`.
    fn project_role_holders(
        &self,
        role_id: RoleId,
        scope: Scope,
    ) -> Result<BTreeSet<ActorId>, DirectoryError>;

    /// Actors holding `role_id` on any organisation enclosing `scope`.
    fn org_role_holders(
        &self,
        role_id: RoleId,
        scope: Scope,
    ) -> Result<BTreeSet<ActorId>, DirectoryError>;
}

/// In-memory directory over role bindings and project ownership.
#[derive(Debug, Clone)]
pub struct MembershipDirectory {
    hierarchy: OrgHierarchy,
    bindings: Vec<RoleBinding>,
    owners: BTreeMap<EntityId, ActorId>,
    admin_role_keys: BTreeSet<String>,
}

impl Default for MembershipDirectory {
    fn default() -> Self {
        Self::new(OrgHierarchy::default(), Vec::new())
    }
}

impl MembershipDirectory {
    pub fn new(hierarchy: OrgHierarchy, bindings: Vec<RoleBinding>) -> Self {
        Self {
            hierarchy,
            bindings,
            owners: BTreeMap::new(),
            admin_role_keys: BTreeSet::from(["admin".to_string()]),
        }
    }

    pub fn with_owner(mut self, project: EntityId, owner: ActorId) -> Self {
        self.owners.insert(project, owner);
        self
    }

    /// Role keys that count as organisation admin. Defaults to `admin`.
    pub fn with_admin_role_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_role_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn bindings(&self) -> &[RoleBinding] {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut Vec<RoleBinding> {
        &mut self.bindings
    }

    pub fn hierarchy(&self) -> &OrgHierarchy {
        &self.hierarchy
    }

    fn project_of(&self, group: DynamicGroup, scope: Scope) -> Result<EntityId, DirectoryError> {
        match scope {
            Scope::Project(id) => Ok(id),
            Scope::Organisation(_) => Err(DirectoryError::Unresolvable { group, scope }),
        }
    }

    fn holders_at<'a>(
        &'a self,
        scopes: &'a [Scope],
        pred: impl Fn(&RoleBinding) -> bool + 'a,
    ) -> impl Iterator<Item = ActorId> + 'a {
        self.bindings
            .iter()
            .filter(move |b| scopes.contains(&b.scope) && pred(b))
            .map(|b| b.actor_id)
    }
}

impl RecipientDirectory for MembershipDirectory {
    fn resolve_dynamic_group(
        &self,
        group: DynamicGroup,
        scope: Scope,
    ) -> Result<BTreeSet<ActorId>, DirectoryError> {
        match group {
            DynamicGroup::ProjectMembers => {
                let project = Scope::Project(self.project_of(group, scope)?);
                Ok(self.holders_at(&[project], |_| true).collect())
            }
            DynamicGroup::ProjectOwner => {
                let project = self.project_of(group, scope)?;
                self.owners
                    .get(&project)
                    .map(|owner| BTreeSet::from([*owner]))
                    .ok_or(DirectoryError::Unresolvable { group, scope })
            }
            DynamicGroup::OrgAdmins => {
                let Some(org) = self.hierarchy.nearest_organisation(scope) else {
                    return Err(DirectoryError::Unresolvable { group, scope });
                };
                let chain = self.hierarchy.ancestors(Scope::Organisation(org));
                Ok(self
                    .holders_at(&chain, |b| self.admin_role_keys.contains(&b.role.key))
                    .collect())
            }
        }
    }

    fn project_role_holders(
        &self,
        role_id: RoleId,
        scope: Scope,
    ) -> Result<BTreeSet<ActorId>, DirectoryError> {
        let project = match scope {
            Scope::Project(_) => scope,
            Scope::Organisation(_) => return Ok(BTreeSet::new()),
        };
        Ok(self.holders_at(&[project], |b| b.role.id == role_id).collect())
    }

    fn org_role_holders(
        &self,
        role_id: RoleId,
        scope: Scope,
    ) -> Result<BTreeSet<ActorId>, DirectoryError> {
        let orgs: Vec<Scope> = self
            .hierarchy
            .ancestors(scope)
            .into_iter()
            .filter(|s| !s.is_project())
            .collect();
        Ok(self.holders_at(&orgs, |b| b.role.id == role_id).collect())
    }
}
