//! Organisation tree and project ownership.

use std::collections::{BTreeMap, BTreeSet};

use atrium_common::{EntityId, OrganisationId, Scope};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which organisation each organisation reports to, and which organisation
/// owns each project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgHierarchy {
    parents: BTreeMap<OrganisationId, Option<OrganisationId>>,
    project_owners: BTreeMap<EntityId, Option<OrganisationId>>,
}

impl OrgHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organisation(mut self, id: OrganisationId, parent: Option<OrganisationId>) -> Self {
        self.add_organisation(id, parent);
        self
    }

    pub fn with_project(mut self, id: EntityId, organisation: Option<OrganisationId>) -> Self {
        self.add_project(id, organisation);
        self
    }

    pub fn add_organisation(&mut self, id: OrganisationId, parent: Option<OrganisationId>) {
        self.parents.insert(id, parent);
    }

    pub fn add_project(&mut self, id: EntityId, organisation: Option<OrganisationId>) {
        self.project_owners.insert(id, organisation);
    }

    pub fn organisations(&self) -> impl Iterator<Item = OrganisationId> + '_ {
        self.parents.keys().copied()
    }

    pub fn projects(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.project_owners.keys().copied()
    }

    /// The organisation that owns a project, if any.
    pub fn owning_organisation(&self, project: EntityId) -> Option<OrganisationId> {
        self.project_owners.get(&project).copied().flatten()
    }

    /// `scope` followed by every enclosing scope up to the root, nearest first.
    pub fn ancestors(&self, scope: Scope) -> Vec<Scope> {
        let mut chain = vec![scope];
        let mut next = match scope {
            Scope::Project(id) => self.owning_organisation(id),
            Scope::Organisation(id) => self.parent_of(id),
        };

        let mut seen = BTreeSet::new();
        if let Scope::Organisation(id) = scope {
            seen.insert(id);
        }
        while let Some(org) = next {
            if !seen.insert(org) {
                warn!(organisation = %org, "Cycle in organisation hierarchy, stopping walk");
                break;
            }
            chain.push(Scope::Organisation(org));
            next = self.parent_of(org);
        }
        chain
    }

    /// True if `inner` is `outer` or lies anywhere beneath it.
    ///
    /// A project scope only contains itself; an organisation scope contains
    /// itself, every descendant organisation, and their projects.
    pub fn contains(&self, outer: Scope, inner: Scope) -> bool {
        match outer {
            Scope::Project(_) => outer == inner,
            Scope::Organisation(_) => self.ancestors(inner).contains(&outer),
        }
    }

    /// The nearest organisation at or above `scope`.
    pub fn nearest_organisation(&self, scope: Scope) -> Option<OrganisationId> {
        self.ancestors(scope).into_iter().find_map(|s| match s {
            Scope::Organisation(id) => Some(id),
            Scope::Project(_) => None,
        })
    }

    fn parent_of(&self, org: OrganisationId) -> Option<OrganisationId> {
        self.parents.get(&org).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct Tree {
        hierarchy: OrgHierarchy,
        root: OrganisationId,
        child: OrganisationId,
        sibling: OrganisationId,
        project: EntityId,
    }

    fn tree() -> Tree {
        let (root, child, sibling, project) =
            (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let hierarchy = OrgHierarchy::new()
            .with_organisation(root, None)
            .with_organisation(child, Some(root))
            .with_organisation(sibling, Some(root))
            .with_project(project, Some(child));
        Tree { hierarchy, root, child, sibling, project }
    }

    #[test]
    fn ancestors_walk_from_project_to_root() {
        let t = tree();
        assert_eq!(
            t.hierarchy.ancestors(Scope::Project(t.project)),
            vec![
                Scope::Project(t.project),
                Scope::Organisation(t.child),
                Scope::Organisation(t.root)
            ]
        );
    }

    #[test]
    fn root_contains_every_descendant() {
        let t = tree();
        let root = Scope::Organisation(t.root);
        assert!(t.hierarchy.contains(root, Scope::Organisation(t.child)));
        assert!(t.hierarchy.contains(root, Scope::Project(t.project)));
        assert!(!t.hierarchy.contains(Scope::Organisation(t.sibling), Scope::Project(t.project)));
        assert!(!t.hierarchy.contains(Scope::Organisation(t.child), root));
    }

    #[test]
    fn project_scope_contains_only_itself() {
        let t = tree();
        let project = Scope::Project(t.project);
        assert!(t.hierarchy.contains(project, project));
        assert!(!t.hierarchy.contains(project, Scope::Organisation(t.child)));
    }

    #[test]
    fn cycles_terminate() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let hierarchy = OrgHierarchy::new()
            .with_organisation(a, Some(b))
            .with_organisation(b, Some(a));
        assert_eq!(hierarchy.ancestors(Scope::Organisation(a)).len(), 2);
    }

    #[test]
    fn nearest_organisation_of_unowned_project_is_none() {
        let hierarchy = OrgHierarchy::new().with_project(Uuid::new_v4(), None);
        let project = hierarchy.projects().next().unwrap();
        assert_eq!(hierarchy.nearest_organisation(Scope::Project(project)), None);
    }
}
