//! TOML-backed workspace: organisations, projects, roles, bindings, policies.
//!
//! Role and policy definitions reference event types and roles by key. Every
//! key is checked against the event catalog and the role list at load time;
//! an unknown key fails the whole load.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use atrium_common::{ActorId, AtriumError, EntityId, OrganisationId, PolicyId, RoleId, Scope};
use atrium_events::{EventCatalog, EventType};
use serde::Deserialize;
use uuid::Uuid;

use crate::directory::{DynamicGroup, MembershipDirectory};
use crate::hierarchy::OrgHierarchy;
use crate::policy::{Policy, PolicyAction, Recipients};
use crate::role::{Role, RoleBinding};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub admin_role_keys: Option<Vec<String>>,
    #[serde(default)]
    pub organisations: Vec<OrganisationDef>,
    #[serde(default)]
    pub projects: Vec<ProjectDef>,
    #[serde(default)]
    pub roles: Vec<RoleDef>,
    #[serde(default)]
    pub bindings: Vec<BindingDef>,
    #[serde(default)]
    pub policies: Vec<PolicyDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganisationDef {
    pub id: OrganisationId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<OrganisationId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDef {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub organisation: Option<OrganisationId>,
    #[serde(default)]
    pub owner: Option<ActorId>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleDef {
    pub id: RoleId,
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub allowed_event_types: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingDef {
    pub actor: ActorId,
    /// Role key.
    pub role: String,
    /// `project:<uuid>` or `organisation:<uuid>`.
    pub scope: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDef {
    #[serde(default)]
    pub id: Option<PolicyId>,
    pub name: String,
    pub scope: String,
    pub event_types: Vec<String>,
    pub action: PolicyAction,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub recipients: RecipientsDef,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientsDef {
    #[serde(default)]
    pub dynamic_groups: Vec<DynamicGroup>,
    #[serde(default)]
    pub users: Vec<ActorId>,
    /// Role keys.
    #[serde(default)]
    pub project_roles: Vec<String>,
    /// Role keys.
    #[serde(default)]
    pub org_roles: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

/// A validated workspace, ready to hand to the access engine.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub hierarchy: OrgHierarchy,
    pub project_names: BTreeMap<EntityId, String>,
    pub roles: Vec<Role>,
    pub bindings: Vec<RoleBinding>,
    pub policies: Vec<Policy>,
    pub directory: MembershipDirectory,
}

impl Workspace {
    pub fn role_by_key(&self, key: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.key == key)
    }

    /// Policies defined at `scope`, plus those at enclosing scopes when `inherited`.
    pub fn policies_for(&self, scope: Scope, inherited: bool) -> Vec<Policy> {
        let visible = if inherited {
            self.hierarchy.ancestors(scope)
        } else {
            vec![scope]
        };
        self.policies
            .iter()
            .filter(|p| visible.contains(&p.scope))
            .cloned()
            .collect()
    }
}

/// Load, parse and validate a workspace file.
pub fn load_workspace(path: &Path, catalog: &EventCatalog) -> Result<Workspace> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspace file: {}", path.display()))?;
    let file = parse_workspace(&content)
        .with_context(|| format!("Failed to parse workspace file: {}", path.display()))?;
    let workspace = file
        .validate(catalog)
        .with_context(|| format!("Invalid workspace file: {}", path.display()))?;
    tracing::info!(
        organisations = workspace.hierarchy.organisations().count(),
        projects = workspace.project_names.len(),
        roles = workspace.roles.len(),
        policies = workspace.policies.len(),
        "Workspace loaded"
    );
    Ok(workspace)
}

pub fn parse_workspace(content: &str) -> Result<WorkspaceFile> {
    Ok(toml::from_str(content)?)
}

impl WorkspaceFile {
    pub fn validate(self, catalog: &EventCatalog) -> Result<Workspace, AtriumError> {
        let mut hierarchy = OrgHierarchy::new();
        for org in &self.organisations {
            hierarchy.add_organisation(org.id, org.parent);
        }
        for org in &self.organisations {
            if let Some(parent) = org.parent {
                if !self.organisations.iter().any(|o| o.id == parent) {
                    return Err(AtriumError::Validation(format!(
                        "organisation '{}' has unknown parent {parent}",
                        org.name
                    )));
                }
            }
        }

        let parents: BTreeMap<OrganisationId, Option<OrganisationId>> =
            self.organisations.iter().map(|o| (o.id, o.parent)).collect();
        for org in &self.organisations {
            let mut seen = BTreeSet::from([org.id]);
            let mut next = org.parent;
            while let Some(id) = next {
                if !seen.insert(id) {
                    return Err(AtriumError::Validation(format!(
                        "organisation '{}' is its own ancestor",
                        org.name
                    )));
                }
                next = parents.get(&id).copied().flatten();
            }
        }

        let mut project_names = BTreeMap::new();
        for project in &self.projects {
            if let Some(org) = project.organisation {
                if !parents.contains_key(&org) {
                    return Err(AtriumError::Validation(format!(
                        "project '{}' belongs to unknown organisation {org}",
                        project.name
                    )));
                }
            }
            hierarchy.add_project(project.id, project.organisation);
            project_names.insert(project.id, project.name.clone());
        }

        let roles = self
            .roles
            .iter()
            .map(|def| role_from_def(def, catalog))
            .collect::<Result<Vec<_>, _>>()?;

        let find_role = |key: &str| -> Result<&Role, AtriumError> {
            roles
                .iter()
                .find(|r| r.key == key)
                .ok_or_else(|| AtriumError::Validation(format!("unknown role key '{key}'")))
        };

        let declared = |raw: &str| -> Result<Scope, AtriumError> {
            let scope: Scope = raw.parse()?;
            let known = match scope {
                Scope::Organisation(id) => parents.contains_key(&id),
                Scope::Project(id) => project_names.contains_key(&id),
            };
            if known {
                Ok(scope)
            } else {
                Err(AtriumError::Validation(format!("scope {scope} is not declared")))
            }
        };

        let mut bindings = Vec::with_capacity(self.bindings.len());
        for def in &self.bindings {
            let role = find_role(&def.role)?.clone();
            bindings.push(RoleBinding::new(def.actor, role, declared(&def.scope)?));
        }

        let mut policies = Vec::with_capacity(self.policies.len());
        for def in &self.policies {
            let role_ids = |keys: &[String]| -> Result<Vec<RoleId>, AtriumError> {
                keys.iter().map(|k| find_role(k).map(|r| r.id)).collect()
            };
            policies.push(Policy {
                id: def.id.unwrap_or_else(Uuid::new_v4),
                name: def.name.clone(),
                scope: declared(&def.scope)?,
                event_types: resolve_types(&def.event_types, catalog)?
                    .into_iter()
                    .collect(),
                action: def.action,
                recipients: Recipients {
                    dynamic_groups: def.recipients.dynamic_groups.clone(),
                    user_ids: def.recipients.users.clone(),
                    project_role_ids: role_ids(&def.recipients.project_roles)?,
                    org_role_ids: role_ids(&def.recipients.org_roles)?,
                },
                enabled: def.enabled,
            });
        }

        let mut directory = MembershipDirectory::new(hierarchy.clone(), bindings.clone());
        if let Some(keys) = &self.admin_role_keys {
            directory = directory.with_admin_role_keys(keys.iter().cloned());
        }
        for project in &self.projects {
            if let Some(owner) = project.owner {
                directory = directory.with_owner(project.id, owner);
            }
        }

        Ok(Workspace {
            hierarchy,
            project_names,
            roles,
            bindings,
            policies,
            directory,
        })
    }
}

fn role_from_def(def: &RoleDef, catalog: &EventCatalog) -> Result<Role, AtriumError> {
    let allowed = resolve_types(&def.allowed_event_types, catalog)?;
    let mut role = Role::new(def.id, def.key.clone(), allowed);
    if let Some(name) = &def.display_name {
        role = role.with_display_name(name.clone());
    }
    Ok(role)
}

fn resolve_types(keys: &[String], catalog: &EventCatalog) -> Result<Vec<EventType>, AtriumError> {
    catalog
        .resolve_all(keys.iter().map(String::as_str))
        .map_err(|e| AtriumError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_events::catalog;

    const WORKSPACE: &str = r#"
        [[organisations]]
        id = "00000000-0000-0000-0000-000000000001"
        name = "Acme"

        [[organisations]]
        id = "00000000-0000-0000-0000-000000000002"
        name = "Acme Labs"
        parent = "00000000-0000-0000-0000-000000000001"

        [[projects]]
        id = "00000000-0000-0000-0000-0000000000a1"
        name = "Alpha"
        organisation = "00000000-0000-0000-0000-000000000002"
        owner = "00000000-0000-0000-0000-0000000000f1"

        [[roles]]
        id = "00000000-0000-0000-0000-0000000000b1"
        key = "admin"
        allowed_event_types = ["project:role_assigned", "project:role_revoked"]

        [[roles]]
        id = "00000000-0000-0000-0000-0000000000b2"
        key = "editor"
        display_name = "Editor"
        allowed_event_types = ["project:title_changed"]

        [[bindings]]
        actor = "00000000-0000-0000-0000-0000000000c1"
        role = "admin"
        scope = "organisation:00000000-0000-0000-0000-000000000001"

        [[bindings]]
        actor = "00000000-0000-0000-0000-0000000000c2"
        role = "editor"
        scope = "project:00000000-0000-0000-0000-0000000000a1"

        [[policies]]
        name = "Membership changes need an admin"
        scope = "organisation:00000000-0000-0000-0000-000000000001"
        event_types = ["project:role_assigned"]
        action = "request_approval"
        recipients = { dynamic_groups = ["org_admins"], project_roles = ["editor"] }
    "#;

    #[test]
    fn parses_and_validates_a_workspace() {
        let workspace = parse_workspace(WORKSPACE).unwrap().validate(catalog()).unwrap();
        assert_eq!(workspace.roles.len(), 2);
        assert_eq!(workspace.role_by_key("editor").unwrap().display_name, "Editor");
        assert_eq!(workspace.bindings.len(), 2);
        assert_eq!(workspace.policies.len(), 1);
        assert!(workspace.policies[0].enabled);
        assert_eq!(workspace.policies[0].recipients.project_role_ids.len(), 1);

        let project: Scope = "project:00000000-0000-0000-0000-0000000000a1".parse().unwrap();
        assert_eq!(workspace.policies_for(project, true).len(), 1);
        assert!(workspace.policies_for(project, false).is_empty());
    }

    #[test]
    fn unknown_event_type_fails_validation() {
        let broken = WORKSPACE.replace("project:title_changed", "project:budget_changed");
        let err = parse_workspace(&broken).unwrap().validate(catalog()).unwrap_err();
        assert!(err.to_string().contains("unknown event type: project:budget_changed"));
    }

    #[test]
    fn unknown_role_key_fails_validation() {
        let broken = WORKSPACE.replace("role = \"editor\"", "role = \"owner\"");
        let err = parse_workspace(&broken).unwrap().validate(catalog()).unwrap_err();
        assert!(err.to_string().contains("unknown role key 'owner'"));
    }

    #[test]
    fn undeclared_binding_scope_fails_validation() {
        let broken = WORKSPACE.replace(
            "scope = \"project:00000000-0000-0000-0000-0000000000a1\"",
            "scope = \"project:00000000-0000-0000-0000-0000000000a9\"",
        );
        let err = parse_workspace(&broken).unwrap().validate(catalog()).unwrap_err();
        assert!(err.to_string().contains("is not declared"));
    }

    #[test]
    fn undeclared_policy_scope_fails_validation() {
        let broken = WORKSPACE.replace(
            "scope = \"organisation:00000000-0000-0000-0000-000000000001\"\n        event_types",
            "scope = \"organisation:00000000-0000-0000-0000-000000000009\"\n        event_types",
        );
        assert_ne!(broken, WORKSPACE);
        let err = parse_workspace(&broken).unwrap().validate(catalog()).unwrap_err();
        assert!(err.to_string().contains("is not declared"));
    }

    #[test]
    fn project_under_unknown_organisation_fails_validation() {
        let broken = WORKSPACE.replace(
            "organisation = \"00000000-0000-0000-0000-000000000002\"",
            "organisation = \"00000000-0000-0000-0000-000000000009\"",
        );
        let err = parse_workspace(&broken).unwrap().validate(catalog()).unwrap_err();
        assert!(err.to_string().contains("unknown organisation"));
    }

    #[test]
    fn parent_cycle_fails_validation() {
        let broken = WORKSPACE.replace(
            "name = \"Acme\"\n",
            "name = \"Acme\"\n        parent = \"00000000-0000-0000-0000-000000000002\"\n",
        );
        assert_ne!(broken, WORKSPACE);
        let err = parse_workspace(&broken).unwrap().validate(catalog()).unwrap_err();
        assert!(err.to_string().contains("is its own ancestor"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(parse_workspace("colour = \"blue\"").is_err());
    }
}
