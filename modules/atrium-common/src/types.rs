use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AtriumError;

pub type ActorId = Uuid;
pub type EventId = Uuid;
pub type EntityId = Uuid;
pub type OrganisationId = Uuid;
pub type RoleId = Uuid;
pub type PolicyId = Uuid;

/// The subtree a role binding or policy applies to.
///
/// Projects are leaves; organisations form a tree and own projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Scope {
    Project(EntityId),
    Organisation(OrganisationId),
}

impl Scope {
    pub fn id(&self) -> Uuid {
        match self {
            Scope::Project(id) | Scope::Organisation(id) => *id,
        }
    }

    pub fn is_project(&self) -> bool {
        matches!(self, Scope::Project(_))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Project(id) => write!(f, "project:{id}"),
            Scope::Organisation(id) => write!(f, "organisation:{id}"),
        }
    }
}

/// Parses `project:<uuid>`, `organisation:<uuid>` or the short `org:<uuid>`.
impl FromStr for Scope {
    type Err = AtriumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| AtriumError::Validation(format!("scope '{s}' is missing a kind prefix")))?;
        let id = Uuid::parse_str(id.trim())
            .map_err(|e| AtriumError::Validation(format!("scope '{s}' has an invalid id: {e}")))?;
        match kind.trim() {
            "project" => Ok(Scope::Project(id)),
            "organisation" | "organization" | "org" => Ok(Scope::Organisation(id)),
            other => Err(AtriumError::Validation(format!("unknown scope kind '{other}'"))),
        }
    }
}
