//! The confirmed project aggregate and its collection entries.

use atrium_common::{ActorId, EntityId, EventId, OrganisationId, RoleId};
use atrium_events::Visibility;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current confirmed state of a project, as read from the store of record.
///
/// A projected view has the same shape; entries added by pending events carry
/// `pending = true` and are excluded from the confirmed counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
    #[serde(default)]
    pub organisations: Vec<OrganisationEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub person_id: ActorId,
    pub role_id: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_event_id: Option<EventId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntry {
    pub product_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_event_id: Option<EventId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganisationEntry {
    pub organisation_id: OrganisationId,
    pub name: String,
    #[serde(default)]
    pub pending: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_event_id: Option<EventId>,
}

impl EntitySnapshot {
    pub fn new(id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            website: None,
            visibility: Visibility::default(),
            members: Vec::new(),
            products: Vec::new(),
            organisations: Vec::new(),
        }
    }

    pub fn confirmed_member_count(&self) -> usize {
        self.members.iter().filter(|m| !m.pending).count()
    }

    pub fn confirmed_product_count(&self) -> usize {
        self.products.iter().filter(|p| !p.pending).count()
    }

    pub fn confirmed_organisation_count(&self) -> usize {
        self.organisations.iter().filter(|o| !o.pending).count()
    }

    pub fn pending_members(&self) -> impl Iterator<Item = &MemberEntry> {
        self.members.iter().filter(|m| m.pending)
    }

    /// True if `person_id` holds `role_id` in a confirmed entry.
    pub fn holds_role(&self, person_id: ActorId, role_id: RoleId) -> bool {
        self.members
            .iter()
            .any(|m| !m.pending && m.person_id == person_id && m.role_id == role_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_ignore_pending_entries() {
        let mut snapshot = EntitySnapshot::new(Uuid::new_v4(), "Alpha");
        let person = Uuid::new_v4();
        let role = Uuid::new_v4();
        snapshot.members.push(MemberEntry {
            person_id: person,
            role_id: role,
            person_name: None,
            role_name: None,
            pending: true,
            pending_event_id: Some(Uuid::new_v4()),
        });
        assert_eq!(snapshot.confirmed_member_count(), 0);
        assert_eq!(snapshot.pending_members().count(), 1);
        assert!(!snapshot.holds_role(person, role));
    }

    #[test]
    fn minimal_json_snapshot_fills_defaults() {
        let id = Uuid::new_v4();
        let snapshot: EntitySnapshot =
            serde_json::from_value(serde_json::json!({ "id": id, "title": "Alpha" })).unwrap();
        assert_eq!(snapshot, EntitySnapshot::new(id, "Alpha"));
    }
}
