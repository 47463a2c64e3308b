//! Typed payloads, one struct per catalog entry.
//!
//! Payloads are stored separately from their type key, so each struct is the
//! bare field set. Optional display fields use `#[serde(default)]` so older
//! payloads without them still decode.

use atrium_common::{ActorId, OrganisationId, RoleId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::catalog::EventType;
use crate::error::EventError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleChanged {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DescriptionChanged {
    pub description: String,
}

/// `website: null` clears the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WebsiteChanged {
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisibilityChanged {
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoleAssigned {
    #[serde(alias = "person")]
    pub person_id: ActorId,
    #[serde(alias = "role")]
    pub role_id: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RoleRevoked {
    #[serde(alias = "person")]
    pub person_id: ActorId,
    #[serde(alias = "role")]
    pub role_id: RoleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductAttached {
    pub product_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProductDetached {
    pub product_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OrganisationAttached {
    pub organisation_id: OrganisationId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OrganisationDetached {
    pub organisation_id: OrganisationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Free-text note. Recorded in history, no effect on the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NoteAdded {
    pub details: String,
}

/// A decoded project event: type and payload together.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectEvent {
    TitleChanged(TitleChanged),
    DescriptionChanged(DescriptionChanged),
    WebsiteChanged(WebsiteChanged),
    VisibilityChanged(VisibilityChanged),
    RoleAssigned(RoleAssigned),
    RoleRevoked(RoleRevoked),
    ProductAttached(ProductAttached),
    ProductDetached(ProductDetached),
    OrganisationAttached(OrganisationAttached),
    OrganisationDetached(OrganisationDetached),
    NoteAdded(NoteAdded),
}

impl ProjectEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            ProjectEvent::TitleChanged(_) => EventType::TitleChanged,
            ProjectEvent::DescriptionChanged(_) => EventType::DescriptionChanged,
            ProjectEvent::WebsiteChanged(_) => EventType::WebsiteChanged,
            ProjectEvent::VisibilityChanged(_) => EventType::VisibilityChanged,
            ProjectEvent::RoleAssigned(_) => EventType::RoleAssigned,
            ProjectEvent::RoleRevoked(_) => EventType::RoleRevoked,
            ProjectEvent::ProductAttached(_) => EventType::ProductAttached,
            ProjectEvent::ProductDetached(_) => EventType::ProductDetached,
            ProjectEvent::OrganisationAttached(_) => EventType::OrganisationAttached,
            ProjectEvent::OrganisationDetached(_) => EventType::OrganisationDetached,
            ProjectEvent::NoteAdded(_) => EventType::NoteAdded,
        }
    }

    /// Decode a payload according to its type.
    pub fn decode(event_type: EventType, payload: &Value) -> Result<Self, EventError> {
        let malformed = |source| EventError::MalformedPayload {
            event_type: event_type.key().to_string(),
            source,
        };
        let p = payload.clone();
        let event = match event_type {
            EventType::TitleChanged => {
                ProjectEvent::TitleChanged(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::DescriptionChanged => {
                ProjectEvent::DescriptionChanged(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::WebsiteChanged => {
                ProjectEvent::WebsiteChanged(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::VisibilityChanged => {
                ProjectEvent::VisibilityChanged(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::RoleAssigned => {
                ProjectEvent::RoleAssigned(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::RoleRevoked => {
                ProjectEvent::RoleRevoked(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::ProductAttached => {
                ProjectEvent::ProductAttached(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::ProductDetached => {
                ProjectEvent::ProductDetached(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::OrganisationAttached => {
                ProjectEvent::OrganisationAttached(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::OrganisationDetached => {
                ProjectEvent::OrganisationDetached(serde_json::from_value(p).map_err(malformed)?)
            }
            EventType::NoteAdded => {
                ProjectEvent::NoteAdded(serde_json::from_value(p).map_err(malformed)?)
            }
        };
        Ok(event)
    }

    /// Serialize the payload half (the type key travels separately).
    pub fn to_payload(&self) -> Value {
        let value = match self {
            ProjectEvent::TitleChanged(p) => serde_json::to_value(p),
            ProjectEvent::DescriptionChanged(p) => serde_json::to_value(p),
            ProjectEvent::WebsiteChanged(p) => serde_json::to_value(p),
            ProjectEvent::VisibilityChanged(p) => serde_json::to_value(p),
            ProjectEvent::RoleAssigned(p) => serde_json::to_value(p),
            ProjectEvent::RoleRevoked(p) => serde_json::to_value(p),
            ProjectEvent::ProductAttached(p) => serde_json::to_value(p),
            ProjectEvent::ProductDetached(p) => serde_json::to_value(p),
            ProjectEvent::OrganisationAttached(p) => serde_json::to_value(p),
            ProjectEvent::OrganisationDetached(p) => serde_json::to_value(p),
            ProjectEvent::NoteAdded(p) => serde_json::to_value(p),
        };
        value.expect("ProjectEvent payload serialization should never fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_respects_type() {
        let payload = json!({ "title": "Beta" });
        let event = ProjectEvent::decode(EventType::TitleChanged, &payload).unwrap();
        assert_eq!(event, ProjectEvent::TitleChanged(TitleChanged { title: "Beta".into() }));
        assert_eq!(event.event_type(), EventType::TitleChanged);
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = ProjectEvent::decode(EventType::DescriptionChanged, &json!({ "title": "x" }))
            .unwrap_err();
        match err {
            EventError::MalformedPayload { event_type, .. } => {
                assert_eq!(event_type, "project:description_changed")
            }
            other => panic!("expected malformed payload, got {other:?}"),
        }
    }

    #[test]
    fn role_assigned_accepts_short_field_names() {
        let person = Uuid::new_v4();
        let role = Uuid::new_v4();
        let event = ProjectEvent::decode(
            EventType::RoleAssigned,
            &json!({ "person": person, "role": role }),
        )
        .unwrap();
        let ProjectEvent::RoleAssigned(p) = event else {
            panic!("wrong variant");
        };
        assert_eq!(p.person_id, person);
        assert_eq!(p.role_id, role);
        assert!(p.person_name.is_none());
    }

    #[test]
    fn to_payload_omits_the_type_key() {
        let event = ProjectEvent::NoteAdded(NoteAdded { details: "kickoff".into() });
        assert_eq!(event.to_payload(), json!({ "details": "kickoff" }));
    }
}
