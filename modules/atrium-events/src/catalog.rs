//! Event type catalog: the single registry of project event types.
//!
//! Reducers, renderers, role editors and policy editors enumerate this table.
//! Adding a mutation kind means adding one `EventType` variant, its payload
//! struct, and one row in each `match` below; the compiler finds the rest.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EventError;
use crate::payloads::*;

/// Every event type a project can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    TitleChanged,
    DescriptionChanged,
    WebsiteChanged,
    VisibilityChanged,
    RoleAssigned,
    RoleRevoked,
    ProductAttached,
    ProductDetached,
    OrganisationAttached,
    OrganisationDetached,
    NoteAdded,
}

impl EventType {
    /// Declaration order. This is the order the catalog lists types in.
    pub const ALL: [EventType; 11] = [
        EventType::TitleChanged,
        EventType::DescriptionChanged,
        EventType::WebsiteChanged,
        EventType::VisibilityChanged,
        EventType::RoleAssigned,
        EventType::RoleRevoked,
        EventType::ProductAttached,
        EventType::ProductDetached,
        EventType::OrganisationAttached,
        EventType::OrganisationDetached,
        EventType::NoteAdded,
    ];

    /// Stable key stored in the `event_type` field of every event.
    pub fn key(&self) -> &'static str {
        match self {
            EventType::TitleChanged => "project:title_changed",
            EventType::DescriptionChanged => "project:description_changed",
            EventType::WebsiteChanged => "project:website_changed",
            EventType::VisibilityChanged => "project:visibility_changed",
            EventType::RoleAssigned => "project:role_assigned",
            EventType::RoleRevoked => "project:role_revoked",
            EventType::ProductAttached => "project:product_attached",
            EventType::ProductDetached => "project:product_detached",
            EventType::OrganisationAttached => "project:organisation_attached",
            EventType::OrganisationDetached => "project:organisation_detached",
            EventType::NoteAdded => "project:note_added",
        }
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            EventType::TitleChanged => "Title changed",
            EventType::DescriptionChanged => "Description changed",
            EventType::WebsiteChanged => "Website changed",
            EventType::VisibilityChanged => "Visibility changed",
            EventType::RoleAssigned => "Role assigned",
            EventType::RoleRevoked => "Role revoked",
            EventType::ProductAttached => "Product attached",
            EventType::ProductDetached => "Product detached",
            EventType::OrganisationAttached => "Organisation attached",
            EventType::OrganisationDetached => "Organisation detached",
            EventType::NoteAdded => "Note added",
        }
    }

    /// JSON schema of the payload this type carries.
    pub fn payload_schema(&self) -> RootSchema {
        match self {
            EventType::TitleChanged => schema_for!(TitleChanged),
            EventType::DescriptionChanged => schema_for!(DescriptionChanged),
            EventType::WebsiteChanged => schema_for!(WebsiteChanged),
            EventType::VisibilityChanged => schema_for!(VisibilityChanged),
            EventType::RoleAssigned => schema_for!(RoleAssigned),
            EventType::RoleRevoked => schema_for!(RoleRevoked),
            EventType::ProductAttached => schema_for!(ProductAttached),
            EventType::ProductDetached => schema_for!(ProductDetached),
            EventType::OrganisationAttached => schema_for!(OrganisationAttached),
            EventType::OrganisationDetached => schema_for!(OrganisationDetached),
            EventType::NoteAdded => schema_for!(NoteAdded),
        }
    }

    pub fn from_key(key: &str) -> Result<Self, EventError> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.key() == key)
            .ok_or_else(|| EventError::UnknownEventType(key.to_string()))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::from_key(s)
    }
}

impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        EventType::from_key(&key).map_err(serde::de::Error::custom)
    }
}

/// One catalog row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTypeInfo {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub friendly_name: &'static str,
    pub payload_shape: RootSchema,
}

impl EventTypeInfo {
    pub fn key(&self) -> &'static str {
        self.event_type.key()
    }
}

/// Immutable catalog table. Built once, shared read-only.
#[derive(Debug, Clone)]
pub struct EventCatalog {
    entries: Vec<EventTypeInfo>,
}

static CATALOG: LazyLock<EventCatalog> = LazyLock::new(EventCatalog::standard);

/// The process-wide catalog.
pub fn catalog() -> &'static EventCatalog {
    &CATALOG
}

impl EventCatalog {
    /// The catalog of every type this build knows about.
    pub fn standard() -> Self {
        Self::with_types(&EventType::ALL)
    }

    /// A catalog restricted to `types`, in the order given. Duplicates are dropped.
    pub fn with_types(types: &[EventType]) -> Self {
        let mut entries: Vec<EventTypeInfo> = Vec::with_capacity(types.len());
        for &event_type in types {
            if entries.iter().any(|e| e.event_type == event_type) {
                continue;
            }
            entries.push(EventTypeInfo {
                event_type,
                friendly_name: event_type.friendly_name(),
                payload_shape: event_type.payload_schema(),
            });
        }
        Self { entries }
    }

    pub fn list_event_types(&self) -> &[EventTypeInfo] {
        &self.entries
    }

    pub fn lookup(&self, key: &str) -> Result<&EventTypeInfo, EventError> {
        self.entries
            .iter()
            .find(|e| e.key() == key)
            .ok_or_else(|| EventError::UnknownEventType(key.to_string()))
    }

    /// Resolve a key to its type. Keys outside this catalog are a caller error.
    pub fn resolve(&self, key: &str) -> Result<EventType, EventError> {
        self.lookup(key).map(|info| info.event_type)
    }

    /// Validate a list of keys (from a role or policy definition).
    pub fn resolve_all<'a, I>(&self, keys: I) -> Result<Vec<EventType>, EventError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter().map(|k| self.resolve(k)).collect()
    }
}
