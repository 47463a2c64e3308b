//! Catalog and renderer contract tests.
//!
//! Every registered type must decode a sample payload, expose a schema, and
//! render through a strategy. The exhaustive `sample` match fails to compile
//! when a type is added without a fixture here.

use atrium_events::{
    catalog, render, resolve_renderer, DescriptionChanged, DisplayHints, Event, EventStatus,
    EventType, NoteAdded, OrganisationAttached, OrganisationDetached, ProductAttached,
    ProductDetached, ProjectEvent, RoleAssigned, RoleRevoked, TitleChanged, Visibility,
    VisibilityChanged, WebsiteChanged,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

fn sample(event_type: EventType) -> ProjectEvent {
    match event_type {
        EventType::TitleChanged => ProjectEvent::TitleChanged(TitleChanged { title: "Orchard".into() }),
        EventType::DescriptionChanged => ProjectEvent::DescriptionChanged(DescriptionChanged {
            description: "Fruit trees".into(),
        }),
        EventType::WebsiteChanged => ProjectEvent::WebsiteChanged(WebsiteChanged {
            website: Some("https://orchard.example".into()),
        }),
        EventType::VisibilityChanged => ProjectEvent::VisibilityChanged(VisibilityChanged {
            visibility: Visibility::Public,
        }),
        EventType::RoleAssigned => ProjectEvent::RoleAssigned(RoleAssigned {
            person_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            person_name: Some("Sam".into()),
            role_name: Some("Editor".into()),
        }),
        EventType::RoleRevoked => ProjectEvent::RoleRevoked(RoleRevoked {
            person_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            person_name: Some("Sam".into()),
        }),
        EventType::ProductAttached => ProjectEvent::ProductAttached(ProductAttached {
            product_id: Uuid::new_v4(),
            name: "Apple press".into(),
        }),
        EventType::ProductDetached => ProjectEvent::ProductDetached(ProductDetached {
            product_id: Uuid::new_v4(),
            name: Some("Apple press".into()),
        }),
        EventType::OrganisationAttached => ProjectEvent::OrganisationAttached(OrganisationAttached {
            organisation_id: Uuid::new_v4(),
            name: "Riverside".into(),
        }),
        EventType::OrganisationDetached => ProjectEvent::OrganisationDetached(OrganisationDetached {
            organisation_id: Uuid::new_v4(),
            name: None,
        }),
        EventType::NoteAdded => ProjectEvent::NoteAdded(NoteAdded {
            details: "Pruning day moved to Saturday".into(),
        }),
    }
}

fn stored(event_type: &str, payload: serde_json::Value) -> Event {
    Event {
        id: Uuid::new_v4(),
        event_type: event_type.into(),
        payload,
        actor_id: Uuid::new_v4(),
        entity_id: Uuid::new_v4(),
        created_at: Utc::now(),
        status: EventStatus::Pending,
        display: DisplayHints {
            actor_name: Some("Dana".into()),
            ..DisplayHints::default()
        },
    }
}

// =========================================================================
// Catalog
// =========================================================================

#[test]
fn every_entry_decodes_its_sample_payload() {
    for info in catalog().list_event_types() {
        let event = sample(info.event_type);
        assert_eq!(event.event_type(), info.event_type);

        let decoded = ProjectEvent::decode(info.event_type, &event.to_payload()).unwrap();
        assert_eq!(decoded, event, "{} did not survive its own payload", info.key());
    }
}

#[test]
fn every_entry_has_a_name_and_an_object_schema() {
    for info in catalog().list_event_types() {
        assert!(!info.friendly_name.is_empty());
        assert!(info.key().starts_with("project:"));
        let schema = serde_json::to_value(&info.payload_shape).unwrap();
        assert_eq!(schema["type"], "object", "{} schema is not an object", info.key());
    }
}

#[test]
fn listing_serializes_with_wire_field_names() {
    let listing = serde_json::to_value(catalog().list_event_types()).unwrap();
    let first = &listing[0];
    assert!(first.get("type").is_some());
    assert!(first.get("friendlyName").is_some());
    assert!(first.get("payloadShape").is_some());
}

// =========================================================================
// Renderer dispatch
// =========================================================================

#[test]
fn every_entry_renders_with_its_friendly_label() {
    for info in catalog().list_event_types() {
        let event = stored(info.key(), sample(info.event_type).to_payload());
        let rendered = render(&event);
        assert_eq!(rendered.label, info.friendly_name);
        assert!(rendered.summary.starts_with("Dana"), "{}: {}", info.key(), rendered.summary);
        assert!(rendered.pending);
    }
}

#[test]
fn unknown_types_fall_back_to_the_generic_renderer() {
    let event = stored("project:budget_changed", json!({ "details": "Raised to 1200" }));
    let rendered = resolve_renderer(&event.event_type).render(&event);

    assert_eq!(rendered.label, "Budget changed");
    assert_eq!(rendered.details.as_deref(), Some("Raised to 1200"));
    assert_eq!(rendered.actor_name.as_deref(), Some("Dana"));
}

#[test]
fn malformed_known_payload_still_renders() {
    let event = stored("project:title_changed", json!({ "heading": 7 }));
    let rendered = render(&event);
    assert_eq!(rendered.label, EventType::TitleChanged.friendly_name());
    assert!(!rendered.summary.is_empty());
}
