//! Renderer dispatch: event type → presentation strategy.
//!
//! Strategies read only the event itself (payload + display hints). Any type
//! without a dedicated strategy, including types this build has never heard
//! of, goes to `GenericRenderer`.

use serde::Serialize;
use tracing::debug;

use crate::catalog::EventType;
use crate::payloads::{ProjectEvent, Visibility};
use crate::types::Event;

/// What a history feed shows for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEvent {
    pub label: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    pub pending: bool,
}

pub trait RenderStrategy: Send + Sync {
    fn label(&self, event: &Event) -> String;

    fn summary(&self, event: &Event) -> String;

    fn details(&self, _event: &Event) -> Option<String> {
        None
    }

    fn render(&self, event: &Event) -> RenderedEvent {
        RenderedEvent {
            label: self.label(event),
            summary: self.summary(event),
            details: self.details(event),
            actor_name: event.display.actor_name.clone(),
            actor_avatar: event.display.actor_avatar.clone(),
            entity_name: event.display.entity_name.clone(),
            pending: event.is_pending(),
        }
    }
}

/// Pick the strategy for `event_type`. Never fails.
pub fn resolve_renderer(event_type: &str) -> &'static dyn RenderStrategy {
    match EventType::from_key(event_type) {
        Ok(
            EventType::TitleChanged
            | EventType::DescriptionChanged
            | EventType::WebsiteChanged
            | EventType::VisibilityChanged,
        ) => &FieldChangeRenderer,
        Ok(EventType::RoleAssigned | EventType::RoleRevoked) => &MembershipRenderer,
        Ok(
            EventType::ProductAttached
            | EventType::ProductDetached
            | EventType::OrganisationAttached
            | EventType::OrganisationDetached,
        ) => &RelationshipRenderer,
        Ok(EventType::NoteAdded) => &GenericRenderer,
        Err(_) => {
            debug!(event_type, "No renderer registered, using generic fallback");
            &GenericRenderer
        }
    }
}

/// Render with whichever strategy the event's type resolves to.
pub fn render(event: &Event) -> RenderedEvent {
    resolve_renderer(&event.event_type).render(event)
}

/// Human label derived from a type key: `project:role_assigned` → `Role assigned`.
pub fn humanize_event_type(event_type: &str) -> String {
    let bare = event_type
        .rsplit([':', '/', '.'])
        .next()
        .unwrap_or(event_type);
    let spaced: String = bare
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect();
    let trimmed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => event_type.to_string(),
    }
}

fn actor_label(event: &Event) -> String {
    event
        .display
        .actor_name
        .clone()
        .unwrap_or_else(|| "Someone".to_string())
}

fn friendly_or_humanized(event: &Event) -> String {
    event
        .kind()
        .map(|t| t.friendly_name().to_string())
        .unwrap_or_else(|_| humanize_event_type(&event.event_type))
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Default strategy. Label from the type key, body from the payload's free-text
/// `details` field or, failing that, the raw payload.
pub struct GenericRenderer;

impl RenderStrategy for GenericRenderer {
    fn label(&self, event: &Event) -> String {
        friendly_or_humanized(event)
    }

    fn summary(&self, event: &Event) -> String {
        format!(
            "{} recorded {}",
            actor_label(event),
            humanize_event_type(&event.event_type).to_lowercase()
        )
    }

    fn details(&self, event: &Event) -> Option<String> {
        match event.payload.get("details").and_then(|d| d.as_str()) {
            Some(text) => Some(text.to_string()),
            None if event.payload.is_null() => None,
            None => Some(event.payload.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Scalar fields
// ---------------------------------------------------------------------------

pub struct FieldChangeRenderer;

impl RenderStrategy for FieldChangeRenderer {
    fn label(&self, event: &Event) -> String {
        friendly_or_humanized(event)
    }

    fn summary(&self, event: &Event) -> String {
        let who = actor_label(event);
        match event.decode() {
            Ok(ProjectEvent::TitleChanged(p)) => format!("{who} renamed the project to \"{}\"", p.title),
            Ok(ProjectEvent::DescriptionChanged(_)) => format!("{who} updated the description"),
            Ok(ProjectEvent::WebsiteChanged(p)) => match p.website {
                Some(url) => format!("{who} set the website to {url}"),
                None => format!("{who} removed the website"),
            },
            Ok(ProjectEvent::VisibilityChanged(p)) => {
                let v = match p.visibility {
                    Visibility::Public => "public",
                    Visibility::Private => "private",
                };
                format!("{who} made the project {v}")
            }
            _ => GenericRenderer.summary(event),
        }
    }

    fn details(&self, event: &Event) -> Option<String> {
        match event.decode() {
            Ok(ProjectEvent::DescriptionChanged(p)) => Some(p.description),
            Ok(_) => None,
            Err(_) => GenericRenderer.details(event),
        }
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

pub struct MembershipRenderer;

impl RenderStrategy for MembershipRenderer {
    fn label(&self, event: &Event) -> String {
        friendly_or_humanized(event)
    }

    fn summary(&self, event: &Event) -> String {
        let who = actor_label(event);
        match event.decode() {
            Ok(ProjectEvent::RoleAssigned(p)) => {
                let person = p.person_name.unwrap_or_else(|| p.person_id.to_string());
                let role = p.role_name.unwrap_or_else(|| "a role".to_string());
                format!("{who} gave {person} {role}")
            }
            Ok(ProjectEvent::RoleRevoked(p)) => {
                let person = p.person_name.unwrap_or_else(|| p.person_id.to_string());
                format!("{who} removed a role from {person}")
            }
            _ => GenericRenderer.summary(event),
        }
    }
}

// ---------------------------------------------------------------------------
// Products and organisations
// ---------------------------------------------------------------------------

pub struct RelationshipRenderer;

impl RenderStrategy for RelationshipRenderer {
    fn label(&self, event: &Event) -> String {
        friendly_or_humanized(event)
    }

    fn summary(&self, event: &Event) -> String {
        let who = actor_label(event);
        match event.decode() {
            Ok(ProjectEvent::ProductAttached(p)) => format!("{who} attached product {}", p.name),
            Ok(ProjectEvent::ProductDetached(p)) => format!(
                "{who} detached product {}",
                p.name.unwrap_or_else(|| p.product_id.to_string())
            ),
            Ok(ProjectEvent::OrganisationAttached(p)) => {
                format!("{who} linked organisation {}", p.name)
            }
            Ok(ProjectEvent::OrganisationDetached(p)) => format!(
                "{who} unlinked organisation {}",
                p.name.unwrap_or_else(|| p.organisation_id.to_string())
            ),
            _ => GenericRenderer.summary(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DisplayHints, EventStatus};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn event(event_type: &str, payload: serde_json::Value) -> Event {
        Event {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            payload,
            actor_id: Uuid::new_v4(),
            entity_id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: EventStatus::Pending,
            display: DisplayHints {
                actor_name: Some("Ada".into()),
                actor_avatar: Some("https://img/ada.png".into()),
                entity_name: Some("Alpha".into()),
            },
        }
    }

    #[test]
    fn humanize_strips_namespace_and_separators() {
        assert_eq!(humanize_event_type("project:budget_line-added"), "Budget line added");
        assert_eq!(humanize_event_type("billing/invoice_sent"), "Invoice sent");
        assert_eq!(humanize_event_type("plain"), "Plain");
    }

    #[test]
    fn unknown_type_falls_back_to_generic() {
        let e = event("project:budget_changed", json!({ "details": "raised to 10k" }));
        let rendered = render(&e);
        assert_eq!(rendered.label, "Budget changed");
        assert_eq!(rendered.details.as_deref(), Some("raised to 10k"));
        assert_eq!(rendered.actor_name.as_deref(), Some("Ada"));
        assert!(rendered.pending);
    }

    #[test]
    fn generic_details_fall_back_to_raw_payload() {
        let e = event("ops:reindexed", json!({ "count": 3 }));
        assert_eq!(render(&e).details.as_deref(), Some(r#"{"count":3}"#));
    }

    #[test]
    fn title_change_renders_new_title() {
        let e = event("project:title_changed", json!({ "title": "Beta" }));
        let rendered = render(&e);
        assert_eq!(rendered.label, "Title changed");
        assert_eq!(rendered.summary, "Ada renamed the project to \"Beta\"");
        assert_eq!(rendered.entity_name.as_deref(), Some("Alpha"));
    }

    #[test]
    fn malformed_known_type_still_renders() {
        let e = event("project:role_assigned", json!({ "person": "not-a-uuid" }));
        let rendered = render(&e);
        assert_eq!(rendered.label, "Role assigned");
        assert_eq!(rendered.summary, "Ada recorded role assigned");
    }

    #[test]
    fn note_uses_details_field() {
        let e = event("project:note_added", json!({ "details": "Kickoff moved" }));
        assert_eq!(render(&e).details.as_deref(), Some("Kickoff moved"));
    }
}
