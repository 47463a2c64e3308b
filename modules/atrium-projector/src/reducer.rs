//! Per-type reducers. One match arm per catalog entry.
//!
//! Reducers never read anything but the snapshot and the payload, never
//! generate ids and never look at the clock.

use atrium_common::EventId;
use atrium_events::{
    OrganisationAttached, ProductAttached, ProjectEvent, RoleAssigned,
};

use crate::snapshot::{EntitySnapshot, MemberEntry, OrganisationEntry, ProductEntry};

/// Whether an event is being folded optimistically or confirmed by the store of record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Not yet approved. Added entries are flagged pending.
    Pending(EventId),
    /// Approved. Added entries are authoritative.
    Confirmed,
}

impl Origin {
    fn pending_event_id(&self) -> Option<EventId> {
        match self {
            Origin::Pending(id) => Some(*id),
            Origin::Confirmed => None,
        }
    }
}

/// Result of applying a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The event changed the snapshot.
    Applied,
    /// The event is valid but changes nothing (informational, or already reflected).
    NoOp,
}

/// Apply `event` to `state` in place. Callers hand in a working copy.
pub fn reduce(state: &mut EntitySnapshot, event: &ProjectEvent, origin: Origin) -> ApplyResult {
    match event {
        // ---------------------------------------------------------
        // Scalar fields, last write wins
        // ---------------------------------------------------------
        ProjectEvent::TitleChanged(p) => set_field(&mut state.title, p.title.clone()),
        ProjectEvent::DescriptionChanged(p) => {
            set_field(&mut state.description, p.description.clone())
        }
        ProjectEvent::WebsiteChanged(p) => set_field(&mut state.website, p.website.clone()),
        ProjectEvent::VisibilityChanged(p) => set_field(&mut state.visibility, p.visibility),

        // ---------------------------------------------------------
        // Membership
        // ---------------------------------------------------------
        ProjectEvent::RoleAssigned(p) => assign_role(state, p, origin),
        ProjectEvent::RoleRevoked(p) => retain(&mut state.members, |m| {
            !(m.person_id == p.person_id && m.role_id == p.role_id)
        }),

        // ---------------------------------------------------------
        // Products and organisations
        // ---------------------------------------------------------
        ProjectEvent::ProductAttached(p) => attach_product(state, p, origin),
        ProjectEvent::ProductDetached(p) => {
            retain(&mut state.products, |e| e.product_id != p.product_id)
        }
        ProjectEvent::OrganisationAttached(p) => attach_organisation(state, p, origin),
        ProjectEvent::OrganisationDetached(p) => retain(&mut state.organisations, |e| {
            e.organisation_id != p.organisation_id
        }),

        // ---------------------------------------------------------
        // History only
        // ---------------------------------------------------------
        ProjectEvent::NoteAdded(_) => ApplyResult::NoOp,
    }
}

fn set_field<T: PartialEq>(field: &mut T, value: T) -> ApplyResult {
    if *field == value {
        return ApplyResult::NoOp;
    }
    *field = value;
    ApplyResult::Applied
}

fn retain<T>(entries: &mut Vec<T>, keep: impl FnMut(&T) -> bool) -> ApplyResult {
    let before = entries.len();
    entries.retain(keep);
    if entries.len() == before {
        ApplyResult::NoOp
    } else {
        ApplyResult::Applied
    }
}

/// Confirming a pending entry with the same identity key promotes it in place.
/// Any other existing entry with that key makes the assignment a no-op.
fn promote<T>(
    existing: Option<&mut T>,
    origin: Origin,
    pending: impl Fn(&mut T) -> (&mut bool, &mut Option<EventId>),
) -> Option<ApplyResult> {
    let entry = existing?;
    let (is_pending, event_id) = pending(entry);
    if origin == Origin::Confirmed && *is_pending {
        *is_pending = false;
        *event_id = None;
        return Some(ApplyResult::Applied);
    }
    Some(ApplyResult::NoOp)
}

fn assign_role(state: &mut EntitySnapshot, p: &RoleAssigned, origin: Origin) -> ApplyResult {
    let existing = state
        .members
        .iter_mut()
        .find(|m| m.person_id == p.person_id && m.role_id == p.role_id);
    if let Some(result) = promote(existing, origin, |m| (&mut m.pending, &mut m.pending_event_id)) {
        return result;
    }

    state.members.push(MemberEntry {
        person_id: p.person_id,
        role_id: p.role_id,
        person_name: p.person_name.clone(),
        role_name: p.role_name.clone(),
        pending: origin != Origin::Confirmed,
        pending_event_id: origin.pending_event_id(),
    });
    ApplyResult::Applied
}

fn attach_product(state: &mut EntitySnapshot, p: &ProductAttached, origin: Origin) -> ApplyResult {
    let existing = state
        .products
        .iter_mut()
        .find(|e| e.product_id == p.product_id);
    if let Some(result) = promote(existing, origin, |e| (&mut e.pending, &mut e.pending_event_id)) {
        return result;
    }

    state.products.push(ProductEntry {
        product_id: p.product_id,
        name: p.name.clone(),
        pending: origin != Origin::Confirmed,
        pending_event_id: origin.pending_event_id(),
    });
    ApplyResult::Applied
}

fn attach_organisation(
    state: &mut EntitySnapshot,
    p: &OrganisationAttached,
    origin: Origin,
) -> ApplyResult {
    let existing = state
        .organisations
        .iter_mut()
        .find(|e| e.organisation_id == p.organisation_id);
    if let Some(result) = promote(existing, origin, |e| (&mut e.pending, &mut e.pending_event_id)) {
        return result;
    }

    state.organisations.push(OrganisationEntry {
        organisation_id: p.organisation_id,
        name: p.name.clone(),
        pending: origin != Origin::Confirmed,
        pending_event_id: origin.pending_event_id(),
    });
    ApplyResult::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use atrium_events::{NoteAdded, RoleRevoked, TitleChanged};
    use uuid::Uuid;

    fn snapshot() -> EntitySnapshot {
        EntitySnapshot::new(Uuid::new_v4(), "Alpha")
    }

    fn assigned(person: Uuid, role: Uuid) -> ProjectEvent {
        ProjectEvent::RoleAssigned(RoleAssigned {
            person_id: person,
            role_id: role,
            person_name: Some("Pat".into()),
            role_name: Some("Editor".into()),
        })
    }

    #[test]
    fn same_value_is_a_noop() {
        let mut s = snapshot();
        let e = ProjectEvent::TitleChanged(TitleChanged { title: "Alpha".into() });
        assert_eq!(reduce(&mut s, &e, Origin::Confirmed), ApplyResult::NoOp);
    }

    #[test]
    fn pending_assignment_is_flagged() {
        let mut s = snapshot();
        let event_id = Uuid::new_v4();
        let result = reduce(&mut s, &assigned(Uuid::new_v4(), Uuid::new_v4()), Origin::Pending(event_id));
        assert_eq!(result, ApplyResult::Applied);
        assert!(s.members[0].pending);
        assert_eq!(s.members[0].pending_event_id, Some(event_id));
        assert_eq!(s.confirmed_member_count(), 0);
    }

    #[test]
    fn confirming_promotes_the_pending_entry() {
        let mut s = snapshot();
        let (person, role) = (Uuid::new_v4(), Uuid::new_v4());
        reduce(&mut s, &assigned(person, role), Origin::Pending(Uuid::new_v4()));
        let result = reduce(&mut s, &assigned(person, role), Origin::Confirmed);
        assert_eq!(result, ApplyResult::Applied);
        assert_eq!(s.members.len(), 1);
        assert!(s.holds_role(person, role));
    }

    #[test]
    fn duplicate_assignment_is_a_noop() {
        let mut s = snapshot();
        let (person, role) = (Uuid::new_v4(), Uuid::new_v4());
        reduce(&mut s, &assigned(person, role), Origin::Confirmed);
        let again = reduce(&mut s, &assigned(person, role), Origin::Pending(Uuid::new_v4()));
        assert_eq!(again, ApplyResult::NoOp);
        assert_eq!(s.members.len(), 1);
    }

    #[test]
    fn revocation_filters_by_person_and_role() {
        let mut s = snapshot();
        let person = Uuid::new_v4();
        let (editor, viewer) = (Uuid::new_v4(), Uuid::new_v4());
        reduce(&mut s, &assigned(person, editor), Origin::Confirmed);
        reduce(&mut s, &assigned(person, viewer), Origin::Confirmed);
        let revoke = ProjectEvent::RoleRevoked(RoleRevoked {
            person_id: person,
            role_id: editor,
            person_name: None,
        });
        assert_eq!(reduce(&mut s, &revoke, Origin::Confirmed), ApplyResult::Applied);
        assert_eq!(s.members.len(), 1);
        assert_eq!(s.members[0].role_id, viewer);
        assert_eq!(reduce(&mut s, &revoke, Origin::Confirmed), ApplyResult::NoOp);
    }

    #[test]
    fn notes_do_not_touch_the_snapshot() {
        let mut s = snapshot();
        let before = s.clone();
        let e = ProjectEvent::NoteAdded(NoteAdded { details: "hello".into() });
        assert_eq!(reduce(&mut s, &e, Origin::Confirmed), ApplyResult::NoOp);
        assert_eq!(s, before);
    }
}
