//! The sample workspace under `demos/` loads and routes the way it reads.

use std::path::PathBuf;

use atrium_access::{allowed_event_types, evaluate, load_workspace, EvaluationOptions, Subject, Workspace};
use atrium_common::{ActorId, Scope};
use atrium_events::{catalog, EventType};
use uuid::Uuid;

fn demo_workspace() -> Workspace {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/atrium.toml");
    load_workspace(&path, catalog()).unwrap()
}

fn id(tail: &str) -> Uuid {
    format!("00000000-0000-0000-0000-{tail:0>12}").parse().unwrap()
}

fn orchard() -> Scope {
    Scope::Project(id("a1"))
}

fn admin() -> ActorId {
    id("c1")
}

fn editor() -> ActorId {
    id("c2")
}

#[test]
fn admin_inherits_membership_rights_from_the_root_organisation() {
    let ws = demo_workspace();
    let allowed = allowed_event_types(&ws.bindings, admin(), orchard(), &ws.hierarchy);
    assert!(allowed.contains(&EventType::RoleAssigned));
    assert!(!allowed.contains(&EventType::ProductAttached));
}

#[test]
fn editor_cannot_assign_roles() {
    let ws = demo_workspace();
    let allowed = allowed_event_types(&ws.bindings, editor(), orchard(), &ws.hierarchy);
    assert!(allowed.contains(&EventType::ProductAttached));
    assert!(!allowed.contains(&EventType::RoleAssigned));
}

#[test]
fn role_assignment_needs_the_root_admin() {
    let ws = demo_workspace();
    let subject = Subject::new(EventType::RoleAssigned, admin(), orchard());
    let evaluation = evaluate(
        &subject,
        &ws.policies_for(orchard(), true),
        &ws.hierarchy,
        &ws.directory,
        EvaluationOptions::default(),
    );

    assert!(evaluation.requires_approval);
    assert_eq!(evaluation.approvers.iter().copied().collect::<Vec<_>>(), vec![admin()]);
}

#[test]
fn product_changes_notify_members_and_owner() {
    let ws = demo_workspace();
    let subject = Subject::new(EventType::ProductAttached, editor(), orchard());
    let evaluation = evaluate(
        &subject,
        &ws.policies_for(orchard(), true),
        &ws.hierarchy,
        &ws.directory,
        EvaluationOptions::default(),
    );

    assert!(evaluation.apply_immediately);
    assert!(evaluation.notify.contains(&editor()));
    assert!(evaluation.notify.contains(&admin()));
    assert!(evaluation.approvers.is_empty());
}
