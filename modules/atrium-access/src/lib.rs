//! Access and policy engine.
//!
//! Two independent questions:
//! - may this actor emit this event type here? (`allowed_event_types`)
//! - once emitted, does it need approval and who is told? (`evaluate`)
//!
//! Both are pure over already-resolved inputs. Membership lookups go through
//! `RecipientDirectory`, which the caller supplies.

pub mod directory;
pub mod hierarchy;
pub mod policy;
pub mod role;
pub mod workspace;

pub use directory::{DirectoryError, DynamicGroup, MembershipDirectory, RecipientDirectory};
pub use hierarchy::OrgHierarchy;
pub use policy::{evaluate, fallback_approvers, Evaluation, EvaluationOptions, Policy, PolicyAction, Recipients, Subject};
pub use role::{allowed_event_types, revoke_binding, Role, RoleBinding};
pub use workspace::{load_workspace, parse_workspace, Workspace, WorkspaceFile};
