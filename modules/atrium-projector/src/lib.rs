//! Optimistic read views for projects.
//!
//! `project(snapshot, events)` overlays pending events on the last confirmed
//! snapshot. Every consumer that needs "what the project looks like including
//! my unapproved changes" goes through here.

pub mod projector;
pub mod reducer;
pub mod snapshot;

pub use projector::{project, Outcome, ProjectionReport, Projector};
pub use reducer::{reduce, ApplyResult, Origin};
pub use snapshot::{EntitySnapshot, MemberEntry, OrganisationEntry, ProductEntry};
