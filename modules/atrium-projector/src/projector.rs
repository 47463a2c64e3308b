//! Fold pending events onto a confirmed snapshot.
//!
//! The only place pending events are overlaid on a snapshot. Inputs are never
//! mutated: every fold works on a clone and returns it. No locks, no clock, no
//! I/O, so any number of readers can project concurrently.
//!
//! A single bad event never aborts a fold. Unknown types and malformed
//! payloads degrade to no-ops and are reported.

use atrium_common::{ActorId, EventId};
use atrium_events::{catalog, Event, EventCatalog, EventError, EventStatus, ProjectEvent};
use serde::Serialize;
use tracing::{debug, warn};

use crate::reducer::{reduce, ApplyResult, Origin};
use crate::snapshot::EntitySnapshot;

/// What happened to one event during a fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    NoOp,
    /// Approved events already live in the snapshot; rejected ones never apply.
    NotPending { status: EventStatus },
    /// Belongs to a different entity.
    OtherEntity,
    UnknownType,
    Malformed { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectionReport {
    pub outcomes: Vec<(EventId, Outcome)>,
}

impl ProjectionReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Applied))
    }

    /// Events that could not be interpreted (unknown type or malformed payload).
    pub fn degraded(&self) -> usize {
        self.count(|o| matches!(o, Outcome::UnknownType | Outcome::Malformed { .. }))
    }

    pub fn outcome_of(&self, event_id: EventId) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == event_id)
            .map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Folds events using the types registered in a catalog.
#[derive(Debug, Clone, Copy)]
pub struct Projector<'c> {
    catalog: &'c EventCatalog,
}

impl Default for Projector<'static> {
    fn default() -> Self {
        Self { catalog: catalog() }
    }
}

impl<'c> Projector<'c> {
    pub fn new(catalog: &'c EventCatalog) -> Self {
        Self { catalog }
    }

    /// Fold pending events, in the order given, onto `snapshot`.
    pub fn project(&self, snapshot: &EntitySnapshot, events: &[Event]) -> EntitySnapshot {
        self.project_with_report(snapshot, events).0
    }

    pub fn project_with_report(
        &self,
        snapshot: &EntitySnapshot,
        events: &[Event],
    ) -> (EntitySnapshot, ProjectionReport) {
        let mut view = snapshot.clone();
        let mut report = ProjectionReport::default();

        for event in events {
            let outcome = self.fold_one(&mut view, event);
            report.outcomes.push((event.id, outcome));
        }

        (view, report)
    }

    /// The view a given actor sees: the snapshot plus their own pending events.
    pub fn view_for(
        &self,
        snapshot: &EntitySnapshot,
        events: &[Event],
        viewer: ActorId,
    ) -> EntitySnapshot {
        let own: Vec<Event> = events
            .iter()
            .filter(|e| e.actor_id == viewer)
            .cloned()
            .collect();
        self.project(snapshot, &own)
    }

    /// Apply an approved event permanently. Used by the store of record when an
    /// event is approved; entries it adds are not flagged pending.
    pub fn confirm(
        &self,
        snapshot: &EntitySnapshot,
        event: &Event,
    ) -> Result<(EntitySnapshot, ApplyResult), EventError> {
        let mut next = snapshot.clone();
        let kind = self.catalog.resolve(&event.event_type)?;
        let decoded = ProjectEvent::decode(kind, &event.payload)?;
        let result = reduce(&mut next, &decoded, Origin::Confirmed);
        Ok((next, result))
    }

    fn fold_one(&self, view: &mut EntitySnapshot, event: &Event) -> Outcome {
        if event.status != EventStatus::Pending {
            return Outcome::NotPending { status: event.status };
        }
        if event.entity_id != view.id {
            debug!(event_id = %event.id, entity_id = %event.entity_id, "Skipping event for another entity");
            return Outcome::OtherEntity;
        }

        let kind = match self.catalog.resolve(&event.event_type) {
            Ok(kind) => kind,
            Err(_) => {
                debug!(event_id = %event.id, event_type = event.event_type, "No reducer registered (unknown type)");
                return Outcome::UnknownType;
            }
        };

        let decoded = match ProjectEvent::decode(kind, &event.payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(event_id = %event.id, event_type = event.event_type, error = %e, "Skipping malformed event payload");
                return Outcome::Malformed { reason: e.to_string() };
            }
        };

        match reduce(view, &decoded, Origin::Pending(event.id)) {
            ApplyResult::Applied => Outcome::Applied,
            ApplyResult::NoOp => Outcome::NoOp,
        }
    }
}

/// Project with the process-wide catalog.
pub fn project(snapshot: &EntitySnapshot, events: &[Event]) -> EntitySnapshot {
    Projector::default().project(snapshot, events)
}
