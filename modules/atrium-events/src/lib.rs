//! Project events: the catalog of types, typed payloads, the event envelope,
//! and renderer dispatch.
//!
//! Events are opaque `{event_type, payload}` pairs at rest. This crate is the
//! only place that knows how to turn a key into a type and a payload into a
//! struct.

pub mod catalog;
pub mod error;
pub mod payloads;
pub mod render;
pub mod types;

pub use catalog::{catalog, EventCatalog, EventType, EventTypeInfo};
pub use error::{EventError, TransitionError};
pub use payloads::*;
pub use render::{render, resolve_renderer, RenderStrategy, RenderedEvent};
pub use types::{Decision, DisplayHints, Event, EventStatus, NewEvent};
