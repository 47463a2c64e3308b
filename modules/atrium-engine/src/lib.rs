//! Mutation service: the write path in front of the event log.

pub mod error;
pub mod persist;
pub mod service;
pub mod traits;

pub use error::{MutationError, StoreError};
pub use persist::MemoryEventLog;
pub use service::{IssuedMutation, MutationIntent, MutationService};
pub use traits::{AuthorizationSource, EventLog};
