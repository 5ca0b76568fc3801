//! Domain data model (`spec.md` §3).

mod classifier_head;
mod events;
mod memory;
mod query;
mod temporal;
mod user;
mod vector;
mod waypoint;

pub use classifier_head::ClassifierHead;
pub use events::{Event, EventActor, EventPayload};
pub use memory::{Memory, Sector};
pub use query::{AsOfQuery, MemoryFilter, TemporalRangeMode, TemporalRangeQuery, TraversalDirection};
pub use temporal::{TemporalAuditEvent, TemporalEdge, TemporalFact};
pub use user::UserSummary;
pub use vector::StoredVector;
pub use waypoint::Waypoint;
