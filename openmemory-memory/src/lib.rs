//! Memory core: ingest, update, delete, dedup (`spec.md` §4.4).
//!
//! Orchestrates the repository traits from `openmemory-core`, the
//! classifier, the embedder and the content-encryption envelope into the
//! `add`/`update`/`delete`/`delete_all` contract. Waypoint creation on
//! ingest lives alongside it, since both share the "last N memories of
//! this user" read.

mod service;
mod simhash;
mod waypoints;

pub use service::{AddRequest, MemoryService, UpdatePatch};
pub use simhash::compute as compute_simhash;
